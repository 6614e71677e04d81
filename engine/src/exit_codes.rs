//! Mirror tool exit code classification.
//!
//! The mirror tool encodes its result as a bit set: 1 = files copied,
//! 2 = extra files removed, 4 = mismatches seen, 8 = copy errors,
//! 16 = serious failure. Codes 0-7 are success, 8-15 are surfaced as
//! notes without failing the stage, and anything else is fatal.

use crate::model::MirrorOutcome;

/// Highest code that still means plain success.
pub const MAX_SUCCESS_CODE: i32 = 7;

/// Highest code that is reported as a note instead of a failure.
pub const MAX_NOTE_CODE: i32 = 15;

/// Known meanings for codes 0-16, indexed by code.
static DESCRIPTIONS: [&str; 17] = [
    "No files copied; source and target already in sync",
    "Files copied successfully",
    "Extra files or directories removed from target",
    "Files copied; extra files removed from target",
    "Mismatched files or directories detected",
    "Files copied; mismatches detected",
    "Extra files removed; mismatches detected",
    "Files copied; extra files removed; mismatches detected",
    "Attribute mismatch",
    "Data mismatch, attribute mismatch",
    "Folder mismatch, data mismatch, attribute mismatch",
    "File errors, folder mismatch, data mismatch, attribute mismatch",
    "File errors, folder mismatch, data mismatch",
    "File errors, folder mismatch",
    "Folder mismatch, file errors",
    "Copy error(s)",
    "Serious error; the mirror tool did not copy any files",
];

/// Look up the fixed description for a code, if it has one.
pub fn describe(code: i32) -> Option<&'static str> {
    usize::try_from(code)
        .ok()
        .and_then(|idx| DESCRIPTIONS.get(idx))
        .copied()
}

/// Classify a raw mirror tool exit code. Total over all `i32` values.
pub fn classify(code: i32) -> MirrorOutcome {
    match code {
        0..=MAX_SUCCESS_CODE => MirrorOutcome::Success,
        8..=MAX_NOTE_CODE => {
            MirrorOutcome::SuccessWithNotes(code, describe(code).unwrap_or("unknown").to_string())
        }
        _ => {
            let description = describe(code)
                .map(str::to_string)
                .unwrap_or_else(|| format!("unknown mirror tool error (code {code})"));
            MirrorOutcome::Fatal(code, description)
        }
    }
}
