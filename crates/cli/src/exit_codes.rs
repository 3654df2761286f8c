//! CLI Exit Code Registry
//!
//! Single source of truth for `lboard` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (including an empty board)                   |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unknown sort field)      |
//! | 3    | I/O error (unreadable file, unreachable URL)         |
//! | 4    | Invalid paste (malformed JSON or not a sequence)     |
//! | 5    | Invalid configuration                                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// Also what clap exits with on parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Reading or writing a file, stdin, a snapshot slot or a URL failed.
pub const EXIT_IO: u8 = 3;

/// Pasted data was rejected. Existing data is untouched.
pub const EXIT_PASTE: u8 = 4;

/// Config file unreadable, unparsable or failed validation.
pub const EXIT_CONFIG: u8 = 5;
