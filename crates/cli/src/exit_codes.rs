//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | The grid rejected an operation |
//! | 2 | Usage error (bad args, bad settings) |
//! | 3 | I/O error reading the script or settings |
//! | 4 | Script line could not be parsed |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The grid rejected an operation of the script.
pub const EXIT_ENGINE: u8 = 1;

/// Usage error - bad arguments, invalid settings.
pub const EXIT_USAGE: u8 = 2;

/// Script or settings file could not be read.
pub const EXIT_IO: u8 = 3;

/// A script line is not a valid operation.
pub const EXIT_PARSE: u8 = 4;
