//! Process exit codes, one per error class.

/// Successful termination
pub const OK: i32 = 0;

/// The API rejected the call, or the call never reached it
pub const UPSTREAM: i32 = 1;

/// Missing positional arguments, missing or invalid flags
pub const USAGE: i32 = 2;

/// The API reported the resource does not exist
pub const NOT_FOUND: i32 = 3;

/// The API reported a conflicting resource state
pub const CONFLICT: i32 = 4;

/// The user declined a confirmation or interrupted the command
pub const ABORTED: i32 = 5;

/// A wait for a terminal state exceeded its attempt cap
pub const TIMEOUT: i32 = 6;

/// Internal software error
pub const INTERNAL: i32 = 7;
