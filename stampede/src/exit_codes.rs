#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI/scenario input (bad flags, invalid durations, rejected
    /// scenario configuration).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
