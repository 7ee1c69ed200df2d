//! Error-recovery policy shared by both parser drivers.

/// How a driver reacts to an error table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorRecovery {
    /// No recovery: the first error entry fails the parse.
    #[default]
    None,
    /// Panic mode: discard stack entries or input tokens until a known
    /// synchronization symbol is found, then resume.
    PanicMode,
}

/// The maximum number of errors a parse may recover from before it is
/// failed outright.
pub const RECOVERY_LIMIT: usize = 5;
