use core::fmt;

/// Errors that can occur while constructing an arena.
///
/// Exhaustion during allocation is never an error: every allocator in this
/// crate reports it as `None` and leaves recovery to the caller. The only
/// hard failure is a heap-backed arena that cannot reserve its range, since
/// there is no partial-arena state worth returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The system allocator could not provide `size` bytes.
    ReserveFailed { size: usize },
    /// A zero-sized arena was requested.
    ZeroSize,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::ReserveFailed { size } => {
                write!(f, "failed to reserve {size} bytes for heap arena")
            }
            ArenaError::ZeroSize => write!(f, "arena size must be non-zero"),
        }
    }
}

impl std::error::Error for ArenaError {}
