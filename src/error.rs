//! Fatal runtime conditions
//!
//! None of these are recoverable: a heap whose invariants are broken has no safe degraded mode.
//! Inner routines return `Result` so the condition can be described precisely; the public entry
//! points hand it to `fatal()`.


use std::error::Error;
use std::fmt;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcError {
    /// A direct-header accessor was used on an indirection, or the reverse
    EncodingMisuse(&'static str),
    /// An allocation named a tag with no descriptor
    UnknownTag { tag: usize },
    /// A tail length does not fit the header's size field
    CapacityOverflow { requested: usize, max: usize },
    /// A tag, after chasing indirections, lies outside the descriptor table
    HeapCorruption { tag: usize, table_size: usize },
    /// A synchronous scavenge could not free the requested headroom
    Exhausted { requested: usize, available: usize },
    /// A single allocation can never fit in the nursery
    ObjectTooLarge { requested: usize, nursery: usize },
    /// A root was released out of LIFO order
    RootImbalance { expected: usize, found: usize },
    /// A write to an immutable object after it left the nursery
    ImmutableWrite { name: &'static str },
}


pub type Result<T> = ::std::result::Result<T, GcError>;


impl fmt::Display for GcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GcError::EncodingMisuse(what) => write!(f, "header encoding misuse: {}", what),
            GcError::UnknownTag { tag } => write!(f, "no descriptor registered for tag {}", tag),
            GcError::CapacityOverflow { requested, max } => {
                write!(f, "tail of {} units exceeds header capacity of {}", requested, max)
            }
            GcError::HeapCorruption { tag, table_size } => {
                write!(f, "invalid heap object: tag {} outside table of {}", tag, table_size)
            }
            GcError::Exhausted { requested, available } => {
                write!(f, "heap exhausted: {} bytes required, {} available after scavenge",
                       requested,
                       available)
            }
            GcError::ObjectTooLarge { requested, nursery } => {
                write!(f, "object of {} bytes can never fit nursery of {} bytes",
                       requested,
                       nursery)
            }
            GcError::RootImbalance { expected, found } => {
                write!(f, "shadow stack imbalance: released depth {}, top is {}", found, expected)
            }
            GcError::ImmutableWrite { name } => {
                write!(f, "write to promoted immutable object {}", name)
            }
        }
    }
}


impl Error for GcError {}


/// Report a fatal condition and terminate. Release builds abort; test builds unwind so the
/// condition can be observed.
#[cold]
pub fn fatal(err: GcError) -> ! {
    error!("{}", err);
    panic!("fatal: {}", err)
}
