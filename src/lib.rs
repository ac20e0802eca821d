//! # shadow-gc
//!
//! A two-generation copying garbage collector for a single-threaded language runtime.
//!
//! New objects are bump-allocated in a small nursery. When the nursery fills, everything
//! reachable from the roots is promoted into one half of a semispace, which is in turn collected
//! by copying its live objects into the other half. There are no stack maps: the mutator
//! registers every reference it needs to survive an allocation on an explicit shadow stack,
//! and the collector rewrites those entries as objects move.
//!
//! Object layout is described entirely by a table of type descriptors, indexed by the tag stored
//! in each object's header word. A header may instead hold an indirection, used both for
//! forwarding during a copy and for redirecting a mutated object to its replacement.
//!
//! Heap corruption, exhaustion and misuse of the encoding are unrecoverable: they are logged and
//! then terminate the process.
//!
//! ## Usage
//!
//! Usage is best illustrated by the demos provided.


extern crate fnv;
#[macro_use]
extern crate log;
extern crate stderrlog;
extern crate time;


mod config;
mod constants;
mod descriptor;
mod error;
mod header;
mod heap;
mod nursery;
mod object;
mod runtime;
mod semispace;
mod shadowstack;
mod statistics;
mod trace;


pub use config::GcConfig;
pub use constants::*;
pub use descriptor::{DescriptorTable, DescriptorTableBuilder, Tag, TailKind, TypeDescriptor};
pub use error::{fatal, GcError, Result};
pub use header::{mk_tag, Decoded, Header, Tail};
pub use heap::{Evacuation, Region};
pub use nursery::Nursery;
pub use object::{describe_node, load_last, shape, try_check_node, Object, Shape};
pub use runtime::Runtime;
pub use semispace::Semispace;
pub use shadowstack::{Root, ShadowStack};
pub use statistics::{DefaultLogger, PauseTimer, StatsLogger};
pub use trace::{slots, Slots};


/// Install a stderr logger. With `verbose` the info level is shown, which includes a summary of
/// every collection; otherwise only warnings and errors are shown.
pub fn start_logging(verbose: bool) {
    let verbosity = if verbose { 2 } else { 1 };

    match stderrlog::new().verbosity(verbosity).init() {
        Ok(()) => info!("logger initialized"),
        Err(e) => {
            error!("failed to init logger, probably already initialized: {:?}",
                   e)
        }
    }
}
