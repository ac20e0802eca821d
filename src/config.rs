//! Collector configuration: region sizes and the runtime toggles.


use constants::{CONCURRENT_THRESHOLD, NURSERY_SIZE, SEMISPACE_SIZE};


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcConfig {
    /// Nursery size in bytes
    pub nursery_size: usize,
    /// Size of each semispace half in bytes
    pub semispace_size: usize,
    /// Active-half occupancy percentage at which the opportunistic scavenge copies
    pub concurrent_threshold: usize,

    /// Dump collection statistics on shutdown
    pub gc_stats: bool,
    /// Allocate variable-length tails inline with their object
    pub tail_copy: bool,
    /// Pull out-of-line tails inline when their object is copied
    pub tail_compact: bool,
    /// Round every allocation up to an even word count
    pub padding: bool,
    /// Log every collection at info level
    pub verbose: bool,
}


impl Default for GcConfig {
    fn default() -> GcConfig {
        GcConfig {
            nursery_size: NURSERY_SIZE,
            semispace_size: SEMISPACE_SIZE,
            concurrent_threshold: CONCURRENT_THRESHOLD,
            gc_stats: false,
            tail_copy: false,
            tail_compact: false,
            padding: false,
            verbose: false,
        }
    }
}


impl GcConfig {
    pub fn with_nursery_size(mut self, bytes: usize) -> GcConfig {
        self.nursery_size = bytes;
        self
    }

    pub fn with_semispace_size(mut self, bytes: usize) -> GcConfig {
        self.semispace_size = bytes;
        self
    }

    pub fn with_concurrent_threshold(mut self, percent: usize) -> GcConfig {
        self.concurrent_threshold = percent;
        self
    }

    pub fn with_gc_stats(mut self, on: bool) -> GcConfig {
        self.gc_stats = on;
        self
    }

    pub fn with_tail_copy(mut self, on: bool) -> GcConfig {
        self.tail_copy = on;
        self
    }

    pub fn with_tail_compact(mut self, on: bool) -> GcConfig {
        self.tail_compact = on;
        self
    }

    pub fn with_padding(mut self, on: bool) -> GcConfig {
        self.padding = on;
        self
    }

    pub fn with_verbose(mut self, on: bool) -> GcConfig {
        self.verbose = on;
        self
    }
}
