//! Performance counters and statistics


use std::cmp::max;

use time::{get_time, precise_time_ns, Timespec};


/// Type that provides counters for the GC to gain some measure of performance.
pub trait StatsLogger {
    /// mark start of time
    fn mark_start_time(&mut self);
    /// mark end of time
    fn mark_end_time(&mut self);

    /// count a nursery epoch and what it promoted
    fn add_minor(&mut self, objects: usize, bytes: usize);
    /// count a semispace scavenge and what survived it
    fn add_scavenge(&mut self, concurrent: bool, objects: usize, bytes: usize);
    /// add the length of one collection pause in nanoseconds
    fn add_pause(&mut self, ns: u64);
    /// give the current semispace occupancy in bytes
    fn current_heap_size(&mut self, size: usize);

    /// print statistics
    fn dump_to_stdout(&self);

    /// log something to stdout
    fn log(&self, string: &str) {
        println!("{}", string);
    }
}


#[derive(Debug)]
pub struct DefaultLogger {
    max_heap_size: usize,

    minor_collections: usize,
    concurrent_scavenges: usize,
    scavenges: usize,

    objects_promoted: usize,
    bytes_promoted: usize,
    objects_copied: usize,
    bytes_copied: usize,

    total_pause_ns: u64,
    max_pause_ns: u64,

    start_time: Timespec,
    stop_time: Timespec,
}


/// Nanosecond timer for a single collection pause.
pub struct PauseTimer {
    start: u64,
}


impl PauseTimer {
    pub fn start() -> PauseTimer {
        PauseTimer { start: precise_time_ns() }
    }

    pub fn elapsed_ns(&self) -> u64 {
        precise_time_ns().saturating_sub(self.start)
    }
}


impl DefaultLogger {
    pub fn new() -> DefaultLogger {
        DefaultLogger {
            max_heap_size: 0,
            minor_collections: 0,
            concurrent_scavenges: 0,
            scavenges: 0,
            objects_promoted: 0,
            bytes_promoted: 0,
            objects_copied: 0,
            bytes_copied: 0,
            total_pause_ns: 0,
            max_pause_ns: 0,
            start_time: Timespec::new(0, 0),
            stop_time: Timespec::new(0, 0),
        }
    }

    pub fn minor_collections(&self) -> usize {
        self.minor_collections
    }

    pub fn concurrent_scavenges(&self) -> usize {
        self.concurrent_scavenges
    }

    /// Synchronous scavenges only.
    pub fn scavenges(&self) -> usize {
        self.scavenges
    }

    pub fn objects_promoted(&self) -> usize {
        self.objects_promoted
    }

    pub fn bytes_promoted(&self) -> usize {
        self.bytes_promoted
    }

    pub fn bytes_copied(&self) -> usize {
        self.bytes_copied
    }

    pub fn max_heap_size(&self) -> usize {
        self.max_heap_size
    }
}


impl Default for DefaultLogger {
    fn default() -> DefaultLogger {
        DefaultLogger::new()
    }
}


impl StatsLogger for DefaultLogger {
    fn mark_start_time(&mut self) {
        self.start_time = get_time();
    }

    fn mark_end_time(&mut self) {
        self.stop_time = get_time();
    }

    fn add_minor(&mut self, objects: usize, bytes: usize) {
        self.minor_collections += 1;
        self.objects_promoted += objects;
        self.bytes_promoted += bytes;
    }

    fn add_scavenge(&mut self, concurrent: bool, objects: usize, bytes: usize) {
        if concurrent {
            self.concurrent_scavenges += 1;
        } else {
            self.scavenges += 1;
        }
        self.objects_copied += objects;
        self.bytes_copied += bytes;
    }

    fn add_pause(&mut self, ns: u64) {
        self.total_pause_ns += ns;
        self.max_pause_ns = max(self.max_pause_ns, ns);
    }

    fn current_heap_size(&mut self, size: usize) {
        self.max_heap_size = max(self.max_heap_size, size);
    }

    fn dump_to_stdout(&self) {
        // calculate timing
        let total_time = max((self.stop_time - self.start_time).num_milliseconds(), 1);
        let pause_time = (self.total_pause_ns / 1_000_000) as i64;
        let percent_pause_time = pause_time * 100 / total_time;

        println!("minor {} (promoted {} objects, {} bytes); scavenges {} + {} concurrent \
                  (copied {} objects, {} bytes); max-heap {}",
                 self.minor_collections,
                 self.objects_promoted,
                 self.bytes_promoted,
                 self.scavenges,
                 self.concurrent_scavenges,
                 self.objects_copied,
                 self.bytes_copied,
                 self.max_heap_size);

        println!("paused {}/{}ms ({}%), longest pause {}us",
                 pause_time,
                 total_time,
                 percent_pause_time,
                 self.max_pause_ns / 1000);
    }
}
