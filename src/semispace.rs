//! The semispace: generation 1.
//!
//! Two equally sized halves. Objects promoted out of the nursery are appended to the active half;
//! a scavenge copies everything reachable from the shadow stack into the reserve half, leaving an
//! indirection at each old location, and then the halves swap roles.


use std::mem;
use std::sync::Arc;

use constants::WORD;
use descriptor::DescriptorTable;
use heap::{Evacuation, Region};
use object::Object;
use shadowstack::ShadowStack;


pub struct Semispace {
    table: Arc<DescriptorTable>,
    active: Region,
    reserve: Region,
    padding: bool,
    compact: bool,
    /// Percentage of the active half in use above which an opportunistic scavenge runs
    threshold: usize,
}


impl Semispace {
    /// Reserve two halves of `bytes` each.
    pub fn new(table: Arc<DescriptorTable>,
               bytes: usize,
               threshold: usize,
               padding: bool,
               compact: bool)
               -> Semispace {
        Semispace {
            table: table,
            active: Region::new(bytes / WORD),
            reserve: Region::new(bytes / WORD),
            padding: padding,
            compact: compact,
            threshold: threshold,
        }
    }

    /// Whether the active half has at least `min_free_bytes` of headroom.
    pub fn check(&self, min_free_bytes: usize) -> bool {
        self.free_bytes() >= min_free_bytes
    }

    /// An opportunistic pass run after every nursery epoch. It only copies when the active half
    /// is at least `threshold` percent full, so it gives no guarantee about the headroom left.
    /// Returns (objects copied, bytes copied) if a pass ran.
    pub fn scavenge_concurrent(&mut self, roots: &ShadowStack) -> Option<(usize, usize)> {
        let used = self.active.used_words();
        let capacity = self.active.capacity_words();

        if used * 100 < self.threshold * capacity {
            debug!("concurrent scavenge skipped: {}/{} words in use", used, capacity);
            return None;
        }

        Some(self.scavenge(roots))
    }

    /// Stop-the-world copying collection. Afterwards the active half holds exactly the graph
    /// reachable from `roots` and the reserve half is empty. The nursery must be empty.
    /// Returns (objects copied, bytes copied).
    pub fn scavenge(&mut self, roots: &ShadowStack) -> (usize, usize) {
        let before = self.active.used_words();

        let (objects, words) = {
            let mut evac = Evacuation::new(&self.table,
                                           &self.active,
                                           &mut self.reserve,
                                           self.padding,
                                           self.compact);
            roots.mark(|obj| evac.evacuate(obj));
            evac.scan_from(0);
            (evac.objects, evac.words)
        };

        self.active.reset();
        mem::swap(&mut self.active, &mut self.reserve);

        debug!("scavenge: {} objects, {} of {} words survived",
               objects,
               words,
               before);

        (objects, words * WORD)
    }

    /// A copying pass from `from` into the end of the active half.
    pub fn promotion<'a>(&'a mut self, from: &'a Region) -> Evacuation<'a> {
        Evacuation::new(&self.table, from, &mut self.active, self.padding, self.compact)
    }

    #[inline]
    pub fn contains(&self, obj: Object) -> bool {
        self.active.contains(obj)
    }

    pub fn used_words(&self) -> usize {
        self.active.used_words()
    }

    pub fn used_bytes(&self) -> usize {
        self.active.used_words() * WORD
    }

    pub fn free_bytes(&self) -> usize {
        self.active.free_words() * WORD
    }

    /// Size of one half.
    pub fn capacity_bytes(&self) -> usize {
        self.active.capacity_words() * WORD
    }
}
