//! The nursery: generation 0.
//!
//! New objects are bump-allocated here. When allocation fails the runtime brackets a collection
//! epoch: `begin_epoch()` promotes everything reachable from the remembered set, the shadow stack
//! is marked through `promote()`, and `end_epoch()` finishes the transitive copy into the
//! semispace's active half and empties the nursery.
//!
//! The remembered set records semispace objects the mutator has made point into the nursery.
//! Those are the only references into the nursery that do not come from the shadow stack or
//! from other nursery objects.


use std::sync::Arc;

use fnv::FnvHashSet;

use constants::WORD;
use descriptor::{DescriptorTable, Tag};
use error::fatal;
use header::{set_indirection, Decoded, Tail};
use heap::Region;
use object::{shape, Object, Shape};
use semispace::Semispace;


pub struct Nursery {
    table: Arc<DescriptorTable>,
    region: Region,
    padding: bool,

    /// Semispace objects that may hold references into the nursery
    remembered: FnvHashSet<usize>,

    /// Word offset in the active semispace half where this epoch's promotions begin
    epoch: Option<usize>,

    promoted_objects: usize,
    promoted_words: usize,
}


impl Nursery {
    pub fn new(table: Arc<DescriptorTable>, bytes: usize, padding: bool) -> Nursery {
        Nursery {
            table: table,
            region: Region::new(bytes / WORD),
            padding: padding,
            remembered: FnvHashSet::default(),
            epoch: None,
            promoted_objects: 0,
            promoted_words: 0,
        }
    }

    /// Bump-allocate an object of `tag` with `size` tail units, or None if the nursery is full.
    /// Never collects.
    pub fn try_allocate(&mut self, tag: Tag, size: usize, tail: Tail) -> Option<Object> {
        let shape = match shape(&self.table, tag, size, tail, self.padding) {
            Ok(shape) => shape,
            Err(err) => fatal(err),
        };
        self.try_allocate_shape(&shape)
    }

    /// Allocate a pre-sized request. An out-of-line tail block is claimed in the same bump as
    /// its owner, so a request either fits whole or not at all.
    pub fn try_allocate_shape(&mut self, shape: &Shape) -> Option<Object> {
        assert!(self.epoch.is_none(), "allocation during a nursery epoch");

        self.region.bump(shape.words()).map(|at| unsafe { shape.initialize(at) })
    }

    /// Start a collection epoch, promoting everything the remembered set refers to.
    pub fn begin_epoch(&mut self, semi: &mut Semispace) {
        assert!(self.epoch.is_none(), "nursery epoch already in progress");

        self.epoch = Some(semi.used_words());
        self.promoted_objects = 0;
        self.promoted_words = 0;

        let remembered: Vec<usize> = self.remembered.drain().collect();
        debug!("nursery epoch: {} words used, {} remembered",
               self.region.used_words(),
               remembered.len());

        let mut evac = semi.promotion(&self.region);
        for addr in remembered {
            let obj = unsafe { Object::from_raw(addr as *mut usize) };
            match obj.header().decode() {
                Decoded::Indirection(target) => {
                    let target = evac.evacuate(unsafe { Object::from_raw(target) });
                    unsafe { set_indirection(obj.as_ptr(), target.as_ptr()) };
                }
                Decoded::Direct { .. } => evac.scan_object(obj),
            }
        }

        self.promoted_objects += evac.objects;
        self.promoted_words += evac.words;
    }

    /// Promote a single root into the semispace, returning its new location. This is the
    /// visitor handed to `ShadowStack::mark` during an epoch.
    pub fn promote(&mut self, semi: &mut Semispace, obj: Object) -> Object {
        assert!(self.epoch.is_some(), "promotion outside a nursery epoch");

        let mut evac = semi.promotion(&self.region);
        let new = evac.evacuate(obj);

        self.promoted_objects += evac.objects;
        self.promoted_words += evac.words;
        new
    }

    /// Finish the epoch: transitively promote everything reachable from the objects promoted so
    /// far, then empty the nursery. Returns (objects promoted, bytes promoted).
    pub fn end_epoch(&mut self, semi: &mut Semispace) -> (usize, usize) {
        let start = match self.epoch {
            Some(start) => start,
            None => panic!("end_epoch without begin_epoch"),
        };

        {
            let mut evac = semi.promotion(&self.region);
            evac.scan_from(start);
            self.promoted_objects += evac.objects;
            self.promoted_words += evac.words;
        }

        self.region.reset();
        self.remembered.clear();
        self.epoch = None;

        (self.promoted_objects, self.promoted_words * WORD)
    }

    /// Record that `obj`, a semispace object, now refers into the nursery.
    pub fn remember(&mut self, obj: Object) {
        self.remembered.insert(obj.addr());
    }

    pub fn remembered_len(&self) -> usize {
        self.remembered.len()
    }

    #[inline]
    pub fn contains(&self, obj: Object) -> bool {
        self.region.contains(obj)
    }

    pub fn in_epoch(&self) -> bool {
        self.epoch.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.region.used_words() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.region.used_words() * WORD
    }

    pub fn capacity_bytes(&self) -> usize {
        self.region.capacity_words() * WORD
    }
}
