//! The runtime context and the allocate-or-collect protocol.
//!
//! Allocation tries the nursery's bump pointer first. When that fails, one collection cycle runs:
//!
//!  * the nursery epoch begins, promoting from the remembered set
//!  * the shadow stack is marked, promoting every root
//!  * the nursery epoch ends, finishing the transitive copy and emptying the nursery
//!  * an opportunistic semispace scavenge runs
//!  * if the semispace can no longer absorb a full nursery, a synchronous scavenge runs
//!
//! and the fast path is retried. The cycle always leaves room for the next epoch's promotions,
//! so the retry is guaranteed to succeed. If even the synchronous scavenge cannot make that room
//! the heap is exhausted and the process terminates.


use std::rc::Rc;
use std::sync::Arc;

use fnv::FnvHashSet;

use config::GcConfig;
use descriptor::{DescriptorTable, Tag, TailKind, TypeDescriptor};
use error::{fatal, GcError};
use header::{set_indirection, Tail};
use nursery::Nursery;
use object::{describe_node, load_last, shape, try_check_node, Object};
use semispace::Semispace;
use shadowstack::{Root, ShadowStack};
use statistics::{DefaultLogger, PauseTimer, StatsLogger};
use trace::slots;


/// Everything the collector needs, constructed once before the first allocation.
pub struct Runtime<S: StatsLogger = DefaultLogger> {
    config: GcConfig,
    table: Arc<DescriptorTable>,
    nursery: Nursery,
    semispace: Semispace,
    roots: Rc<ShadowStack>,
    logger: S,
}


impl Runtime<DefaultLogger> {
    /// Reserve the nursery and both semispace halves with a `DefaultLogger`.
    pub fn new(config: GcConfig, table: Arc<DescriptorTable>) -> Runtime<DefaultLogger> {
        Self::with_logger(config, table, DefaultLogger::new())
    }
}


impl<S: StatsLogger> Runtime<S> {
    /// Reserve the regions described by `config`. Each semispace half must be able to absorb a
    /// full nursery.
    pub fn with_logger(config: GcConfig, table: Arc<DescriptorTable>, mut logger: S) -> Runtime<S> {
        if config.semispace_size < config.nursery_size {
            fatal(GcError::Exhausted {
                requested: config.nursery_size,
                available: config.semispace_size,
            });
        }

        let nursery = Nursery::new(table.clone(), config.nursery_size, config.padding);
        let semispace = Semispace::new(table.clone(),
                                       config.semispace_size,
                                       config.concurrent_threshold,
                                       config.padding,
                                       config.tail_compact);

        logger.mark_start_time();
        debug!("runtime: nursery {} bytes, semispace 2 x {} bytes, {} descriptors",
               nursery.capacity_bytes(),
               semispace.capacity_bytes(),
               table.len());

        Runtime {
            config: config,
            table: table,
            nursery: nursery,
            semispace: semispace,
            roots: Rc::new(ShadowStack::new()),
            logger: logger,
        }
    }

    /// Allocate an object of `tag` with `tail_len` trailing units, collecting as needed. The
    /// tail is stored inline when `tail_copy` is set or when it is empty, out of line otherwise.
    ///
    /// Any object reference not held in a `Root` is invalid after this call.
    pub fn alloc(&mut self, tag: Tag, tail_len: usize) -> Object {
        let tail = if self.config.tail_copy || tail_len == 0 {
            Tail::Inline
        } else {
            Tail::OutOfLine
        };
        self.alloc_with(tag, tail_len, tail)
    }

    /// Allocate with an explicit tail layout. Fields and tail units start out zeroed.
    pub fn alloc_with(&mut self, tag: Tag, tail_len: usize, tail: Tail) -> Object {
        let shape = match shape(&self.table, tag, tail_len, tail, self.config.padding) {
            Ok(shape) => shape,
            Err(err) => fatal(err),
        };

        if shape.bytes() > self.nursery.capacity_bytes() {
            fatal(GcError::ObjectTooLarge {
                requested: shape.bytes(),
                nursery: self.nursery.capacity_bytes(),
            });
        }

        loop {
            if let Some(obj) = self.nursery.try_allocate_shape(&shape) {
                return obj;
            }
            self.collect();
        }
    }

    /// Run one collection cycle: nursery epoch, then the semispace passes.
    pub fn minor_collection(&mut self) {
        self.collect();
    }

    /// Run a collection cycle and then force a synchronous scavenge.
    pub fn major_collection(&mut self) {
        let timer = PauseTimer::start();
        self.promote_nursery();
        self.scavenge();
        self.ensure_headroom();
        self.logger.add_pause(timer.elapsed_ns());
    }

    fn collect(&mut self) {
        let timer = PauseTimer::start();

        self.promote_nursery();

        if let Some((objects, bytes)) = self.semispace.scavenge_concurrent(&self.roots) {
            self.logger.add_scavenge(true, objects, bytes);
            self.report("concurrent scavenge", objects, bytes);
        }

        if !self.semispace.check(self.nursery.capacity_bytes()) {
            self.scavenge();
            self.ensure_headroom();
        }

        self.logger.add_pause(timer.elapsed_ns());
        self.logger.current_heap_size(self.semispace.used_bytes());
    }

    fn promote_nursery(&mut self) {
        let nursery = &mut self.nursery;
        let semispace = &mut self.semispace;

        nursery.begin_epoch(semispace);
        self.roots.mark(|obj| nursery.promote(semispace, obj));
        let (objects, bytes) = nursery.end_epoch(semispace);

        self.logger.add_minor(objects, bytes);
        self.report("nursery epoch", objects, bytes);
    }

    fn scavenge(&mut self) {
        debug_assert!(self.nursery.is_empty() && self.nursery.remembered_len() == 0);

        let (objects, bytes) = self.semispace.scavenge(&self.roots);
        self.logger.add_scavenge(false, objects, bytes);
        self.report("scavenge", objects, bytes);
    }

    fn ensure_headroom(&self) {
        let needed = self.nursery.capacity_bytes();
        if !self.semispace.check(needed) {
            fatal(GcError::Exhausted {
                requested: needed,
                available: self.semispace.free_bytes(),
            });
        }
    }

    fn report(&self, phase: &str, objects: usize, bytes: usize) {
        if self.config.verbose {
            info!("{}: {} objects, {} bytes; semispace {}/{} bytes",
                  phase,
                  objects,
                  bytes,
                  self.semispace.used_bytes(),
                  self.semispace.capacity_bytes());
        } else {
            debug!("{}: {} objects, {} bytes", phase, objects, bytes);
        }
    }

    /// Hold `obj` as a root until the returned guard is dropped.
    pub fn root(&self, obj: Object) -> Root {
        Root::new(&self.roots, obj)
    }

    pub fn roots(&self) -> &ShadowStack {
        &self.roots
    }

    // Field access. Every accessor first chases indirections to the direct object.

    pub fn prim(&self, obj: Object, index: usize) -> usize {
        let (obj, desc) = self.direct(obj);
        assert!(index < desc.prims, "{}: primitive field {} out of range", desc.name, index);
        obj.load(1 + index)
    }

    pub fn set_prim(&mut self, obj: Object, index: usize, value: usize) {
        let (obj, desc) = self.direct(obj);
        assert!(index < desc.prims, "{}: primitive field {} out of range", desc.name, index);
        self.check_writable(obj, desc);
        obj.store(1 + index, value);
    }

    pub fn ptr(&self, obj: Object, index: usize) -> Option<Object> {
        let (obj, desc) = self.direct(obj);
        assert!(index < desc.ptrs, "{}: pointer field {} out of range", desc.name, index);
        unsafe { Object::from_word(obj.load(1 + desc.prims + index)) }
    }

    pub fn set_ptr(&mut self, obj: Object, index: usize, value: Option<Object>) {
        let (obj, desc) = self.direct(obj);
        assert!(index < desc.ptrs, "{}: pointer field {} out of range", desc.name, index);
        self.check_writable(obj, desc);
        let value = value.map(|v| v.resolve());
        obj.store(1 + desc.prims + index, value.map_or(0, |v| v.addr()));
        self.write_barrier(obj, value);
    }

    pub fn tail_len(&self, obj: Object) -> usize {
        self.direct(obj).0.header().size()
    }

    pub fn tail_word(&self, obj: Object, index: usize) -> usize {
        unsafe { *load_last(&self.table, obj, index) }
    }

    pub fn set_tail_word(&mut self, obj: Object, index: usize, value: usize) {
        let (obj, desc) = self.direct(obj);
        assert!(desc.tail == TailKind::Words, "{}: tail holds pointers", desc.name);
        self.check_writable(obj, desc);
        unsafe { *load_last(&self.table, obj, index) = value };
    }

    pub fn tail_ptr(&self, obj: Object, index: usize) -> Option<Object> {
        let (_, desc) = self.direct(obj);
        assert!(desc.tail == TailKind::Pointers, "{}: tail is not traced", desc.name);
        unsafe { Object::from_word(*load_last(&self.table, obj, index)) }
    }

    pub fn set_tail_ptr(&mut self, obj: Object, index: usize, value: Option<Object>) {
        let (obj, desc) = self.direct(obj);
        assert!(desc.tail == TailKind::Pointers, "{}: tail is not traced", desc.name);
        self.check_writable(obj, desc);
        let value = value.map(|v| v.resolve());
        unsafe { *load_last(&self.table, obj, index) = value.map_or(0, |v| v.addr()) };
        self.write_barrier(obj, value);
    }

    /// Overwrite `obj` with an indirection to `target`, as when a deferred computation is
    /// replaced by its result. Readers of `obj` see `target` from now on and the collector
    /// rewrites references to `obj` to point at `target` directly.
    pub fn redirect(&mut self, obj: Object, target: Object) {
        let obj = obj.resolve();
        let target = target.resolve();
        assert!(obj != target, "redirecting {:?} to itself", obj);

        unsafe { set_indirection(obj.as_ptr(), target.as_ptr()) };
        self.write_barrier(obj, Some(target));
    }

    /// Chase indirections from `obj` and abort if the object found is not a valid heap object.
    pub fn validate(&self, obj: Object) -> Object {
        match try_check_node(&self.table, obj) {
            Ok(obj) => obj,
            Err(err) => fatal(err),
        }
    }

    /// Diagnostic rendering of `obj`; aborts on a corrupt header like `validate`.
    pub fn describe(&self, obj: Object) -> String {
        match describe_node(&self.table, obj) {
            Ok(text) => {
                trace!("{:?}: {}", obj, text);
                text
            }
            Err(err) => fatal(err),
        }
    }

    /// Validate every object reachable from the shadow stack. Returns the number of distinct
    /// objects found.
    pub fn verify_heap(&self) -> usize {
        let mut seen = FnvHashSet::default();
        let mut stack: Vec<Object> = self.roots.snapshot();

        while let Some(obj) = stack.pop() {
            let obj = self.validate(obj);
            if !seen.insert(obj.addr()) {
                continue;
            }
            for slot in slots(&self.table, obj) {
                if let Some(referent) = unsafe { Object::from_word(*slot) } {
                    stack.push(referent);
                }
            }
        }

        // tail blocks are reached through their owners but are not objects of their own
        seen.iter()
            .filter(|&&addr| {
                let obj = unsafe { Object::from_raw(addr as *mut usize) };
                !self.table.is_tail_block(obj.header().tag())
            })
            .count()
    }

    /// True if `obj` is still in the nursery.
    pub fn is_young(&self, obj: Object) -> bool {
        self.nursery.contains(obj.resolve())
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn nursery(&self) -> &Nursery {
        &self.nursery
    }

    pub fn semispace(&self) -> &Semispace {
        &self.semispace
    }

    /// Return a reference to the logger
    pub fn logger(&mut self) -> &mut S {
        &mut self.logger
    }

    /// Call to return the logger on shutdown, dumping statistics if `gc_stats` is set
    pub fn shutdown(mut self) -> S {
        self.logger.mark_end_time();
        if self.config.gc_stats {
            self.logger.dump_to_stdout();
        }
        self.logger
    }

    fn direct(&self, obj: Object) -> (Object, &TypeDescriptor) {
        let obj = obj.resolve();
        (obj, self.table.descriptor(obj.header().tag()))
    }

    fn check_writable(&self, obj: Object, desc: &TypeDescriptor) {
        if !desc.mutable && !self.nursery.contains(obj) {
            fatal(GcError::ImmutableWrite { name: desc.name });
        }
    }

    // an old object now refers into the nursery: remember it for the next epoch. `value` must
    // already be resolved, since that is what was stored
    fn write_barrier(&mut self, obj: Object, value: Option<Object>) {
        if let Some(value) = value {
            if !self.nursery.contains(obj) && self.nursery.contains(value) {
                self.nursery.remember(obj);
            }
        }
    }
}
