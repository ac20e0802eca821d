//! The shadow stack: the collector's entire root set.
//!
//! Instead of stack maps emitted by a cooperating compiler, every reference the mutator holds
//! across a call that might allocate is pushed here first and popped afterwards. The collector
//! visits each entry and rewrites it in place when the referenced object moves. References held
//! anywhere else are not roots and must not be used across an allocation.


use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

use error::{fatal, GcError};
use object::Object;


pub struct ShadowStack {
    slots: RefCell<Vec<Object>>,
}


/// Scoped root: pushes on creation, pops on drop.
///
/// Whenever a reference to a heap object must survive an allocation, it must be held in a
/// `Root`. Use `get()` after any allocation to obtain the object's current location. Roots must
/// be released in the reverse order of their creation.
pub struct Root {
    stack: Rc<ShadowStack>,
    index: usize,
}


impl ShadowStack {
    pub fn new() -> ShadowStack {
        ShadowStack { slots: RefCell::new(Vec::new()) }
    }

    /// Record a new root, returning its depth.
    pub fn push(&self, obj: Object) -> usize {
        let mut slots = self.slots.borrow_mut();
        slots.push(obj);
        slots.len() - 1
    }

    /// Remove the most recently pushed root.
    pub fn pop(&self) -> Object {
        match self.slots.borrow_mut().pop() {
            Some(obj) => obj,
            None => {
                fatal(GcError::RootImbalance {
                    expected: 0,
                    found: 0,
                })
            }
        }
    }

    /// Visit every root during a collection pause, replacing each with `visit`'s result.
    pub fn mark<F>(&self, mut visit: F)
        where F: FnMut(Object) -> Object
    {
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            *slot = visit(*slot);
        }
    }

    pub fn get(&self, depth: usize) -> Object {
        self.slots.borrow()[depth]
    }

    pub fn set(&self, depth: usize, obj: Object) {
        self.slots.borrow_mut()[depth] = obj;
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Copy of the current roots, bottom first.
    pub fn snapshot(&self) -> Vec<Object> {
        self.slots.borrow().clone()
    }

    // pop on behalf of a Root, which must be on top
    fn release(&self, depth: usize) {
        let mut slots = self.slots.borrow_mut();

        if thread::panicking() {
            // already failing: keep the stack consistent without raising a second panic
            slots.truncate(depth);
            return;
        }

        let top = slots.len().wrapping_sub(1);
        if depth != top {
            drop(slots);
            fatal(GcError::RootImbalance {
                expected: top,
                found: depth,
            });
        }
        slots.pop();
    }
}


impl Root {
    pub fn new(stack: &Rc<ShadowStack>, obj: Object) -> Root {
        let index = stack.push(obj);
        Root {
            stack: stack.clone(),
            index: index,
        }
    }

    /// Current location of the rooted object.
    pub fn get(&self) -> Object {
        self.stack.get(self.index)
    }

    /// Replace the rooted object.
    pub fn set(&self, obj: Object) {
        self.stack.set(self.index, obj)
    }

    pub fn depth(&self) -> usize {
        self.index
    }
}


impl Drop for Root {
    fn drop(&mut self) {
        self.stack.release(self.index);
    }
}
