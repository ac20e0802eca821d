//! Core heap data types: bump regions and the copying evacuation shared by both generations.


use std::ptr;

use constants::WORD;
use descriptor::DescriptorTable;
use error::{fatal, GcError};
use header::{set_indirection, Decoded, Header, Tail};
use object::{extent, pad, Object};
use trace::slots;


/// A fixed block of words handed out by bumping a cursor.
pub struct Region {
    // owns the memory; only accessed through `start`
    _memory: Vec<usize>,
    start: *mut usize,
    capacity: usize,
    cursor: usize,
}


/// One copying pass from a region being collected into a destination region.
///
/// References into `from` are copied to `to` and their old header replaced by an indirection.
/// References anywhere else are left in place, except that indirections are always chased so
/// that redirections installed by the mutator are short-circuited.
pub struct Evacuation<'a> {
    table: &'a DescriptorTable,
    from: &'a Region,
    to: &'a mut Region,
    padding: bool,
    compact: bool,
    /// Objects copied so far
    pub objects: usize,
    /// Words copied so far
    pub words: usize,
}


impl Region {
    pub fn new(words: usize) -> Region {
        let mut memory = vec![0usize; words];
        let start = memory.as_mut_ptr();

        Region {
            _memory: memory,
            start: start,
            capacity: words,
            cursor: 0,
        }
    }

    /// Claim `words` zeroed words, or None if they do not fit.
    #[inline]
    pub fn bump(&mut self, words: usize) -> Option<*mut usize> {
        if words <= self.capacity - self.cursor {
            let at = unsafe { self.start.offset(self.cursor as isize) };
            self.cursor += words;
            Some(at)
        } else {
            None
        }
    }

    /// Discard every allocation, zeroing what was used.
    pub fn reset(&mut self) {
        unsafe { ptr::write_bytes(self.start, 0, self.cursor) };
        self.cursor = 0;
    }

    #[inline]
    pub fn contains(&self, obj: Object) -> bool {
        let addr = obj.addr();
        let start = self.start as usize;
        addr >= start && addr < start + self.capacity * WORD
    }

    /// The object whose header is at word `index`.
    #[inline]
    pub fn object_at(&self, index: usize) -> Object {
        debug_assert!(index < self.cursor);
        unsafe { Object::from_raw(self.start.offset(index as isize)) }
    }

    #[inline]
    pub fn used_words(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn free_words(&self) -> usize {
        self.capacity - self.cursor
    }

    #[inline]
    pub fn capacity_words(&self) -> usize {
        self.capacity
    }
}


impl<'a> Evacuation<'a> {
    pub fn new(table: &'a DescriptorTable,
               from: &'a Region,
               to: &'a mut Region,
               padding: bool,
               compact: bool)
               -> Evacuation<'a> {
        Evacuation {
            table: table,
            from: from,
            to: to,
            padding: padding,
            compact: compact,
            objects: 0,
            words: 0,
        }
    }

    /// Return the current location of `obj`, copying it out of `from` on first encounter.
    pub fn evacuate(&mut self, obj: Object) -> Object {
        let mut obj = obj;
        loop {
            match obj.header().decode() {
                Decoded::Indirection(target) => obj = unsafe { Object::from_raw(target) },
                Decoded::Direct { tag, size, tail } => {
                    if !self.from.contains(obj) {
                        return obj;
                    }
                    return self.copy(obj, tag, size, tail);
                }
            }
        }
    }

    /// Update every pointer slot of `obj` to the current location of its referent.
    pub fn scan_object(&mut self, obj: Object) {
        for slot in slots(self.table, obj) {
            unsafe {
                if let Some(referent) = Object::from_word(*slot) {
                    *slot = self.evacuate(referent).addr();
                }
            }
        }
    }

    /// Cheney scan: process every object copied into `to` from word `start` onwards, including
    /// those copied while scanning, until the scan catches up with allocation.
    pub fn scan_from(&mut self, start: usize) {
        let mut scan = start;
        while scan < self.to.used_words() {
            let obj = self.to.object_at(scan);
            self.scan_object(obj);
            scan += extent(self.table, obj, self.padding);
        }
    }

    fn copy(&mut self, obj: Object, tag: usize, size: usize, tail: Tail) -> Object {
        let table = self.table;
        if !table.validate(tag) {
            fatal(GcError::HeapCorruption {
                tag: tag,
                table_size: table.len(),
            });
        }

        let desc = table.descriptor(tag);
        let fields = desc.fields();

        let new = if tail == Tail::OutOfLine && self.compact {
            // pull the tail inline: header, fields, then the block's units
            let words = pad(1 + fields + size, self.padding);
            let at = self.claim(words);
            let block = obj.load(1 + fields) as *const usize;
            unsafe {
                ptr::copy_nonoverlapping(obj.as_ptr(), at, 1 + fields);
                ptr::copy_nonoverlapping(block.offset(1), at.offset(1 + fields as isize), size);
            }
            let new = unsafe { Object::from_raw(at) };
            new.set_header(Header::new(tag, size, Tail::Inline));
            self.words += words;
            new
        } else {
            let words = extent(table, obj, self.padding);
            let at = self.claim(words);
            unsafe { ptr::copy_nonoverlapping(obj.as_ptr(), at, words) };
            self.words += words;
            unsafe { Object::from_raw(at) }
        };

        unsafe { set_indirection(obj.as_ptr(), new.as_ptr()) };
        self.objects += 1;

        trace!("evacuated {:?} -> {:?} ({})", obj, new, desc.name);
        new
    }

    fn claim(&mut self, words: usize) -> *mut usize {
        match self.to.bump(words) {
            Some(at) => at,
            None => {
                fatal(GcError::Exhausted {
                    requested: words * WORD,
                    available: self.to.free_words() * WORD,
                })
            }
        }
    }
}
