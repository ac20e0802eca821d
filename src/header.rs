//! The one-word object header
//!
//! ```text
//!  bit 0       1|indirection target (bit 0 masked off)      |
//!              0|size (12 bits)|tail (1 bit)|tag (remaining)|
//! ```
//!
//! An indirection header is left behind when the collector relocates an object, or installed by
//! the mutator when a deferred computation is overwritten with its result. All other headers are
//! direct and describe the object in place. Every direct-field accessor fails loudly when called
//! on an indirection, and the reverse.


use constants::{INDIRECTION_BIT, MAX_SIZE, MAX_TAG, SIZE_MASK, SIZE_SHIFT, TAG_SHIFT, TAIL_BIT,
                TAIL_SHIFT};
use error::{fatal, GcError, Result};


/// Where an object's trailing payload is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tail {
    /// One pointer in the body leads to a separately allocated block
    OutOfLine = 0,
    /// The payload follows the fields contiguously
    Inline = 1,
}


/// A decoded header, so that stale direct fields cannot be read through an indirection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    Direct { tag: usize, size: usize, tail: Tail },
    Indirection(*mut usize),
}


#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Header(usize);


impl Header {
    /// Build a direct header. Fails if `size` does not fit the size field.
    pub fn new(tag: usize, size: usize, tail: Tail) -> Header {
        Header(mk_tag(tag)).set_size(size).set_tail(tail)
    }

    /// Build an indirection header pointing at `target`.
    pub fn indirection(target: *mut usize) -> Header {
        let addr = target as usize;
        if addr & INDIRECTION_BIT != 0 {
            fatal(GcError::EncodingMisuse("indirection target is not word aligned"));
        }
        Header(addr | INDIRECTION_BIT)
    }

    #[inline]
    pub fn from_word(word: usize) -> Header {
        Header(word)
    }

    #[inline]
    pub fn word(self) -> usize {
        self.0
    }

    /// Read the header stored at `slot`.
    #[inline]
    pub unsafe fn load(slot: *const usize) -> Header {
        Header(*slot)
    }

    /// Overwrite the header word at `slot`.
    #[inline]
    pub unsafe fn store(self, slot: *mut usize) {
        *slot = self.0;
    }

    #[inline]
    pub fn is_indirection(self) -> bool {
        self.0 & INDIRECTION_BIT != 0
    }

    pub fn get_indirection(self) -> *mut usize {
        if !self.is_indirection() {
            fatal(GcError::EncodingMisuse("get_indirection on a direct header"));
        }
        (self.0 & !INDIRECTION_BIT) as *mut usize
    }

    pub fn tag(self) -> usize {
        self.direct("tag");
        self.0 >> TAG_SHIFT
    }

    pub fn size(self) -> usize {
        self.direct("size");
        (self.0 >> SIZE_SHIFT) & SIZE_MASK
    }

    /// Replace the size field. Fails if `size` does not fit.
    pub fn set_size(self, size: usize) -> Header {
        self.direct("set_size");
        if size > MAX_SIZE {
            fatal(GcError::CapacityOverflow {
                requested: size,
                max: MAX_SIZE,
            });
        }
        Header((self.0 & !(SIZE_MASK << SIZE_SHIFT)) | (size << SIZE_SHIFT))
    }

    /// Grow the size field by `by`. Fails unless `size + by < 4096`.
    pub fn inc_size(self, by: usize) -> Header {
        match self.try_inc_size(by) {
            Ok(header) => header,
            Err(err) => fatal(err),
        }
    }

    /// As `inc_size`, reporting overflow instead of terminating.
    pub fn try_inc_size(self, by: usize) -> Result<Header> {
        let old = self.size();
        match old.checked_add(by) {
            Some(size) if size <= MAX_SIZE => Ok(self.set_size(size)),
            _ => {
                Err(GcError::CapacityOverflow {
                    requested: old.saturating_add(by),
                    max: MAX_SIZE,
                })
            }
        }
    }

    pub fn tail(self) -> Tail {
        self.direct("tail");
        if self.0 & TAIL_BIT != 0 {
            Tail::Inline
        } else {
            Tail::OutOfLine
        }
    }

    pub fn set_tail(self, tail: Tail) -> Header {
        self.direct("set_tail");
        Header((self.0 & !TAIL_BIT) | ((tail as usize) << TAIL_SHIFT))
    }

    pub fn decode(self) -> Decoded {
        if self.is_indirection() {
            Decoded::Indirection(self.get_indirection())
        } else {
            Decoded::Direct {
                tag: self.tag(),
                size: self.size(),
                tail: self.tail(),
            }
        }
    }

    #[inline]
    fn direct(self, what: &'static str) {
        if self.is_indirection() {
            fatal(GcError::EncodingMisuse(what));
        }
    }
}


/// Shift a tag into position, with all other fields clear.
pub fn mk_tag(tag: usize) -> usize {
    if tag > MAX_TAG {
        fatal(GcError::EncodingMisuse("tag does not fit the header"));
    }
    tag << TAG_SHIFT
}


/// Overwrite the header at `slot` with an indirection to `target`.
pub unsafe fn set_indirection(slot: *mut usize, target: *mut usize) {
    Header::indirection(target).store(slot);
}


impl ::std::fmt::Debug for Header {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        match self.decode() {
            Decoded::Indirection(target) => write!(f, "Header(IND {:p})", target),
            Decoded::Direct { tag, size, tail } => {
                write!(f, "Header(tag {}, size {}, {:?})", tag, size, tail)
            }
        }
    }
}
