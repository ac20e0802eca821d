//! Heap object handles and layout
//!
//! An object is one header word, its primitive fields, its pointer fields, and then either the
//! inline tail units or a single word pointing at an out-of-line tail block. A tail block is
//! itself an object carrying the reserved tail-block tag, with its units stored inline.


use std::fmt;

use constants::{MAX_SIZE, TAIL_BLOCK_TAG, WORD};
use descriptor::{DescriptorTable, Tag, TypeDescriptor};
use error::{GcError, Result};
use header::{Decoded, Header, Tail};


/// A reference to the header word of a heap object.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Object {
    ptr: *mut usize,
}


/// Sizing of one allocation request, computed before any memory is touched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub tag: Tag,
    pub size: usize,
    pub tail: Tail,
    /// Primitive plus pointer fields
    pub fields: usize,
    /// Words of the object itself, including any padding
    pub owner_words: usize,
    /// Words of the out-of-line tail block, zero for inline tails
    pub block_words: usize,
}


impl Object {
    /// The caller guarantees `ptr` addresses a header word inside a live region.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut usize) -> Object {
        Object { ptr: ptr }
    }

    /// Interpret a field word as a reference. Null words are absent references.
    #[inline]
    pub unsafe fn from_word(word: usize) -> Option<Object> {
        if word == 0 {
            None
        } else {
            Some(Object { ptr: word as *mut usize })
        }
    }

    #[inline]
    pub fn as_ptr(self) -> *mut usize {
        self.ptr
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.ptr as usize
    }

    #[inline]
    pub fn header(self) -> Header {
        unsafe { Header::load(self.ptr) }
    }

    #[inline]
    pub fn set_header(self, header: Header) {
        unsafe { header.store(self.ptr) }
    }

    /// Address of body word `index`, where word 0 is the header.
    #[inline]
    pub fn word(self, index: usize) -> *mut usize {
        unsafe { self.ptr.offset(index as isize) }
    }

    #[inline]
    pub fn load(self, index: usize) -> usize {
        unsafe { *self.word(index) }
    }

    #[inline]
    pub fn store(self, index: usize, value: usize) {
        unsafe { *self.word(index) = value }
    }

    /// Chase indirections until a direct header is reached.
    pub fn resolve(self) -> Object {
        let mut obj = self;
        while let Decoded::Indirection(target) = obj.header().decode() {
            obj = Object { ptr: target };
        }
        obj
    }
}


impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Object({:p})", self.ptr)
    }
}


/// Round a word count up to an even number when padding is enabled. Region bases are only
/// word aligned, so this does not align addresses to two words.
#[inline]
pub fn pad(words: usize, padding: bool) -> usize {
    if padding {
        (words + 1) & !1
    } else {
        words
    }
}


/// Total extent in words of a direct object with this descriptor, size and tail.
#[inline]
pub fn object_words(desc: &TypeDescriptor, size: usize, tail: Tail, padding: bool) -> usize {
    let tail_words = match tail {
        Tail::Inline => size,
        Tail::OutOfLine => 1,
    };
    pad(1 + desc.fields() + tail_words, padding)
}


/// Extent in words of a direct object, read from its own header.
pub fn extent(table: &DescriptorTable, obj: Object, padding: bool) -> usize {
    let header = obj.header();
    object_words(table.descriptor(header.tag()), header.size(), header.tail(), padding)
}


/// Size an allocation of `tag` with `size` trailing units.
pub fn shape(table: &DescriptorTable, tag: Tag, size: usize, tail: Tail, padding: bool)
             -> Result<Shape> {
    if !table.validate(tag) || table.is_tail_block(tag) {
        return Err(GcError::UnknownTag { tag: tag });
    }
    if size > MAX_SIZE {
        return Err(GcError::CapacityOverflow {
            requested: size,
            max: MAX_SIZE,
        });
    }

    let desc = table.descriptor(tag);
    let owner_words = object_words(desc, size, tail, padding);
    let block_words = match tail {
        Tail::Inline => 0,
        Tail::OutOfLine => pad(1 + size, padding),
    };

    Ok(Shape {
        tag: tag,
        size: size,
        tail: tail,
        fields: desc.fields(),
        owner_words: owner_words,
        block_words: block_words,
    })
}


impl Shape {
    #[inline]
    pub fn words(&self) -> usize {
        self.owner_words + self.block_words
    }

    #[inline]
    pub fn bytes(&self) -> usize {
        self.words() * WORD
    }

    /// Write headers, and the tail pointer for out-of-line tails, into zeroed memory of
    /// `self.words()` words.
    pub unsafe fn initialize(&self, at: *mut usize) -> Object {
        let obj = Object::from_raw(at);
        obj.set_header(Header::new(self.tag, self.size, self.tail));

        if self.tail == Tail::OutOfLine {
            let block = Object::from_raw(at.offset(self.owner_words as isize));
            block.set_header(Header::new(TAIL_BLOCK_TAG, self.size, Tail::Inline));
            obj.store(1 + self.fields, block.addr());
        }

        obj
    }
}


/// Address of the first trailing payload unit of `obj`.
pub fn tail_base(table: &DescriptorTable, obj: Object) -> *mut usize {
    let obj = obj.resolve();
    let header = obj.header();
    let fields = table.descriptor(header.tag()).fields();

    match header.tail() {
        Tail::Inline => obj.word(1 + fields),
        Tail::OutOfLine => {
            let block = unsafe { Object::from_raw(obj.load(1 + fields) as *mut usize) };
            block.word(1)
        }
    }
}


/// Address of the `index`-th trailing payload unit of `obj`, wherever the tail is stored.
pub fn load_last(table: &DescriptorTable, obj: Object, index: usize) -> *mut usize {
    let size = obj.resolve().header().size();
    assert!(index < size, "tail index {} out of bounds for size {}", index, size);
    unsafe { tail_base(table, obj).offset(index as isize) }
}


/// Chase `obj`'s indirections and check the direct header's tag against the table.
pub fn try_check_node(table: &DescriptorTable, obj: Object) -> Result<Object> {
    let obj = obj.resolve();
    let tag = obj.header().tag();
    if table.validate(tag) {
        Ok(obj)
    } else {
        Err(GcError::HeapCorruption {
            tag: tag,
            table_size: table.len(),
        })
    }
}


/// Render `obj` for diagnostics, one `IND` per indirection followed.
pub fn describe_node(table: &DescriptorTable, obj: Object) -> Result<String> {
    let mut text = String::new();
    let mut current = obj;
    while let Decoded::Indirection(target) = current.header().decode() {
        text.push_str("IND ");
        current = unsafe { Object::from_raw(target) };
    }

    let node = try_check_node(table, current)?;
    let header = node.header();
    let desc = table.descriptor(header.tag());
    text.push_str(&format!("Node: {}, prims: {}, ptrs: {}, tail: {:?}, size: {}",
                           desc.name,
                           desc.prims,
                           desc.ptrs,
                           header.tail(),
                           header.size()));
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::*;
    use constants::MAX_SIZE;
    use descriptor::{DescriptorTable, TailKind, TypeDescriptor};
    use header::{set_indirection, Tail};

    fn table() -> (::std::sync::Arc<DescriptorTable>, Tag) {
        let mut builder = DescriptorTable::builder();
        let vec = builder.register(TypeDescriptor::new("Vector", 1, 1).with_tail(TailKind::Words));
        (builder.build(), vec)
    }

    #[test]
    fn shape_sizes_owner_and_block() {
        let (table, vec) = table();

        let inline = shape(&table, vec, 4, Tail::Inline, false).unwrap();
        assert_eq!(inline.owner_words, 7);
        assert_eq!(inline.block_words, 0);

        let outline = shape(&table, vec, 4, Tail::OutOfLine, false).unwrap();
        assert_eq!(outline.owner_words, 4);
        assert_eq!(outline.block_words, 5);
        assert_eq!(outline.bytes(), 9 * WORD);

        let padded = shape(&table, vec, 4, Tail::OutOfLine, true).unwrap();
        assert_eq!(padded.owner_words, 4);
        assert_eq!(padded.block_words, 6);
    }

    #[test]
    fn shape_rejects_bad_requests() {
        let (table, vec) = table();

        assert_eq!(shape(&table, 0, 1, Tail::Inline, false),
                   Err(GcError::UnknownTag { tag: 0 }));
        assert_eq!(shape(&table, 9, 1, Tail::Inline, false),
                   Err(GcError::UnknownTag { tag: 9 }));
        assert_eq!(shape(&table, vec, MAX_SIZE + 1, Tail::Inline, false),
                   Err(GcError::CapacityOverflow {
                       requested: MAX_SIZE + 1,
                       max: MAX_SIZE,
                   }));
    }

    #[test]
    fn last_field_is_layout_independent() {
        let (table, vec) = table();
        let mut words = vec![0usize; 16];
        let base = words.as_mut_ptr();

        let inline = unsafe {
            shape(&table, vec, 3, Tail::Inline, false).unwrap().initialize(base)
        };
        let outline = unsafe {
            shape(&table, vec, 3, Tail::OutOfLine, false).unwrap().initialize(base.offset(6))
        };

        for i in 0..3 {
            unsafe {
                *load_last(&table, inline, i) = 10 + i;
                *load_last(&table, outline, i) = 10 + i;
            }
        }

        assert_eq!((inline.load(3), inline.load(4), inline.load(5)), (10, 11, 12));
        let block = unsafe { Object::from_word(outline.load(3)).unwrap() };
        assert_eq!(block.header().tag(), TAIL_BLOCK_TAG);
        assert_eq!((block.load(1), block.load(2), block.load(3)), (10, 11, 12));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn last_field_is_bounds_checked() {
        let (table, vec) = table();
        let mut words = vec![0usize; 8];
        let obj = unsafe {
            shape(&table, vec, 2, Tail::Inline, false).unwrap().initialize(words.as_mut_ptr())
        };
        load_last(&table, obj, 2);
    }

    #[test]
    fn check_and_describe_follow_indirections() {
        let (table, vec) = table();
        let mut words = vec![0usize; 8];
        let base = words.as_mut_ptr();

        let target = unsafe {
            shape(&table, vec, 1, Tail::Inline, false).unwrap().initialize(base.offset(2))
        };
        let husk = unsafe { Object::from_raw(base) };
        unsafe { set_indirection(husk.as_ptr(), target.as_ptr()) };

        assert_eq!(try_check_node(&table, husk), Ok(target));
        assert_eq!(describe_node(&table, husk).unwrap(),
                   "IND Node: Vector, prims: 1, ptrs: 1, tail: Inline, size: 1");

        target.set_header(Header::new(table.len() + 1, 0, Tail::Inline));
        assert_eq!(try_check_node(&table, husk),
                   Err(GcError::HeapCorruption {
                       tag: table.len() + 1,
                       table_size: table.len(),
                   }));
        assert!(describe_node(&table, husk).is_err());
    }
}
