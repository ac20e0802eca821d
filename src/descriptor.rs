//! The type descriptor table: the only place that knows which words of an object are plain data
//! and which are pointers the collector must trace.
//!
//! The table is built once before the first allocation and is read-only afterwards, so collection
//! phases read it without synchronization.


use std::sync::Arc;

use constants::TAIL_BLOCK_TAG;
use error::{fatal, GcError};


/// How the units of an object's trailing payload are traced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TailKind {
    /// Plain data, never traced
    Words,
    /// Heap pointers (or null)
    Pointers,
}


/// Shape of every object carrying a particular tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub prims: usize,
    pub ptrs: usize,
    pub mutable: bool,
    pub tail: TailKind,
    pub name: &'static str,
}


/// Index into the descriptor table.
pub type Tag = usize;


pub struct DescriptorTable {
    descriptors: Vec<TypeDescriptor>,
}


pub struct DescriptorTableBuilder {
    descriptors: Vec<TypeDescriptor>,
}


impl TypeDescriptor {
    /// An immutable constructor with no trailing payload.
    pub fn new(name: &'static str, prims: usize, ptrs: usize) -> TypeDescriptor {
        TypeDescriptor {
            prims: prims,
            ptrs: ptrs,
            mutable: false,
            tail: TailKind::Words,
            name: name,
        }
    }

    pub fn mutable(mut self) -> TypeDescriptor {
        self.mutable = true;
        self
    }

    pub fn with_tail(mut self, tail: TailKind) -> TypeDescriptor {
        self.tail = tail;
        self
    }

    /// Number of body words following the header, excluding any trailing payload.
    #[inline]
    pub fn fields(&self) -> usize {
        self.prims + self.ptrs
    }
}


impl DescriptorTable {
    pub fn builder() -> DescriptorTableBuilder {
        DescriptorTableBuilder {
            descriptors: vec![TypeDescriptor::new("tail-block", 0, 0)],
        }
    }

    /// Look up a descriptor. A tag outside the table can only come from a corrupt header and
    /// is fatal.
    #[inline]
    pub fn descriptor(&self, tag: Tag) -> &TypeDescriptor {
        match self.descriptors.get(tag) {
            Some(desc) => desc,
            None => {
                fatal(GcError::HeapCorruption {
                    tag: tag,
                    table_size: self.descriptors.len(),
                })
            }
        }
    }

    /// True if `tag` names an entry of this table.
    #[inline]
    pub fn validate(&self, tag: Tag) -> bool {
        tag < self.descriptors.len()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_tail_block(&self, tag: Tag) -> bool {
        tag == TAIL_BLOCK_TAG
    }
}


impl DescriptorTableBuilder {
    /// Append a descriptor, returning the tag assigned to it.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Tag {
        self.descriptors.push(descriptor);
        self.descriptors.len() - 1
    }

    pub fn build(self) -> Arc<DescriptorTable> {
        Arc::new(DescriptorTable { descriptors: self.descriptors })
    }
}
