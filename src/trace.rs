//! Descriptor-driven enumeration of the pointer slots of an object.
//!
//! The collector never needs per-type tracing code: the descriptor table says how many pointer
//! fields an object has and whether its tail units are pointers.


use descriptor::{DescriptorTable, TailKind};
use header::Tail;
use object::Object;


/// Iterator over the addresses of every word of a direct object that may hold a heap reference.
///
/// For an out-of-line tail the slot holding the tail block pointer is yielded before the units,
/// and the block is only located after that slot has been yielded, so a caller that relocates
/// the block through the slot is then handed the units of the new copy.
pub struct Slots {
    obj: Object,
    next: usize,
    end: usize,
    tail: Tail,
    tail_index: usize,
    size: usize,
    traced: bool,
    state: State,
}


#[derive(Copy, Clone)]
enum State {
    Fields,
    TailSlot,
    Block,
    Units { base: *mut usize, next: usize },
    Done,
}


/// Pointer slots of `obj`, which must have a direct header.
pub fn slots(table: &DescriptorTable, obj: Object) -> Slots {
    let header = obj.header();
    let desc = table.descriptor(header.tag());

    Slots {
        obj: obj,
        next: 1 + desc.prims,
        end: 1 + desc.fields(),
        tail: header.tail(),
        tail_index: 1 + desc.fields(),
        size: header.size(),
        traced: desc.tail == TailKind::Pointers,
        state: State::Fields,
    }
}


impl Iterator for Slots {
    type Item = *mut usize;

    fn next(&mut self) -> Option<*mut usize> {
        loop {
            match self.state {
                State::Fields => {
                    if self.next < self.end {
                        self.next += 1;
                        return Some(self.obj.word(self.next - 1));
                    }
                    self.state = match self.tail {
                        Tail::OutOfLine => State::TailSlot,
                        Tail::Inline if self.traced => {
                            State::Units {
                                base: self.obj.word(self.tail_index),
                                next: 0,
                            }
                        }
                        Tail::Inline => State::Done,
                    };
                }

                State::TailSlot => {
                    self.state = State::Block;
                    return Some(self.obj.word(self.tail_index));
                }

                State::Block => {
                    let block = self.obj.load(self.tail_index);
                    self.state = if self.traced && block != 0 {
                        State::Units {
                            base: unsafe { (block as *mut usize).offset(1) },
                            next: 0,
                        }
                    } else {
                        State::Done
                    };
                }

                State::Units { base, next } => {
                    if next < self.size {
                        self.state = State::Units {
                            base: base,
                            next: next + 1,
                        };
                        return Some(unsafe { base.offset(next as isize) });
                    }
                    self.state = State::Done;
                }

                State::Done => return None,
            }
        }
    }
}
