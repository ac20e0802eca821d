//! Numerous constants used as parameters to GC behavior


use std::mem::size_of;


// Word size in bytes
pub const WORD: usize = size_of::<usize>();

// Header bit layout, low to high: indirection bit, size field, tail bit, tag
pub const INDIRECTION_BIT: usize = 1;
pub const SIZE_BITS: usize = 12;
pub const SIZE_SHIFT: usize = 1;
pub const SIZE_MASK: usize = (1 << SIZE_BITS) - 1;
pub const TAIL_SHIFT: usize = 1 + SIZE_BITS;
pub const TAIL_BIT: usize = 1 << TAIL_SHIFT;
pub const TAG_SHIFT: usize = 2 + SIZE_BITS;

// largest representable tail length and tag
pub const MAX_SIZE: usize = SIZE_MASK;
pub const MAX_TAG: usize = usize::MAX >> TAG_SHIFT;

// Tag reserved for out-of-line tail blocks
pub const TAIL_BLOCK_TAG: usize = 0;

// Default region sizes in bytes
pub const NURSERY_SIZE: usize = 64 << 10;
pub const SEMISPACE_SIZE: usize = 4 << 20;

// Occupancy percentage of the active semispace half at which an opportunistic
// scavenge is run
pub const CONCURRENT_THRESHOLD: usize = 75;
