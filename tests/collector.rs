extern crate shadow_gc;


use std::sync::Arc;

use shadow_gc::{DescriptorTable, GcConfig, Header, Object, Runtime, Tag, Tail, TailKind,
                TypeDescriptor, WORD};


struct Tags {
    int: Tag,
    cons: Tag,
    cell: Tag,
    bytes: Tag,
    array: Tag,
}


fn table() -> (Arc<DescriptorTable>, Tags) {
    let mut builder = DescriptorTable::builder();
    let tags = Tags {
        int: builder.register(TypeDescriptor::new("Int", 1, 0)),
        cons: builder.register(TypeDescriptor::new("Cons", 0, 2)),
        cell: builder.register(TypeDescriptor::new("Cell", 0, 1).mutable()),
        bytes: builder.register(TypeDescriptor::new("Bytes", 1, 0).with_tail(TailKind::Words)),
        array: builder.register(TypeDescriptor::new("Array", 0, 0)
            .mutable()
            .with_tail(TailKind::Pointers)),
    };
    (builder.build(), tags)
}


fn small() -> GcConfig {
    GcConfig::default()
        .with_nursery_size(1024)
        .with_semispace_size(128 << 10)
}


fn int(rt: &mut Runtime, tags: &Tags, value: usize) -> Object {
    let obj = rt.alloc(tags.int, 0);
    rt.set_prim(obj, 0, value);
    obj
}


#[test]
fn nursery_fills_before_first_collection() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let first = int(&mut rt, &tags, 42);
    let first = rt.root(first);
    assert!(rt.is_young(first.get()));

    // each Int is two words
    let capacity = 1024 / WORD / 2;
    for i in 1..capacity {
        int(&mut rt, &tags, i);
    }
    assert_eq!(rt.logger().minor_collections(), 0);

    int(&mut rt, &tags, capacity);
    assert_eq!(rt.logger().minor_collections(), 1);
    assert_eq!(rt.logger().objects_promoted(), 1);

    assert!(!rt.is_young(first.get()));
    assert_eq!(rt.prim(first.get(), 0), 42);
}


#[test]
fn rooted_list_survives_collections() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let sentinel = int(&mut rt, &tags, 0xdead);
    let list = rt.root(sentinel);

    let length = 1000;
    for i in 0..length {
        let value = int(&mut rt, &tags, i);
        let value = rt.root(value);

        let cons = rt.alloc(tags.cons, 0);
        rt.set_ptr(cons, 0, Some(value.get()));
        rt.set_ptr(cons, 1, Some(list.get()));
        list.set(cons);
    }
    assert!(rt.logger().minor_collections() > 0);
    assert_eq!(rt.roots().len(), 1);

    rt.major_collection();
    assert_eq!(rt.verify_heap(), 2 * length + 1);

    let mut node = list.get();
    for i in (0..length).rev() {
        let head = rt.ptr(node, 0).unwrap();
        assert_eq!(rt.prim(head, 0), i);
        node = rt.ptr(node, 1).unwrap();
    }
    assert_eq!(rt.prim(node, 0), 0xdead);
}


#[test]
fn write_barrier_remembers_old_to_young() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let cell = rt.alloc(tags.cell, 0);
    let cell = rt.root(cell);
    rt.minor_collection();
    assert!(!rt.is_young(cell.get()));

    let young = int(&mut rt, &tags, 7);
    rt.set_ptr(cell.get(), 0, Some(young));
    assert_eq!(rt.nursery().remembered_len(), 1);

    rt.minor_collection();
    assert_eq!(rt.nursery().remembered_len(), 0);

    let promoted = rt.ptr(cell.get(), 0).unwrap();
    assert!(!rt.is_young(promoted));
    assert_eq!(rt.prim(promoted, 0), 7);
}


#[test]
fn young_to_young_writes_are_not_remembered() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let cell = rt.alloc(tags.cell, 0);
    let cell = rt.root(cell);
    let young = int(&mut rt, &tags, 1);
    rt.set_ptr(cell.get(), 0, Some(young));
    assert_eq!(rt.nursery().remembered_len(), 0);
}


// overwrite whatever the last collection freed in the nursery
fn churn(rt: &mut Runtime, tags: &Tags, count: usize) {
    for i in 0..count {
        int(rt, tags, 1000 + i);
    }
}


#[test]
fn storing_a_young_husk_of_an_old_object() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let cell = rt.alloc(tags.cell, 0);
    let cell = rt.root(cell);
    let value = int(&mut rt, &tags, 77);
    let value = rt.root(value);
    rt.minor_collection();

    let thunk = int(&mut rt, &tags, 0);
    rt.redirect(thunk, value.get());
    rt.set_ptr(cell.get(), 0, Some(thunk));

    // the field holds the old target, so there is nothing to remember
    assert_eq!(rt.ptr(cell.get(), 0), Some(value.get()));
    assert_eq!(rt.nursery().remembered_len(), 0);

    rt.minor_collection();
    churn(&mut rt, &tags, 10);

    let stored = rt.ptr(cell.get(), 0).unwrap();
    assert!(!rt.is_young(stored));
    assert_eq!(stored, value.get());
    assert_eq!(rt.prim(stored, 0), 77);
}


#[test]
fn storing_a_young_husk_of_a_young_object() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let cell = rt.alloc(tags.cell, 0);
    let cell = rt.root(cell);
    rt.minor_collection();

    let target = int(&mut rt, &tags, 5);
    let target = rt.root(target);
    let thunk = int(&mut rt, &tags, 0);
    rt.redirect(thunk, target.get());
    rt.set_ptr(cell.get(), 0, Some(thunk));
    assert_eq!(rt.nursery().remembered_len(), 1);
    drop(target);

    rt.minor_collection();
    churn(&mut rt, &tags, 10);

    let stored = rt.ptr(cell.get(), 0).unwrap();
    assert!(!rt.is_young(stored));
    assert_eq!(rt.prim(stored, 0), 5);
    assert_eq!(rt.verify_heap(), 2);
}


#[test]
fn storing_a_young_husk_in_an_old_tail() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let array = rt.alloc(tags.array, 2);
    let array = rt.root(array);
    let value = int(&mut rt, &tags, 31);
    let value = rt.root(value);
    rt.minor_collection();

    let thunk = int(&mut rt, &tags, 0);
    rt.redirect(thunk, value.get());
    rt.set_tail_ptr(array.get(), 1, Some(thunk));
    assert_eq!(rt.nursery().remembered_len(), 0);

    rt.minor_collection();
    churn(&mut rt, &tags, 10);

    let stored = rt.tail_ptr(array.get(), 1).unwrap();
    assert!(!rt.is_young(stored));
    assert_eq!(rt.prim(stored, 0), 31);
    assert_eq!(rt.tail_ptr(array.get(), 0), None);
}


#[test]
#[should_panic(expected = "Array: tail holds pointers")]
fn plain_words_cannot_enter_a_pointer_tail() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let array = rt.alloc(tags.array, 2);
    let _array = rt.root(array);
    rt.set_tail_word(array, 0, 0x8);
}


#[test]
#[should_panic(expected = "write to promoted immutable object Int")]
fn promoted_immutable_objects_reject_writes() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let value = int(&mut rt, &tags, 1);
    let value = rt.root(value);
    rt.minor_collection();
    rt.set_prim(value.get(), 0, 2);
}


#[test]
fn redirect_is_transparent_and_collapsed() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let thunk = int(&mut rt, &tags, 1);
    let thunk = rt.root(thunk);
    let result = int(&mut rt, &tags, 2);
    let result = rt.root(result);

    rt.redirect(thunk.get(), result.get());
    assert_eq!(rt.prim(thunk.get(), 0), 2);
    assert_eq!(rt.describe(thunk.get()),
               "IND Node: Int, prims: 1, ptrs: 0, tail: Inline, size: 0");

    rt.minor_collection();
    assert_eq!(thunk.get(), result.get());
    assert_eq!(rt.logger().objects_promoted(), 1);
}


#[test]
fn redirecting_an_old_object_to_a_young_one() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let old = int(&mut rt, &tags, 1);
    let old = rt.root(old);
    rt.minor_collection();

    let young = int(&mut rt, &tags, 2);
    rt.redirect(old.get(), young);
    assert_eq!(rt.nursery().remembered_len(), 1);

    rt.minor_collection();
    assert!(!rt.is_young(old.get()));
    assert_eq!(rt.prim(old.get(), 0), 2);
}


#[test]
fn out_of_line_tails_survive_promotion() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let bytes = rt.alloc(tags.bytes, 5);
    assert_eq!(bytes.header().tail(), Tail::OutOfLine);
    for i in 0..5 {
        rt.set_tail_word(bytes, i, 100 + i);
    }
    let bytes = rt.root(bytes);

    rt.minor_collection();
    let obj = bytes.get();
    assert_eq!(obj.header().tail(), Tail::OutOfLine);
    assert_eq!(rt.tail_len(obj), 5);
    for i in 0..5 {
        assert_eq!(rt.tail_word(obj, i), 100 + i);
    }
    assert_eq!(rt.verify_heap(), 1);
}


#[test]
fn compaction_moves_tails_inline() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_tail_compact(true), table);

    let bytes = rt.alloc(tags.bytes, 3);
    for i in 0..3 {
        rt.set_tail_word(bytes, i, i * i);
    }
    let bytes = rt.root(bytes);

    rt.minor_collection();
    let obj = bytes.get();
    assert_eq!(obj.header().tail(), Tail::Inline);
    assert_eq!(rt.semispace().used_bytes(), (1 + 1 + 3) * WORD);
    for i in 0..3 {
        assert_eq!(rt.tail_word(obj, i), i * i);
    }
}


#[test]
fn tail_copy_allocates_inline() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_tail_copy(true), table);

    let bytes = rt.alloc(tags.bytes, 3);
    assert_eq!(bytes.header().tail(), Tail::Inline);
    assert_eq!(rt.nursery().used_bytes(), 5 * WORD);
}


#[test]
fn pointer_tails_are_traced() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let array = rt.alloc(tags.array, 4);
    let array = rt.root(array);
    for i in 0..4 {
        let value = int(&mut rt, &tags, i + 1);
        rt.set_tail_ptr(array.get(), i, Some(value));
    }

    rt.minor_collection();
    rt.major_collection();

    for i in 0..4 {
        let value = rt.tail_ptr(array.get(), i).unwrap();
        assert!(!rt.is_young(value));
        assert_eq!(rt.prim(value, 0), i + 1);
    }
    assert_eq!(rt.verify_heap(), 5);
}


#[test]
fn padding_rounds_to_even_words() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_padding(true), table);

    let cons = rt.alloc(tags.cons, 0);
    assert_eq!(rt.nursery().used_bytes(), 4 * WORD);
    let _cons = rt.root(cons);

    rt.minor_collection();
    assert_eq!(rt.semispace().used_bytes(), 4 * WORD);
}


#[test]
fn major_collection_drops_garbage() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small(), table);

    let seed = int(&mut rt, &tags, 0);
    let root = rt.root(seed);
    for i in 0..100 {
        let cons = rt.alloc(tags.cons, 0);
        rt.set_ptr(cons, 1, Some(root.get()));
        rt.set_ptr(cons, 0, None);
        root.set(cons);
        if i % 10 == 0 {
            rt.minor_collection();
        }
    }
    rt.minor_collection();
    assert!(rt.semispace().used_bytes() > 100 * 3 * WORD);

    let fresh = int(&mut rt, &tags, 9);
    root.set(fresh);
    rt.major_collection();

    assert_eq!(rt.logger().scavenges(), 1);
    assert_eq!(rt.semispace().used_bytes(), 2 * WORD);
    assert_eq!(rt.prim(root.get(), 0), 9);
}


#[test]
fn zero_threshold_scavenges_every_cycle() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_concurrent_threshold(0), table);

    let keep = int(&mut rt, &tags, 3);
    let keep = rt.root(keep);
    rt.minor_collection();
    rt.minor_collection();

    assert_eq!(rt.logger().concurrent_scavenges(), 2);
    assert_eq!(rt.prim(keep.get(), 0), 3);
    assert_eq!(rt.semispace().used_bytes(), 2 * WORD);
}


#[test]
#[should_panic(expected = "heap exhausted")]
fn live_data_beyond_the_semispace_is_fatal() {
    let (table, tags) = table();
    let config = GcConfig::default().with_nursery_size(1024).with_semispace_size(2048);
    let mut rt = Runtime::new(config, table);

    let seed = int(&mut rt, &tags, 0);
    let list = rt.root(seed);
    loop {
        let cons = rt.alloc(tags.cons, 0);
        rt.set_ptr(cons, 1, Some(list.get()));
        list.set(cons);
    }
}


#[test]
#[should_panic(expected = "can never fit nursery")]
fn oversized_allocation_is_fatal() {
    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_tail_copy(true), table);
    rt.alloc(tags.bytes, 1024 / WORD);
}


#[test]
#[should_panic(expected = "invalid heap object")]
fn corrupt_tag_fails_validation() {
    let (table, tags) = table();
    let len = table.len();
    let mut rt = Runtime::new(small(), table);

    let obj = int(&mut rt, &tags, 1);
    obj.set_header(Header::new(len + 1, 0, Tail::Inline));
    rt.validate(obj);
}


#[test]
#[should_panic(expected = "no descriptor registered")]
fn allocating_the_tail_block_tag_is_fatal() {
    let (table, _) = table();
    let mut rt = Runtime::new(small(), table);
    rt.alloc(0, 1);
}


#[test]
fn shutdown_returns_the_logger() {
    shadow_gc::start_logging(false);

    let (table, tags) = table();
    let mut rt = Runtime::new(small().with_gc_stats(true), table);
    let value = int(&mut rt, &tags, 5);
    let _value = rt.root(value);
    rt.minor_collection();

    let logger = rt.shutdown();
    assert_eq!(logger.minor_collections(), 1);
    assert_eq!(logger.bytes_promoted(), 2 * WORD);
}
