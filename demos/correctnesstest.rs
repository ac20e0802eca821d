extern crate shadow_gc;

use shadow_gc::{DescriptorTable, GcConfig, Object, Runtime, StatsLogger, Tag, TailKind,
                TypeDescriptor};


// rooted things kept alive at any one time
const LIVE: usize = 64;


fn check(rt: &Runtime, thing: Object) {
    // any heap corruption might be evident here
    let thing = rt.validate(thing);
    assert!(rt.prim(thing, 0) == 42);
    assert!(rt.prim(thing, 1) == 42);
    assert!(rt.prim(thing, 2) == 42);
    assert!(rt.prim(thing, 3) == 42);
}


fn app(rt: &mut Runtime, thing: Tag, window: Tag) {
    let window = rt.alloc(window, LIVE);
    let window = rt.root(window);

    for n in 0..10000000 {
        let new = rt.alloc(thing, 0);
        for i in 0..4 {
            rt.set_prim(new, i, 42);
        }
        rt.set_tail_ptr(window.get(), n % LIVE, Some(new));

        if n % 100000 == 0 {
            for i in 0..LIVE {
                if let Some(old) = rt.tail_ptr(window.get(), i) {
                    check(rt, old);
                }
            }
        }
    }

    assert_eq!(rt.verify_heap(), LIVE + 1);
}


fn main() {
    shadow_gc::start_logging(false);

    let mut builder = DescriptorTable::builder();
    let thing = builder.register(TypeDescriptor::new("Thing", 4, 0));
    let window = builder.register(TypeDescriptor::new("Window", 0, 0)
        .mutable()
        .with_tail(TailKind::Pointers));
    let mut rt = Runtime::new(GcConfig::default().with_gc_stats(true), builder.build());

    app(&mut rt, thing, window);

    rt.shutdown();
}
