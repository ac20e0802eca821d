extern crate shadow_gc;
extern crate time;

use shadow_gc::{DescriptorTable, GcConfig, Runtime, StatsLogger, Tag, TypeDescriptor};

use time::precise_time_ns;


const THING_SIZE: usize = 8;
const THING_COUNT: u64 = 2500000;


fn app(rt: &mut Runtime, thing: Tag) {
    let start = precise_time_ns();

    for _ in 0..THING_COUNT {
        let new = rt.alloc(thing, 0);
        let _new = rt.root(new);
    }

    let elapsed_ms = ::std::cmp::max((precise_time_ns() - start) / 1_000_000, 1);
    let per_second = (THING_COUNT * 1000) / elapsed_ms;
    println!("app allocated {} objects at {} objects per second", THING_COUNT, per_second);
    println!("app finished in {}ms", elapsed_ms);
}


fn main() {
    shadow_gc::start_logging(false);

    let mut builder = DescriptorTable::builder();
    let thing = builder.register(TypeDescriptor::new("Thing", THING_SIZE, 0));
    let mut rt = Runtime::new(GcConfig::default(), builder.build());

    app(&mut rt, thing);
    app(&mut rt, thing);

    let logger = rt.shutdown();
    logger.dump_to_stdout();
}
