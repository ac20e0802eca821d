extern crate shadow_gc;

use shadow_gc::{DescriptorTable, GcConfig, Object, Root, Runtime, StatsLogger, Tag,
                TypeDescriptor};


struct Balloon {
    head: Root,
    tail: Root,
}


impl Balloon {
    fn inflate(rt: &mut Runtime, segment: Tag) -> Balloon {
        let body = rt.alloc(segment, 0);
        let tail = rt.root(body);
        let head = rt.root(body);
        Balloon {
            head: head,
            tail: tail,
        }
    }

    fn twist(&self, rt: &mut Runtime, segment: Tag) {
        let new_seg = rt.alloc(segment, 0);
        rt.set_ptr(new_seg, 0, Some(self.head.get()));
        self.head.set(new_seg);
    }

    fn complete(&self, rt: &mut Runtime) {
        rt.set_ptr(self.tail.get(), 0, Some(self.head.get()));
    }

    fn count(&self, rt: &Runtime) {
        let mut count = 0;
        let mut current = self.head.get();
        let tail = self.tail.get().resolve();

        loop {
            current = next(rt, current);
            count += 1;

            if current.resolve() == tail {
                break;
            }
        }

        if count != 1000 {
            println!("snake is short - only {} segments", count);
        }
    }
}


fn next(rt: &Runtime, segment: Object) -> Object {
    match rt.ptr(segment, 0) {
        Some(next) => next,
        None => panic!("snake is broken"),
    }
}


fn snake(rt: &mut Runtime, segment: Tag) {
    // this many snake balloons
    for _snake in 0..1000 {
        let balloon = Balloon::inflate(rt, segment);

        // with this many segments each
        for _segment in 0..1000 {
            balloon.twist(rt, segment);
        }

        balloon.complete(rt);
        balloon.count(rt);
    }
}


fn main() {
    shadow_gc::start_logging(false);

    let mut builder = DescriptorTable::builder();
    let segment = builder.register(TypeDescriptor::new("Segment", 0, 1).mutable());
    let mut rt = Runtime::new(GcConfig::default(), builder.build());

    snake(&mut rt, segment);

    let logger = rt.shutdown();
    logger.dump_to_stdout();
}
