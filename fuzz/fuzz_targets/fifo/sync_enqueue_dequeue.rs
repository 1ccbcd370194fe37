#![no_main]
use std::collections::VecDeque;

use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use bounded_fifo::BoundedFifoQueue;

#[derive(Debug, Arbitrary)]
enum Operation<T> {
    Enqueue(T),
    Dequeue,
    Snapshot,
    Drain,
}

fuzz_target!(|data: (Vec<Operation<u8>>, u8)| {
    let operations = data.0;
    let max_capacity = usize::from(data.1);

    let mut control = VecDeque::new();
    let test = BoundedFifoQueue::new(max_capacity);

    for operation in operations {
        match operation {
            Operation::Enqueue(item) => {
                control.push_back(item);
                let control_result = if control.len() > max_capacity {
                    control.pop_front()
                } else {
                    None
                };
                assert_eq!(test.enqueue(item), control_result);
            }
            Operation::Dequeue => {
                assert_eq!(test.dequeue(), control.pop_front());
            }
            Operation::Snapshot => {
                assert!(test.iter().eq(control.iter().copied()));
            }
            Operation::Drain => {
                assert_eq!(test.drain(), control.drain(..).collect::<Vec<_>>());
            }
        }

        assert_eq!(test.len(), control.len());
        assert!(test.len() <= test.max_capacity());
    }
});
