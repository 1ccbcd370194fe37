#![no_main]
use std::collections::VecDeque;

use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use wrapper::Wrapper;

use bounded_fifo::{Invariant, LinkedFifo, Queue};

#[derive(Debug, Arbitrary)]
enum Operation<T> {
    Enqueue(T),
    TryEnqueue(T),
    Dequeue,
    BulkDequeue(u8),
}

fuzz_target!(|data: (Vec<Operation<u8>>, u16)| {
    let operations = data.0;
    let max_capacity = usize::from(data.1 % 2049);

    let mut control = VecDeque::new();
    let mut test = Invariant::new(LinkedFifo::new(max_capacity));

    for operation in operations {
        match operation {
            Operation::Enqueue(item) => {
                control.push_back(item);
                let control_result = if control.len() > max_capacity {
                    control.pop_front()
                } else {
                    None
                };
                let test_result = test.enqueue(item);
                assert_eq!(test_result, control_result);
            }
            Operation::TryEnqueue(item) => {
                let control_result = if control.len() >= max_capacity {
                    Err(item)
                } else {
                    control.push_back(item);
                    Ok(())
                };
                let test_result = test.as_mut().try_enqueue(item).map_err(|err| err.into_item());
                assert_eq!(test_result, control_result);
            }
            Operation::Dequeue => {
                let control_result = control.pop_front();
                let test_result = test.dequeue();
                assert_eq!(test_result, control_result);
            }
            Operation::BulkDequeue(n) => {
                let mut buffer = vec![0; usize::from(n)];
                let amount = test.bulk_dequeue(&mut buffer);
                let control_amount = amount.min(control.len());
                let control_items: Vec<u8> = control.drain(..control_amount).collect();
                assert_eq!(&buffer[..amount], &control_items[..]);
            }
        }

        assert_eq!(test.len(), control.len());
    }

    let remaining: Vec<u8> = test.into_inner().into_iter().collect();
    assert_eq!(remaining, Vec::from(control));
});
