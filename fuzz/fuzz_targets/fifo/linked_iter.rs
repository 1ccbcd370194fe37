#![no_main]
use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;

use bounded_fifo::LinkedFifo;

fuzz_target!(|data: (LinkedFifo<u16>, Vec<u16>, u8)| {
    let (mut queue, items, dequeues) = data;

    let mut control: VecDeque<u16> = queue.iter().copied().collect();
    assert_eq!(control.len(), queue.len());
    assert!(queue.len() <= queue.max_capacity());

    for item in items {
        control.push_back(item);
        if control.len() > queue.max_capacity() {
            control.pop_front();
        }
        let _ = queue.enqueue(item);
    }

    for _ in 0..dequeues {
        assert_eq!(queue.dequeue(), control.pop_front());
    }

    assert!(queue.iter().eq(control.iter()));
    assert!(queue.iter().rev().eq(control.iter().rev()));
    assert_eq!(queue.oldest(), control.front());
    assert_eq!(queue.newest(), control.back());

    for item in queue.iter_mut() {
        *item = item.wrapping_add(1);
    }
    for item in control.iter_mut() {
        *item = item.wrapping_add(1);
    }

    let cloned = queue.clone();
    assert_eq!(cloned, queue);
    assert!(queue.into_iter().eq(control.into_iter()));
});
