use std::sync::Barrier;

use rawlist::{FixedList, UnsafeList};
use rayon::prelude::*;

#[test]
fn test_rayon_producers_fill_presized_list() {
    const N: u64 = 100_000;
    let mut list = UnsafeList::<u64>::new(0).unwrap();
    list.reserve(N as usize).unwrap();
    let writer = list.parallel_writer();
    (0..N).into_par_iter().for_each(|v| {
        // SAFETY: the list was reserved for exactly `N` values.
        unsafe { writer.add_unchecked_parallel(v) };
    });

    assert_eq!(list.len(), N as usize);
    let mut values = list.to_vec();
    values.sort_unstable();
    assert!(values.iter().copied().eq(0..N));
}

#[test]
fn test_rayon_range_appends_stay_contiguous() {
    const CHUNKS: usize = 512;
    const CHUNK: usize = 16;
    let mut list = FixedList::<u32>::new(CHUNKS * CHUNK);
    let writer = list.parallel_writer();
    (0..CHUNKS).into_par_iter().for_each(|c| {
        let chunk = [c as u32; CHUNK];
        assert!(writer.try_add_range_parallel(&chunk));
    });

    assert!(list.is_full());
    for block in list.as_slice().chunks(CHUNK) {
        assert!(block.iter().all(|&v| v == block[0]));
    }
    let mut heads = list.as_slice().iter().step_by(CHUNK).copied().collect::<Vec<_>>();
    heads.sort_unstable();
    assert!(heads.iter().copied().eq(0..CHUNKS as u32));
}

#[test]
fn test_try_add_never_exceeds_capacity_under_contention() {
    const THREADS: usize = 16;
    const ATTEMPTS: usize = 5_000;
    const CAPACITY: usize = 3_333;

    for _ in 0..4 {
        let mut list = UnsafeList::<u32>::new(CAPACITY).unwrap();
        let barrier = Barrier::new(THREADS);
        let writer = list.parallel_writer();
        let max_seen = std::thread::scope(|s| {
            let handles = (0..THREADS)
                .map(|_| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        let mut max_len = 0;
                        for i in 0..ATTEMPTS {
                            writer.try_add_parallel(i as u32);
                            max_len = max_len.max(writer.len());
                        }
                        max_len
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .max()
                .unwrap_or(0)
        });

        // The counter may overshoot while rejected claims roll back, but
        // never by more than one per contending thread.
        assert!(max_seen <= CAPACITY + THREADS);
        assert_eq!(list.len(), CAPACITY);
        assert_eq!(list.capacity(), CAPACITY);
    }
}

#[test]
fn test_mixed_range_and_single_claims() {
    const THREADS: usize = 8;
    let mut list = FixedList::<u16>::new(1000);
    let writer = list.parallel_writer();
    std::thread::scope(|s| {
        for t in 0..THREADS {
            s.spawn(move || {
                for _ in 0..200 {
                    if t % 2 == 0 {
                        writer.try_add_parallel(1);
                    } else {
                        writer.try_add_range_parallel(&[2, 2, 2]);
                    }
                }
            });
        }
    });

    assert!(list.len() <= list.capacity());
    let twos = list.iter().filter(|&&v| v == 2).count();
    assert_eq!(twos % 3, 0);
    assert!(list.iter().all(|&v| v == 1 || v == 2));
}

#[test]
fn test_views_feed_parallel_readers() {
    let mut list = UnsafeList::<u64>::new(0).unwrap();
    list.add_range(&(1..=10_000).collect::<Vec<_>>()).unwrap();
    let sum: u64 = list.view(..).par_iter().sum();
    assert_eq!(sum, 10_000 * 10_001 / 2);

    list.view_mut(..).par_iter_mut().for_each(|v| *v *= 2);
    assert_eq!(list[9_999], 20_000);
}
