use std::sync::atomic::{AtomicUsize, Ordering};
use super::*;

// ============================================================================
// partition
// ============================================================================

#[test]
fn test_partition_covers_all_elements() {
    let ranges = partition(10, 3);
    assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..10]);
}

#[test]
fn test_partition_fewer_elements_than_items() {
    assert_eq!(partition(2, 7), vec![0..1, 1..2]);
}

#[test]
fn test_partition_empty() {
    assert!(partition(0, 4).is_empty());
}

#[test]
fn test_partition_serial() {
    assert_eq!(partition(5, 0), vec![0..5]);
}

// ============================================================================
// Queues
// ============================================================================

#[test]
fn test_serial_queue_runs_in_order() {
    let mut log = Vec::new();
    {
        let log_ref = std::sync::Mutex::new(&mut log);
        let items: Vec<WorkItem> = (0..4)
            .map(|i| {
                let log_ref = &log_ref;
                Box::new(move || log_ref.lock().unwrap().push(i)) as WorkItem
            })
            .collect();
        SerialWorkQueue.complete(items);
    }
    assert_eq!(log, vec![0, 1, 2, 3]);
}

#[test]
fn test_rayon_queue_runs_all_items_on_disjoint_chunks() {
    let queue = RayonWorkQueue::new(3).unwrap();
    assert_eq!(queue.num_threads(), 3);

    let mut data = vec![1u32; 1000];
    let counter = AtomicUsize::new(0);
    {
        let counter = &counter;
        let items: Vec<WorkItem> = data
            .chunks_mut(100)
            .map(|chunk| {
                Box::new(move || {
                    for value in chunk.iter_mut() {
                        *value *= 2;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as WorkItem
            })
            .collect();
        queue.complete(items);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert!(data.iter().all(|&v| v == 2));
}
