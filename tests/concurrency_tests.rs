//! # Concurrency Tests using Loom
//!
//! The orchestrator checks its `CancellationToken` before every pop of the
//! execution queue, while the Ctrl-C handler cancels from another task.
//! These models explore the interleavings of that check against the cancel.

#[cfg(test)]
mod tests {
    use loom::sync::atomic::{AtomicUsize, Ordering};
    use loom::sync::{Arc, Mutex};
    use loom::thread;
    use tokio_util::sync::CancellationToken;

    const STACK_SIZE: usize = 8 * 1024 * 1024; // 8 MB

    fn in_large_stack(f: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .name("loom-test-thread".into())
            .stack_size(STACK_SIZE)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap();
    }

    /// One thread drains a queue, checking the token before each pop; the
    /// other cancels at an arbitrary point. Every node is either executed or
    /// still queued, and nothing is popped once cancellation was observed.
    #[test]
    fn test_cancel_races_with_queue_drain() {
        in_large_stack(|| {
            loom::model(|| {
                const NODES: usize = 2;
                let queue = Arc::new(Mutex::new((0..NODES).collect::<Vec<usize>>()));
                let executed = Arc::new(AtomicUsize::new(0));
                let token = CancellationToken::new();

                let runner = {
                    let queue = queue.clone();
                    let executed = executed.clone();
                    let token = token.clone();
                    thread::spawn(move || {
                        loop {
                            if token.is_cancelled() {
                                return true;
                            }
                            let next = queue.lock().unwrap().pop();
                            if next.is_none() {
                                return false;
                            }
                            executed.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                };

                let canceller = {
                    let token = token.clone();
                    thread::spawn(move || token.cancel())
                };

                let cancelled = runner.join().unwrap();
                canceller.join().unwrap();

                let ran = executed.load(Ordering::SeqCst);
                let left = queue.lock().unwrap().len();
                assert_eq!(ran + left, NODES);
                if !cancelled {
                    assert_eq!(left, 0);
                }
                assert!(token.is_cancelled());
            });
        });
    }

    /// A node already in flight when the token fires still finishes and is
    /// counted exactly once.
    #[test]
    fn test_in_flight_node_completes_after_cancel() {
        in_large_stack(|| {
            loom::model(|| {
                let token = CancellationToken::new();
                let finished = Arc::new(AtomicUsize::new(0));

                let worker = {
                    let token = token.clone();
                    let finished = finished.clone();
                    thread::spawn(move || {
                        if !token.is_cancelled() {
                            // The executor does not look at the token.
                            finished.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                };
                let canceller = {
                    let token = token.clone();
                    thread::spawn(move || token.cancel())
                };

                worker.join().unwrap();
                canceller.join().unwrap();

                assert!(finished.load(Ordering::SeqCst) <= 1);
                assert!(token.is_cancelled());
            });
        });
    }
}
