#[cfg(all(test, feature = "loom"))]
mod tests {
    use crate::{Edge, Shutdown};
    use loom::{model::Builder, thread};
    use std::sync::Arc;

    fn builder() -> Builder {
        let mut builder = Builder::new();
        if builder.preemption_bound.is_none() {
            builder.preemption_bound = Some(3);
        }
        builder
    }

    #[test]
    fn test_single_producer_single_consumer() {
        builder().check(|| {
            let edge = Arc::new(Edge::new("loom", 1).unwrap());
            let shutdown = Shutdown::new();
            let num_messages = 3;

            let producer = {
                let edge = edge.clone();
                let shutdown = shutdown.clone();
                thread::spawn(move || {
                    for i in 0..num_messages {
                        edge.push(i, &shutdown).unwrap();
                    }
                })
            };

            let mut received = vec![];
            for _ in 0..num_messages {
                received.push(edge.pop(&shutdown).unwrap());
            }
            producer.join().unwrap();

            assert_eq!(received, vec![0, 1, 2]);
        });
    }

    #[test]
    fn test_release_consumer_never_strands_consumer() {
        builder().check(|| {
            let edge = Arc::new(Edge::<u8>::new("loom", 2).unwrap());
            let shutdown = Shutdown::new();

            let consumer = {
                let edge = edge.clone();
                let shutdown = shutdown.clone();
                thread::spawn(move || {
                    let mut taken = 0;
                    while edge.pop(&shutdown).is_some() {
                        taken += 1;
                    }
                    taken
                })
            };

            shutdown.trigger();
            edge.release_consumer(b' ');

            let taken = consumer.join().unwrap();
            assert!(taken <= 1);
        });
    }

    #[test]
    fn test_release_producer_never_strands_producer() {
        builder().check(|| {
            let edge = Arc::new(Edge::<u8>::new("loom", 1).unwrap());
            let shutdown = Shutdown::new();

            let producer = {
                let edge = edge.clone();
                let shutdown = shutdown.clone();
                thread::spawn(move || {
                    let mut sent = 0u8;
                    while edge.push(sent, &shutdown).is_ok() {
                        sent += 1;
                    }
                    sent
                })
            };

            shutdown.trigger();
            let _ = edge.release_producer();

            let sent = producer.join().unwrap();
            assert!(sent <= 2);
        });
    }
}
