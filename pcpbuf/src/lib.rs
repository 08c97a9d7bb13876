//! # pcpbuf - bounded producer/consumer handoff
//!
//! Building blocks for threads that exchange data through fixed-size
//! buffers with blocking backpressure:
//!
//! - [`RingBuf`]: fixed-capacity FIFO storage, not synchronized.
//! - [`Monitor`]: one mutex and two condition variables ("room freed" and
//!   "data available") around a value.
//! - [`Edge`]: a `RingBuf` inside a `Monitor`, implementing the blocking
//!   insert/remove protocol and the shutdown release handshake.
//! - [`Shutdown`]: the shared keep-running flag every thread checks.
//!
//! ## Ring buffer
//!
//! ```rust
//! use pcpbuf::{Insert, RingBuf};
//!
//! let mut buffer = RingBuf::new(2)?;
//! assert_eq!(buffer.insert_single(1u32), Insert::Inserted);
//! assert_eq!(buffer.insert_single(2), Insert::Inserted);
//! assert_eq!(buffer.insert_single(3), Insert::Full(3));
//! assert_eq!(buffer.remove_single(), Some(1));
//! assert_eq!(buffer.read_available() + buffer.write_available(), 2);
//! # Ok::<(), pcpbuf::PcpBufError>(())
//! ```
//!
//! ## Handing data between threads
//!
//! ```rust
//! use pcpbuf::{Edge, Shutdown};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let edge = Arc::new(Edge::new("numbers", 8)?);
//! let shutdown = Shutdown::new();
//!
//! let producer = {
//!     let edge = edge.clone();
//!     let shutdown = shutdown.clone();
//!     thread::spawn(move || {
//!         for i in 0..100u32 {
//!             if edge.push(i, &shutdown).is_err() {
//!                 break;
//!             }
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! for _ in 0..100 {
//!     sum += edge.pop(&shutdown).unwrap();
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, 4950);
//! # Ok::<(), pcpbuf::PcpBufError>(())
//! ```
//!
//! ## Shutting down
//!
//! A thread that leaves the pipeline releases its peers so none stays
//! parked: the producer side calls [`Edge::release_consumer`], the consumer
//! side [`Edge::release_producer`]. Blocked `push`/`pop` calls re-check the
//! flag on wake-up and return.
//!
//! ```rust
//! use pcpbuf::{Edge, Shutdown};
//!
//! let edge = Edge::<u8>::new("bytes", 4)?;
//! let shutdown = Shutdown::new();
//! shutdown.trigger();
//! edge.release_consumer(b' ');
//! assert_eq!(edge.pop(&shutdown), Some(b' '));
//! assert_eq!(edge.pop(&shutdown), None);
//! # Ok::<(), pcpbuf::PcpBufError>(())
//! ```

pub use edge::Edge;
pub use error::PcpBufError;
pub use monitor::{Monitor, MonitorGuard};
pub use ringbuf::{Insert, RingBuf};
pub use shutdown::Shutdown;

pub(crate) mod common;
pub mod edge;
pub mod error;
#[cfg(all(test, feature = "loom"))]
pub(crate) mod loom;
pub mod monitor;
pub mod ringbuf;
pub mod shutdown;
pub(crate) mod sync;
