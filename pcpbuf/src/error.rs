use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PcpBufError {
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    #[error("element type must not be zero-sized")]
    ZeroElementSize,

    #[error("failed to allocate storage for {0} elements: {1}")]
    Allocation(usize, #[source] TryReserveError),
}
