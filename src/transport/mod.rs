//! Transport layer for VISCA communication.
//!
//! This module provides the abstraction over the physical byte link.
//! Currently only RS-232/USB serial is implemented.

#[cfg(test)]
pub(crate) mod mock;
pub mod serial;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait for byte-level link implementations.
///
/// Reads are one byte at a time with the link's own read timeout.
pub trait Transport: Send {
    /// Opens the link.
    fn open(&mut self) -> TransportFuture<'_, ()>;

    /// Closes the link.
    fn close(&mut self) -> TransportFuture<'_, ()>;

    /// Writes all of `data` and flushes it.
    fn write(&mut self, data: Bytes) -> TransportFuture<'_, ()>;

    /// Reads one byte, or `None` if the read timeout elapsed first.
    fn read_byte(&mut self) -> TransportFuture<'_, Option<u8>>;

    /// Returns the number of bytes waiting to be read.
    fn bytes_waiting(&mut self) -> Result<usize>;

    /// Discards pending input and output.
    fn clear(&mut self) -> Result<()>;

    /// Returns true if open.
    fn is_open(&self) -> bool;
}

pub use serial::SerialTransport;
