//! # visca
//!
//! A Rust client library for VISCA camera heads on a daisy-chained serial bus.
//!
//! This library frames requests, serializes access to the shared half-duplex
//! line, assigns bus addresses, and maps raw zoom positions onto named zoom
//! steps.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - One session per bus, shared between tasks
//! - Type-safe packet framing and reply classification
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use visca::{Camera, OnOff, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), visca::Error> {
//!     // One session per serial bus
//!     let session = Arc::new(Session::serial("/dev/ttyUSB0"));
//!     let devices = session.start().await?;
//!     println!("{devices} cameras on the bus");
//!
//!     let camera = Camera::new(Arc::clone(&session), 1)?;
//!     camera.power(OnOff::On).await?;
//!     camera.zoom_tele_speed(3).await?;
//!
//!     let position = camera.zoom_position().await?;
//!     println!("zoom step {} (raw {:#010x})", position.index, position.raw());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Low-level protocol types (packets, replies, commands)
//! - [`zoom`] - Zoom step table and nearest-match lookup
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`session`] - Bus session: enumeration and request/reply exchange
//! - [`camera`] - High-level [`Camera`] handle
//! - [`types`] - Mode values used by commands and inquiries

pub mod camera;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;
pub mod zoom;

// Re-exports for convenience
pub use camera::Camera;
pub use error::{Error, PacketError, Result};
pub use protocol::{Address, DeviceErrorCode, Packet, ReplyKind};
pub use session::{RequestKind, Session, SessionConfig, SessionState};
pub use transport::{SerialTransport, Transport, serial::SerialConfig, serial::list_ports};
pub use types::{
    Datascreen, DigitalEffect, MemoryAction, OnOff, PictureEffect, Stabilization, VideoFormat,
    ZoomDirection,
};
pub use zoom::{ZoomPosition, ZoomTable};
