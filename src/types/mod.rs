//! Typed values exchanged with cameras.
//!
//! Modes sent by commands and decoded from inquiry replies.

pub mod mode;

pub use mode::{
    Datascreen, DigitalEffect, MemoryAction, OnOff, PictureEffect, Stabilization, VideoFormat,
    ZoomDirection,
};
