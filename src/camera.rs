//! High-level camera handle.
//!
//! A [`Camera`] binds one bus address to a shared [`Session`] and exposes the
//! camera functions as typed async methods.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::command::{
    self, CameraFunction, MAX_DIGITAL_EFFECT_LEVEL, MAX_ZOOM_SPEED,
};
use crate::protocol::packet::Address;
use crate::protocol::parser;
use crate::protocol::reply::{ReplyKind, check};
use crate::session::{RequestKind, Session};
use crate::transport::{SerialTransport, Transport};
use crate::types::{
    Datascreen, DigitalEffect, MemoryAction, OnOff, PictureEffect, Stabilization, VideoFormat,
    ZoomDirection,
};
use crate::zoom::ZoomPosition;

/// Highest aperture level.
pub const MAX_APERTURE_LEVEL: u8 = 16;

/// A camera on the bus.
///
/// Cloning is cheap; all clones share the session.
pub struct Camera<T = SerialTransport> {
    session: Arc<Session<T>>,
    address: Address,
}

impl<T> Clone for Camera<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            address: self.address,
        }
    }
}

impl<T: Transport> Camera<T> {
    /// Creates a handle for the camera at `address` (1-7).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for addresses outside 1-7.
    pub fn new(session: Arc<Session<T>>, address: u8) -> Result<Self> {
        Ok(Self {
            session,
            address: Address::device(address)?,
        })
    }

    /// Creates a handle that addresses every camera on the bus.
    ///
    /// Commands are broadcast; inquiries are not meaningful.
    #[must_use]
    pub const fn broadcast(session: Arc<Session<T>>) -> Self {
        Self {
            session,
            address: Address::Broadcast,
        }
    }

    /// Returns the camera address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the session.
    #[must_use]
    pub const fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    /// Sends a command and returns the classified reply.
    async fn command(&self, payload: Bytes) -> Result<ReplyKind> {
        let reply = self
            .session
            .exchange(self.address, &payload, RequestKind::Command)
            .await?;
        check(&reply)
    }

    /// Sends an inquiry and returns the completion data.
    async fn inquire(&self, payload: Bytes) -> Result<Vec<u8>> {
        let reply = self
            .session
            .exchange(self.address, &payload, RequestKind::Inquiry)
            .await?;
        match check(&reply)? {
            ReplyKind::Completion { data, .. } => Ok(data),
            _ => Err(Error::unexpected(format!(
                "inquiry answered with {}",
                hex::encode(reply.as_bytes())
            ))),
        }
    }

    async fn set(&self, func: CameraFunction, mode: OnOff) -> Result<()> {
        self.command(command::switch(func, mode)).await?;
        Ok(())
    }

    async fn get(&self, func: CameraFunction) -> Result<OnOff> {
        let data = self.inquire(command::camera_inquiry(func, &[])).await?;
        parser::parse_on_off(&data)
    }

    // ========== Power ==========

    /// Switches the camera on or off.
    pub async fn power(&self, mode: OnOff) -> Result<()> {
        self.command(command::power(mode)).await?;
        Ok(())
    }

    /// Switches the camera on.
    pub async fn power_on(&self) -> Result<()> {
        self.power(OnOff::On).await
    }

    /// Switches the camera off (standby).
    pub async fn power_off(&self) -> Result<()> {
        self.power(OnOff::Off).await
    }

    /// Powers off after `minutes` without commands; 0 disables the timer.
    pub async fn auto_power_off(&self, minutes: u16) -> Result<()> {
        self.command(command::auto_power_off(minutes)).await?;
        Ok(())
    }

    // ========== Zoom ==========

    /// Stops a variable zoom.
    pub async fn zoom_stop(&self) -> Result<()> {
        self.command(command::zoom_stop()).await?;
        Ok(())
    }

    /// Zooms in at standard speed.
    pub async fn zoom_tele(&self) -> Result<()> {
        self.command(command::zoom(ZoomDirection::Tele)).await?;
        Ok(())
    }

    /// Zooms out at standard speed.
    pub async fn zoom_wide(&self) -> Result<()> {
        self.command(command::zoom(ZoomDirection::Wide)).await?;
        Ok(())
    }

    /// Zooms at `speed` (0 slowest, 7 fastest).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for speeds above 7.
    pub async fn zoom_speed(&self, direction: ZoomDirection, speed: u8) -> Result<()> {
        if speed > MAX_ZOOM_SPEED {
            return Err(Error::out_of_range(
                "zoom speed",
                speed,
                0,
                i64::from(MAX_ZOOM_SPEED),
            ));
        }
        self.command(command::zoom_speed(direction, speed)).await?;
        Ok(())
    }

    /// Zooms in at `speed` (0-7).
    pub async fn zoom_tele_speed(&self, speed: u8) -> Result<()> {
        self.zoom_speed(ZoomDirection::Tele, speed).await
    }

    /// Zooms out at `speed` (0-7).
    pub async fn zoom_wide_speed(&self, speed: u8) -> Result<()> {
        self.zoom_speed(ZoomDirection::Wide, speed).await
    }

    /// Moves the zoom to a logical step of the zoom table (0 is fully wide).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `index` is past the last step.
    pub async fn zoom_to(&self, index: usize) -> Result<()> {
        let table = self.session.zoom_table();
        let Some(code) = table.code(index) else {
            let max = i64::try_from(table.len().saturating_sub(1)).unwrap_or(i64::MAX);
            let value = i64::try_from(index).unwrap_or(i64::MAX);
            return Err(Error::out_of_range("zoom index", value, 0, max));
        };
        tracing::debug!("zoom to step {} ({})", index, hex::encode(code));
        self.command(command::zoom_direct(code)).await?;
        Ok(())
    }

    /// Enables or disables digital zoom.
    pub async fn digital_zoom(&self, mode: OnOff) -> Result<()> {
        self.command(command::digital_zoom(mode)).await?;
        Ok(())
    }

    /// Reads the zoom position and maps it onto the zoom table.
    ///
    /// Cameras that answer the position inquiry without a usable position are
    /// sent a zoom stop, which reports the position in its completion.
    pub async fn zoom_position(&self) -> Result<ZoomPosition> {
        let inquiry = command::camera_inquiry(CameraFunction::ZoomPosition, &[]);
        let data = match self.inquire(inquiry).await {
            Ok(data) if data.len() == 4 => data,
            Ok(data) => {
                tracing::debug!(
                    "zoom position inquiry returned {}; asking via zoom stop",
                    hex::encode(&data)
                );
                self.inquire(command::zoom_stop()).await?
            }
            Err(Error::InquiryExhausted { .. }) => {
                tracing::debug!("zoom position inquiry exhausted; asking via zoom stop");
                self.inquire(command::zoom_stop()).await?
            }
            Err(e) => return Err(e),
        };
        let code = parser::parse_zoom_code(&data)?;
        let position = self.session.zoom_table().resolve(code);
        if !position.exact {
            tracing::debug!(
                "zoom code {} between steps, nearest is {}",
                hex::encode(code),
                position.index
            );
        }
        Ok(position)
    }

    // ========== Image ==========

    /// Sets left/right reverse.
    pub async fn set_mirror(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::Mirror, mode).await
    }

    /// Reads left/right reverse.
    pub async fn mirror(&self) -> Result<OnOff> {
        self.get(CameraFunction::Mirror).await
    }

    /// Sets up/down reverse.
    pub async fn set_flip(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::Flip, mode).await
    }

    /// Reads up/down reverse.
    pub async fn flip(&self) -> Result<OnOff> {
        self.get(CameraFunction::Flip).await
    }

    /// Sets backlight compensation.
    pub async fn set_backlight(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::Backlight, mode).await
    }

    /// Reads backlight compensation.
    pub async fn backlight(&self) -> Result<OnOff> {
        self.get(CameraFunction::Backlight).await
    }

    /// Sets high resolution mode.
    pub async fn set_high_resolution(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::HighResolution, mode).await
    }

    /// Reads high resolution mode.
    pub async fn high_resolution(&self) -> Result<OnOff> {
        self.get(CameraFunction::HighResolution).await
    }

    /// Freezes or releases the picture.
    pub async fn set_freeze(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::Freeze, mode).await
    }

    /// Switches image stabilization on or off.
    pub async fn set_stabilization(&self, mode: OnOff) -> Result<()> {
        self.set(CameraFunction::Stabilization, mode).await
    }

    /// Reads image stabilization.
    pub async fn stabilization(&self) -> Result<Stabilization> {
        let data = self
            .inquire(command::camera_inquiry(CameraFunction::Stabilization, &[]))
            .await?;
        parser::parse_stabilization(&data)
    }

    /// Selects a picture effect.
    pub async fn set_picture_effect(&self, effect: PictureEffect) -> Result<()> {
        self.command(command::picture_effect(effect)).await?;
        Ok(())
    }

    /// Reads the picture effect.
    pub async fn picture_effect(&self) -> Result<PictureEffect> {
        let data = self
            .inquire(command::camera_inquiry(CameraFunction::PictureEffect, &[]))
            .await?;
        parser::parse_picture_effect(&data)
    }

    /// Selects a digital effect.
    pub async fn set_digital_effect(&self, effect: DigitalEffect) -> Result<()> {
        self.command(command::digital_effect(effect)).await?;
        Ok(())
    }

    /// Sets the digital effect level (0-0x3F).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for levels above 0x3F.
    pub async fn set_digital_effect_level(&self, level: u8) -> Result<()> {
        if level > MAX_DIGITAL_EFFECT_LEVEL {
            return Err(Error::out_of_range(
                "digital effect level",
                level,
                0,
                i64::from(MAX_DIGITAL_EFFECT_LEVEL),
            ));
        }
        self.command(command::digital_effect_level(level)).await?;
        Ok(())
    }

    // ========== Aperture ==========

    /// Steps the aperture up.
    pub async fn aperture_up(&self) -> Result<()> {
        self.command(command::aperture_step(true)).await?;
        Ok(())
    }

    /// Steps the aperture down.
    pub async fn aperture_down(&self) -> Result<()> {
        self.command(command::aperture_step(false)).await?;
        Ok(())
    }

    /// Resets the aperture.
    pub async fn aperture_reset(&self) -> Result<()> {
        self.command(command::aperture_reset()).await?;
        Ok(())
    }

    /// Sets the aperture level (1-16).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` outside 1-16.
    pub async fn aperture(&self, level: u8) -> Result<()> {
        if !(1..=MAX_APERTURE_LEVEL).contains(&level) {
            return Err(Error::out_of_range(
                "aperture level",
                level,
                1,
                i64::from(MAX_APERTURE_LEVEL),
            ));
        }
        self.command(command::aperture_direct(level)).await?;
        Ok(())
    }

    // ========== Memory ==========

    /// Clears preset `slot` (clamped to 5).
    pub async fn memory_reset(&self, slot: u8) -> Result<()> {
        self.command(command::memory(MemoryAction::Reset, slot)).await?;
        Ok(())
    }

    /// Stores the current state in preset `slot` (clamped to 5).
    pub async fn memory_set(&self, slot: u8) -> Result<()> {
        self.command(command::memory(MemoryAction::Set, slot)).await?;
        Ok(())
    }

    /// Recalls preset `slot` (clamped to 5).
    pub async fn memory_recall(&self, slot: u8) -> Result<()> {
        self.command(command::memory(MemoryAction::Recall, slot)).await?;
        Ok(())
    }

    // ========== Registers ==========

    /// Writes a camera register.
    pub async fn set_register(&self, register: u8, value: u8) -> Result<()> {
        self.command(command::register_write(register, value)).await?;
        Ok(())
    }

    /// Reads a camera register.
    pub async fn register(&self, register: u8) -> Result<u8> {
        let data = self.inquire(command::register_inquiry(register)).await?;
        parser::parse_register(&data)
    }

    /// Reads the video output format.
    pub async fn video_format(&self) -> Result<VideoFormat> {
        let data = self
            .inquire(command::register_inquiry(VideoFormat::REGISTER))
            .await?;
        parser::parse_video_format(&data)
    }

    // ========== Pan-tilter ==========

    /// Controls the on-screen data display.
    pub async fn datascreen(&self, mode: Datascreen) -> Result<()> {
        self.command(command::datascreen(mode)).await?;
        Ok(())
    }
}
