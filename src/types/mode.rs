//! Mode values shared by commands and inquiries.

/// Two-state switch used by most camera functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnOff {
    /// Function enabled.
    On,
    /// Function disabled.
    Off,
}

impl OnOff {
    /// Parses a mode byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::On),
            0x03 => Some(Self::Off),
            _ => None,
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::On => 0x02,
            Self::Off => 0x03,
        }
    }

    /// Returns true for [`OnOff::On`].
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for OnOff {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Image stabilization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stabilization {
    /// Stabilization active.
    On,
    /// Stabilization disabled.
    Off,
    /// Correction frozen at its current offset.
    Hold,
}

impl Stabilization {
    /// Parses a mode byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::On),
            0x03 => Some(Self::Off),
            0x00 => Some(Self::Hold),
            _ => None,
        }
    }
}

/// Picture effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PictureEffect {
    /// No effect.
    Off = 0x00,
    /// Pastel colors.
    Pastel = 0x01,
    /// Negative image.
    NegArt = 0x02,
    /// Sepia tone.
    Sepia = 0x03,
    /// Monochrome.
    BlackWhite = 0x04,
    /// Posterized colors.
    Solarize = 0x05,
    /// Mosaic blocks.
    Mosaic = 0x06,
    /// Horizontally squeezed.
    Slim = 0x07,
    /// Horizontally stretched.
    Stretch = 0x08,
}

impl PictureEffect {
    /// Parses an effect byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Off),
            0x01 => Some(Self::Pastel),
            0x02 => Some(Self::NegArt),
            0x03 => Some(Self::Sepia),
            0x04 => Some(Self::BlackWhite),
            0x05 => Some(Self::Solarize),
            0x06 => Some(Self::Mosaic),
            0x07 => Some(Self::Slim),
            0x08 => Some(Self::Stretch),
            _ => None,
        }
    }
}

impl From<PictureEffect> for u8 {
    fn from(effect: PictureEffect) -> Self {
        effect as Self
    }
}

/// Digital effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DigitalEffect {
    /// No effect.
    Off = 0x00,
    /// Still image overlaid on live video.
    Still = 0x01,
    /// Strobe-like sequence of stills.
    Flash = 0x02,
    /// Bright parts of a still keyed over live video.
    Lumi = 0x03,
    /// Moving subjects leave a trail.
    Trail = 0x04,
}

impl From<DigitalEffect> for u8 {
    fn from(effect: DigitalEffect) -> Self {
        effect as Self
    }
}

/// Memory preset operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryAction {
    /// Clear the preset.
    Reset = 0x00,
    /// Store the current state.
    Set = 0x01,
    /// Move to the stored state.
    Recall = 0x02,
}

impl From<MemoryAction> for u8 {
    fn from(action: MemoryAction) -> Self {
        action as Self
    }
}

/// Pan-tilter datascreen control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Datascreen {
    /// Show the data display.
    On = 0x02,
    /// Hide the data display.
    Off = 0x03,
    /// Switch between shown and hidden.
    Toggle = 0x10,
}

impl From<Datascreen> for u8 {
    fn from(mode: Datascreen) -> Self {
        mode as Self
    }
}

/// Direction of a variable-speed zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomDirection {
    /// Towards the telephoto end.
    Tele,
    /// Towards the wide end.
    Wide,
}

/// Video output formats held in register 0x72.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    /// 1080i at 59.94 Hz.
    Hd1080i5994,
    /// NTSC analog output.
    NtscAnalog,
    /// 1080i at 50 Hz.
    Hd1080i50,
    /// PAL analog output.
    PalAnalog,
    /// 1080p at 29.97 Hz.
    Hd1080p2997,
    /// 1080p at 25 Hz.
    Hd1080p25,
    /// 720p at 59.94 Hz.
    Hd720p5994,
    /// 720p at 50 Hz.
    Hd720p50,
    /// 720p at 29.97 Hz.
    Hd720p2997,
    /// 720p at 25 Hz.
    Hd720p25,
    /// 1080p at 59.94 Hz.
    Hd1080p5994,
    /// 1080p at 50 Hz.
    Hd1080p50,
}

impl VideoFormat {
    /// Register holding the video format.
    pub const REGISTER: u8 = 0x72;

    /// Parses a register value.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Hd1080i5994),
            0x03 => Some(Self::NtscAnalog),
            0x04 => Some(Self::Hd1080i50),
            0x05 => Some(Self::PalAnalog),
            0x06 => Some(Self::Hd1080p2997),
            0x08 => Some(Self::Hd1080p25),
            0x09 => Some(Self::Hd720p5994),
            0x0C => Some(Self::Hd720p50),
            0x0E => Some(Self::Hd720p2997),
            0x11 => Some(Self::Hd720p25),
            0x13 => Some(Self::Hd1080p5994),
            0x14 => Some(Self::Hd1080p50),
            _ => None,
        }
    }

    /// Returns the conventional name of the format.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hd1080i5994 => "1080i/59.94",
            Self::NtscAnalog => "NTSC Analog",
            Self::Hd1080i50 => "1080i/50",
            Self::PalAnalog => "PAL Analog",
            Self::Hd1080p2997 => "1080p/29.97",
            Self::Hd1080p25 => "1080p/25",
            Self::Hd720p5994 => "720p/59.94",
            Self::Hd720p50 => "720p/50",
            Self::Hd720p2997 => "720p/29.97",
            Self::Hd720p25 => "720p/25",
            Self::Hd1080p5994 => "1080p/59.94",
            Self::Hd1080p50 => "1080p/50",
        }
    }
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_off() {
        assert_eq!(OnOff::from_byte(0x02), Some(OnOff::On));
        assert_eq!(OnOff::from_byte(0x03), Some(OnOff::Off));
        assert_eq!(OnOff::from_byte(0x00), None);
        assert_eq!(OnOff::from(true).to_byte(), 0x02);
        assert!(!OnOff::Off.is_on());
    }

    #[test]
    fn test_stabilization_hold() {
        assert_eq!(Stabilization::from_byte(0x00), Some(Stabilization::Hold));
        assert_eq!(Stabilization::from_byte(0x04), None);
    }

    #[test]
    fn test_video_format_reserved_values() {
        assert_eq!(VideoFormat::from_byte(0x14), Some(VideoFormat::Hd1080p50));
        assert_eq!(VideoFormat::from_byte(0x02), None);
        assert_eq!(VideoFormat::from_byte(0x0A), None);
        assert_eq!(VideoFormat::Hd720p25.to_string(), "720p/25");
    }
}
