//! Zoom position table.
//!
//! The camera reports zoom as a raw 4-byte position code. The table maps the
//! codes of the named zoom steps to a 0-based logical index: optical steps
//! first (index 0 is fully wide), then the digital range.
//!
//! Positions reached under variable-speed control fall between table codes;
//! [`ZoomTable::nearest_index`] projects them onto the closest step.

/// Optical zoom steps, wide to tele.
pub const OPTICAL_ZOOM_CODES: [[u8; 4]; 30] = [
    [0x00, 0x00, 0x00, 0x00],
    [0x01, 0x06, 0x0A, 0x01],
    [0x02, 0x00, 0x06, 0x03],
    [0x02, 0x06, 0x02, 0x08],
    [0x02, 0x0A, 0x01, 0x0D],
    [0x02, 0x0D, 0x01, 0x03],
    [0x02, 0x0F, 0x06, 0x0D],
    [0x03, 0x01, 0x06, 0x01],
    [0x03, 0x03, 0x00, 0x0D],
    [0x03, 0x04, 0x08, 0x06],
    [0x03, 0x05, 0x0D, 0x07],
    [0x03, 0x07, 0x00, 0x09],
    [0x03, 0x08, 0x02, 0x00],
    [0x03, 0x09, 0x02, 0x00],
    [0x03, 0x0A, 0x00, 0x0A],
    [0x03, 0x0A, 0x0D, 0x0D],
    [0x03, 0x0B, 0x09, 0x0C],
    [0x03, 0x0C, 0x04, 0x06],
    [0x03, 0x0C, 0x0D, 0x0C],
    [0x03, 0x0D, 0x06, 0x00],
    [0x03, 0x0D, 0x0D, 0x04],
    [0x03, 0x0E, 0x03, 0x09],
    [0x03, 0x0E, 0x09, 0x00],
    [0x03, 0x0E, 0x0D, 0x0C],
    [0x03, 0x0F, 0x01, 0x0E],
    [0x03, 0x0F, 0x05, 0x07],
    [0x03, 0x0F, 0x08, 0x0A],
    [0x03, 0x0F, 0x0B, 0x06],
    [0x03, 0x0F, 0x0D, 0x0C],
    [0x04, 0x00, 0x00, 0x00],
];

/// Digital zoom steps. The first entry is the optical tele end.
pub const DIGITAL_ZOOM_CODES: [[u8; 4]; 12] = [
    [0x04, 0x00, 0x00, 0x00],
    [0x06, 0x00, 0x00, 0x00],
    [0x06, 0x0A, 0x08, 0x00],
    [0x07, 0x00, 0x00, 0x00],
    [0x07, 0x03, 0x00, 0x00],
    [0x07, 0x05, 0x04, 0x00],
    [0x07, 0x06, 0x0C, 0x00],
    [0x07, 0x08, 0x00, 0x00],
    [0x07, 0x08, 0x0C, 0x00],
    [0x07, 0x09, 0x08, 0x00],
    [0x07, 0x0A, 0x00, 0x00],
    [0x07, 0x0A, 0x0C, 0x00],
];

/// A zoom position resolved against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomPosition {
    /// Position code as reported by the camera.
    pub code: [u8; 4],
    /// Logical zoom index of the matching or closest step.
    pub index: usize,
    /// True if `code` is a table entry.
    pub exact: bool,
}

impl ZoomPosition {
    /// Returns the code as a big-endian integer.
    #[must_use]
    pub const fn raw(&self) -> u32 {
        u32::from_be_bytes(self.code)
    }
}

/// Ordered table of zoom step codes.
#[derive(Debug, Clone)]
pub struct ZoomTable {
    codes: Vec<[u8; 4]>,
    values: Vec<u32>,
    optical_len: usize,
}

impl ZoomTable {
    /// Builds a table from optical and digital code lists.
    ///
    /// The first digital code repeats the last optical code and is skipped.
    /// Both lists must be ascending.
    #[must_use]
    pub fn new(optical: &[[u8; 4]], digital: &[[u8; 4]]) -> Self {
        let codes: Vec<[u8; 4]> = optical
            .iter()
            .chain(digital.iter().skip(1))
            .copied()
            .collect();
        let values: Vec<u32> = codes.iter().map(|c| u32::from_be_bytes(*c)).collect();
        debug_assert!(
            values.windows(2).all(|w| w[0] < w[1]),
            "zoom codes must be strictly ascending"
        );

        Self {
            codes,
            values,
            optical_len: optical.len(),
        }
    }

    /// Number of steps in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns true if the table has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of optical steps; higher indices are digital zoom.
    #[must_use]
    pub const fn optical_len(&self) -> usize {
        self.optical_len
    }

    /// Returns the code of step `index`.
    #[must_use]
    pub fn code(&self, index: usize) -> Option<[u8; 4]> {
        self.codes.get(index).copied()
    }

    /// Returns the index of `code` if it is a table entry.
    #[must_use]
    pub fn exact_index(&self, code: [u8; 4]) -> Option<usize> {
        self.codes.iter().position(|c| *c == code)
    }

    /// Returns the index of the step closest to `code`.
    ///
    /// Equal distances resolve to the smaller value. Returns 0 for an empty
    /// table.
    #[must_use]
    pub fn nearest_index(&self, code: [u8; 4]) -> usize {
        let target = u32::from_be_bytes(code);
        let pos = self.values.partition_point(|&v| v < target);

        if pos == 0 {
            return 0;
        }
        if pos == self.values.len() {
            return pos - 1;
        }

        let before = self.values[pos - 1];
        let after = self.values[pos];
        if after - target < target - before {
            pos
        } else {
            pos - 1
        }
    }

    /// Resolves `code` to an exact step, falling back to the nearest one.
    #[must_use]
    pub fn resolve(&self, code: [u8; 4]) -> ZoomPosition {
        match self.exact_index(code) {
            Some(index) => ZoomPosition {
                code,
                index,
                exact: true,
            },
            None => ZoomPosition {
                code,
                index: self.nearest_index(code),
                exact: false,
            },
        }
    }
}

impl Default for ZoomTable {
    fn default() -> Self {
        Self::new(&OPTICAL_ZOOM_CODES, &DIGITAL_ZOOM_CODES)
    }
}
