//! Packed pixel store for the segmented panel
//!
//! The panel packs four 2-bit pixels per byte. A logical row of segments is
//! tiled five times on the glass, so a segment write lands on five byte
//! offsets at once.

use bit_field::BitField;

use crate::color::Gray;

/// Width of the display
pub const WIDTH: u32 = 240;

/// Gate lines driven per update pass
pub const ROWS: u32 = 5;

/// Bytes streamed to the controller per frame write
pub const FRAME_BYTES: usize = (WIDTH as usize * ROWS as usize) / 4;

/// Size of the local pixel buffer, matches the controller RAM window
pub const BUFFER_SIZE: usize = 8760;

/// Independently drawable segments on the panel
pub const SEGMENT_COUNT: usize = 22;

/// Pixel position of each logical segment
const SEGMENT_POSITIONS: [u16; SEGMENT_COUNT] = [
    113, 105, 97, 89, 81, 73, 65, 57, 49, 41, 33, 234, 226, 218, 210, 202, 194, 186, 178, 170,
    162, 154,
];

/// Byte distance between two tile copies of the same logical row
const TILE_STRIDE: usize = 60;

/// Tile copies of the logical row on the glass
const TILE_COPIES: usize = 5;

/// In-memory frame, flushed wholesale to the controller by the driver.
///
/// Fixed size for the lifetime of the driver instance.
pub struct Frame {
    data: [u8; BUFFER_SIZE],
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Creates a white frame
    pub fn new() -> Self {
        Frame {
            data: [Gray::White.get_byte_value(); BUFFER_SIZE],
        }
    }

    /// Sets every packed byte to the given level
    pub fn clear(&mut self, level: Gray) {
        self.data.fill(level.get_byte_value());
    }

    /// Complements every byte; its own inverse
    pub fn invert(&mut self) {
        for byte in self.data.iter_mut() {
            *byte = !*byte;
        }
    }

    /// Rewrites the 2-bit field of one segment, leaving the three other
    /// pixels in the touched byte untouched.
    ///
    /// The new byte value is copied to all five tile offsets. Indices
    /// outside the segment table are ignored.
    pub fn set_segment(&mut self, index: usize, level: Gray) {
        if index >= SEGMENT_COUNT {
            return;
        }
        let pos = SEGMENT_POSITIONS[index] as usize;
        // sub-field 0 is the high pixel pair
        let shift = (3 - (pos % 4)) * 2;
        let base = pos / 4;
        let byte = (self.data[base] & !(0b11 << shift)) | (level.get_bit_value() << shift);
        for copy in 0..TILE_COPIES {
            self.data[base + copy * TILE_STRIDE] = byte;
        }
    }

    /// Applies [`set_segment`](Frame::set_segment) for every set bit 0..=21
    /// of the mask, in ascending index order
    pub fn draw_segments(&mut self, segments: u32, level: Gray) {
        for index in 0..SEGMENT_COUNT {
            if segments.get_bit(index) {
                self.set_segment(index, level);
            }
        }
    }

    /// The full packed buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The slice actually streamed to the controller per pass
    pub(crate) fn visible(&self) -> &[u8] {
        &self.data[..FRAME_BYTES]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec::Vec;

    #[test]
    fn clear_fills_every_byte() {
        let mut frame = Frame::new();
        for level in [Gray::White, Gray::LightGray, Gray::DarkGray, Gray::Black] {
            frame.clear(level);
            assert_eq!(frame.data()[0], level.get_byte_value());
            assert_eq!(frame.data()[BUFFER_SIZE - 1], level.get_byte_value());
            assert!(frame.data().iter().all(|&b| b == level.get_byte_value()));
        }
    }

    #[test]
    fn invert_is_an_involution() {
        let mut frame = Frame::new();
        frame.draw_segments(0b1010_1010_1010_1010_1010_10, Gray::DarkGray);
        let before: Vec<u8> = frame.data().to_vec();
        frame.invert();
        assert_ne!(frame.data(), before.as_slice());
        frame.invert();
        assert_eq!(frame.data(), before.as_slice());
    }

    #[test]
    fn set_segment_touches_only_its_field_and_replicas() {
        let mut frame = Frame::new();
        // segment 0 sits at pixel 113: byte 28, sub-field 1
        frame.set_segment(0, Gray::Black);
        for copy in 0..TILE_COPIES {
            assert_eq!(frame.data()[28 + copy * TILE_STRIDE], 0xCF);
        }
        assert_eq!(frame.data()[27], 0xFF);
        assert_eq!(frame.data()[29], 0xFF);

        // other pixels of the byte survive a second write
        frame.set_segment(0, Gray::LightGray);
        assert_eq!(frame.data()[28], 0xCF | (0b10 << 4));
    }

    #[test]
    fn draw_segments_applies_set_bits_only() {
        let mut frame = Frame::new();
        frame.draw_segments(0b101, Gray::Black);
        // segment 0 (pixel 113, byte 28) and segment 2 (pixel 97, byte 24) set
        assert_eq!(frame.data()[28], 0xCF);
        assert_eq!(frame.data()[24], 0xCF);
        // segment 1 (pixel 105, byte 26) untouched
        assert_eq!(frame.data()[26], 0xFF);
    }

    #[test]
    fn draw_segments_ignores_bits_beyond_the_table() {
        let mut frame = Frame::new();
        frame.draw_segments(0xFFC0_0000, Gray::Black);
        assert!(frame.data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn out_of_range_segment_is_a_no_op() {
        let mut frame = Frame::new();
        frame.set_segment(SEGMENT_COUNT, Gray::Black);
        assert!(frame.data().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn visible_slice_is_one_frame() {
        let frame = Frame::new();
        assert_eq!(frame.visible().len(), 300);
    }
}
