//! Synthetic frames for tests.

use ndarray::Array3;

use crate::frame::{RawFrame, CHANNELS};

/// A raw frame of `2 * half_rows` rows whose thermal half
/// holds `reading` on rows before `boundary` and zero high
/// bytes from `boundary` on. The imaging half holds a
/// position-dependent pattern.
pub fn synthetic_frame(
    width: usize,
    half_rows: usize,
    boundary: usize,
    (y, u): (u8, u8),
) -> RawFrame {
    let data = Array3::from_shape_fn((2 * half_rows, width, CHANNELS), |(row, col, c)| {
        if row < half_rows {
            match (row < boundary, c) {
                (true, 0) => y,
                (true, _) => u,
                (false, 0) => y,
                (false, _) => 0,
            }
        } else {
            ((row * 31 + col * 7 + c) % 256) as u8
        }
    });
    RawFrame::from_array(data)
}
