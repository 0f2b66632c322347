//! Decode raw dual-plane frames.
//!
//! The camera delivers a single YUYV frame of `2 * H` rows
//! holding two vertically stacked images of equal height:
//!
//! - the upper half carries the raw sensor readings, with
//!   the low byte in channel 0 and the high byte in
//!   channel 1 of every pixel;
//! - the lower half is the camera's own visual rendering.
//!
//! The bottom of each half is padded by a blanking band
//! whose height depends on the firmware and sensor mode. The
//! band starts at the first thermal row whose high bytes are
//! all zero; [`decode`] locates it afresh on every frame and
//! trims the same rows from both halves.

use ndarray::{s, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{Error, Result};

/// Bytes per pixel of a YUYV frame.
pub const CHANNELS: usize = 2;

/// Frame width of the supported sensor.
pub const DEFAULT_WIDTH: usize = 256;

/// Total frame height (both halves) of the supported sensor.
pub const DEFAULT_HEIGHT: usize = 392;

/// A raw frame as delivered by the capture layer, indexed
/// as `(row, column, channel)`.
#[derive(Debug, Clone)]
pub struct RawFrame {
    data: Array3<u8>,
}

impl RawFrame {
    pub fn from_array(data: Array3<u8>) -> Self {
        RawFrame { data }
    }

    /// Wraps a packed row-major buffer of `width x height`
    /// pixels. The channel depth is inferred from the buffer
    /// length and validated by [`decode`].
    pub fn from_bytes(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self> {
        let pixels = width * height;
        if pixels == 0 || bytes.len() % pixels != 0 {
            return Err(Error::MalformedFrame(format!(
                "{} bytes is not a whole number of channels for {}x{} pixels",
                bytes.len(),
                width,
                height
            )));
        }
        let channels = bytes.len() / pixels;
        let data = Array3::from_shape_vec((height, width, channels), bytes)
            .map_err(|e| Error::MalformedFrame(e.to_string()))?;
        Ok(RawFrame { data })
    }

    /// `(rows, columns, channels)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }
}

/// Raw sensor readings with the blanking band removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalPlane {
    data: Array3<u8>,
}

impl ThermalPlane {
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        check_channels(data.dim().2)?;
        Ok(ThermalPlane { data })
    }

    /// A plane where every pixel holds the same reading.
    pub fn uniform(rows: usize, cols: usize, y: u8, u: u8) -> Self {
        let data = Array3::from_shape_fn((rows, cols, CHANNELS), |(_, _, c)| {
            if c == 0 {
                y
            } else {
                u
            }
        });
        ThermalPlane { data }
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols, _) = self.data.dim();
        (rows, cols)
    }

    /// `(Y, U)` pair at a pixel.
    pub fn pixel(&self, row: usize, col: usize) -> (u8, u8) {
        (self.data[(row, col, 0)], self.data[(row, col, 1)])
    }

    /// Channel 0: low byte of the readings.
    pub fn low_bytes(&self) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(2), 0)
    }

    /// Channel 1: high byte of the readings.
    pub fn high_bytes(&self) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(2), 1)
    }
}

/// The visual half of a frame, trimmed to the thermal plane's
/// height. Pixels are YUYV pairs: `(Y0, U)` on even columns
/// and `(Y1, V)` on odd ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingPlane {
    data: Array3<u8>,
}

impl ImagingPlane {
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        check_channels(data.dim().2)?;
        Ok(ImagingPlane { data })
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols, _) = self.data.dim();
        (rows, cols)
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }
}

/// Split a raw frame into its thermal and imaging planes,
/// dropping the blanking band from both.
///
/// Fails with [`Error::MalformedFrame`] if the channel depth
/// is not 2, the height is odd, or no blanking row can be
/// located in the thermal half.
pub fn decode(raw: &RawFrame) -> Result<(ThermalPlane, ImagingPlane)> {
    let (rows, _, channels) = raw.dim();
    check_channels(channels)?;
    if rows == 0 || rows % 2 != 0 {
        return Err(Error::MalformedFrame(format!(
            "expected an even, non-zero number of rows, got {}",
            rows
        )));
    }

    let half = rows / 2;
    let view = raw.view();
    let thermal = view.slice(s![..half, .., ..]);
    let imaging = view.slice(s![half.., .., ..]);

    let cutoff = invalid_row_boundary(thermal.index_axis(Axis(2), 1)).ok_or_else(|| {
        Error::MalformedFrame("no blanking row found in the thermal half".into())
    })?;
    if cutoff == 0 {
        return Err(Error::MalformedFrame(
            "blanking band starts at the first row".into(),
        ));
    }

    Ok((
        ThermalPlane {
            data: thermal.slice(s![..cutoff, .., ..]).to_owned(),
        },
        ImagingPlane {
            data: imaging.slice(s![..cutoff, .., ..]).to_owned(),
        },
    ))
}

/// Index of the first row whose values are all zero.
pub fn invalid_row_boundary(high_bytes: ArrayView2<'_, u8>) -> Option<usize> {
    high_bytes
        .outer_iter()
        .position(|row| row.iter().all(|&v| v == 0))
}

fn check_channels(channels: usize) -> Result<()> {
    if channels != CHANNELS {
        return Err(Error::MalformedFrame(format!(
            "expected {} channels per pixel, got {}",
            CHANNELS, channels
        )));
    }
    Ok(())
}
