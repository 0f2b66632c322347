//! Region outlines drawn over the imaging plane.
//!
//! The imaging plane is converted from YUYV to RGB as is;
//! colour mapping is left to the presentation layer. Every
//! region is labelled with its last temperature, and while a
//! drag is in progress the slot it will land in is shown in
//! the top left corner.

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};
use itertools::iproduct;

use crate::{
    frame::ImagingPlane,
    mask::squared_len,
    region::{Point, Region},
    status::round_to_tenth,
};

pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const PREVIEW_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Glyph pixels are drawn as `LABEL_SCALE` squares.
pub const LABEL_SCALE: u32 = 2;

/// The circle being dragged and the slot it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPreview {
    pub center: Point,
    pub radius: u32,
    pub slot: String,
}

/// Renders the imaging plane with an outline and a
/// temperature label for every region and, while a drag is
/// in progress, the circle being dragged.
pub fn compose_overlay(
    imaging: &ImagingPlane,
    regions: &BTreeMap<String, Region>,
    preview: Option<&DragPreview>,
) -> RgbImage {
    let mut image = yuyv_to_rgb(imaging);
    for region in regions.values() {
        draw_circle(&mut image, region.center, region.radius, 2, REGION_COLOR);
        let label = format!("{:.1}C", round_to_tenth(region.temperature));
        draw_text_centered(&mut image, region.center, &label, LABEL_SCALE, LABEL_COLOR);
    }
    if let Some(preview) = preview {
        draw_circle(&mut image, preview.center, preview.radius, 1, PREVIEW_COLOR);
        let label = format!("ACTIVE SLOT: {}", preview.slot);
        draw_text(&mut image, Point::new(4, 4), &label, LABEL_SCALE, LABEL_COLOR);
    }
    image
}

/// BT.601 conversion of a YUYV plane. Each pair of columns
/// shares the chroma of the pair.
pub fn yuyv_to_rgb(imaging: &ImagingPlane) -> RgbImage {
    let (rows, cols) = imaging.shape();
    let data = imaging.view();
    let mut image = RgbImage::new(cols as u32, rows as u32);

    for (row, col) in iproduct!(0..rows, 0..cols) {
        let pair = col - col % 2;
        let y = data[(row, col, 0)];
        let u = data[(row, pair, 1)];
        let v = if pair + 1 < cols {
            data[(row, pair + 1, 1)]
        } else {
            128
        };
        image.put_pixel(col as u32, row as u32, yuv_to_rgb(y, u, v));
    }
    image
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let c = f32::from(y) - 16.;
    let d = f32::from(u) - 128.;
    let e = f32::from(v) - 128.;
    let clamp = |x: f32| x.round().max(0.).min(255.) as u8;
    Rgb([
        clamp(1.164 * c + 1.596 * e),
        clamp(1.164 * c - 0.392 * d - 0.813 * e),
        clamp(1.164 * c + 2.017 * d),
    ])
}

/// Outline of `thickness` pixels just inside the circle,
/// clipped to the image.
pub fn draw_circle(image: &mut RgbImage, center: Point, radius: u32, thickness: u32, color: Rgb<u8>) {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let (cx, cy, r) = (i64::from(center.x), i64::from(center.y), i64::from(radius));
    let inner = r - i64::from(thickness);
    let (outer2, inner2) = (squared_len(r, 0), squared_len(inner.max(0), 0));

    let rows = (cy - r).max(0)..(cy + r + 1).min(height);
    let cols = (cx - r).max(0)..(cx + r + 1).min(width);
    for (y, x) in iproduct!(rows, cols) {
        let d2 = squared_len(x - cx, y - cy);
        if d2 <= outer2 && (inner < 0 || d2 > inner2) {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

const GLYPH_WIDTH: i64 = 3;
const GLYPH_HEIGHT: i64 = 5;

/// Width and height in pixels of `text` drawn at `scale`.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    let advance = (GLYPH_WIDTH as u32 + 1) * scale;
    (
        (chars * advance).saturating_sub(scale),
        GLYPH_HEIGHT as u32 * scale,
    )
}

pub fn draw_text_centered(image: &mut RgbImage, center: Point, text: &str, scale: u32, color: Rgb<u8>) {
    let (w, h) = text_size(text, scale);
    let origin = Point::new(
        center.x.saturating_sub((w / 2) as i32),
        center.y.saturating_sub((h / 2) as i32),
    );
    draw_text(image, origin, text, scale, color);
}

/// Draws `text` with a 3x5 bitmap font, top left corner at
/// `origin`, clipped to the image. Characters without a glyph
/// are left blank.
pub fn draw_text(image: &mut RgbImage, origin: Point, text: &str, scale: u32, color: Rgb<u8>) {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let s = i64::from(scale);
    let mut x0 = i64::from(origin.x);
    let y0 = i64::from(origin.y);

    for c in text.chars() {
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let (px, py) = (x0 + col * s, y0 + row as i64 * s);
                for (y, x) in iproduct!(py.max(0)..(py + s).min(height), px.max(0)..(px + s).min(width)) {
                    image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
        x0 += (GLYPH_WIDTH + 1) * s;
    }
}

// Rows of three bits, most significant bit leftmost.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        '-' => [0x0, 0x0, 0x7, 0x0, 0x0],
        ':' => [0x0, 0x2, 0x0, 0x2, 0x0],
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'C' => [0x7, 0x4, 0x4, 0x4, 0x7],
        'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
        'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
        'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
        'O' => [0x7, 0x5, 0x5, 0x5, 0x7],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
        'V' => [0x5, 0x5, 0x5, 0x5, 0x2],
        _ => [0; 5],
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn gray_plane(rows: usize, cols: usize, luma: u8) -> ImagingPlane {
        let data = Array3::from_shape_fn((rows, cols, 2), |(_, _, c)| if c == 0 { luma } else { 128 });
        ImagingPlane::from_array(data).expect("two channels")
    }

    fn count(image: &RgbImage, color: Rgb<u8>, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> usize {
        iproduct!(y, x)
            .filter(|&(y, x)| *image.get_pixel(x, y) == color)
            .count()
    }

    #[test]
    fn neutral_chroma_is_gray() {
        let image = yuyv_to_rgb(&gray_plane(4, 6, 126));
        assert_eq!(image.dimensions(), (6, 4));
        let Rgb([r, g, b]) = *image.get_pixel(3, 2);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 128);
    }

    #[test]
    fn draws_regions_and_preview() {
        let mut regions = BTreeMap::new();
        regions.insert("1".to_string(), Region::new("1", Point::new(20, 20), 10));
        let preview = DragPreview {
            center: Point::new(60, 30),
            radius: 8,
            slot: "2".into(),
        };
        let image = compose_overlay(&gray_plane(60, 80, 16), &regions, Some(&preview));

        assert_eq!(*image.get_pixel(20, 30), REGION_COLOR);
        assert_eq!(*image.get_pixel(68, 30), PREVIEW_COLOR);
        assert_eq!(*image.get_pixel(60, 30), BLACK);
    }

    #[test]
    fn regions_are_labelled_with_temperature() {
        let mut region = Region::new("1", Point::new(40, 30), 25);
        region.temperature = 41.26;
        let mut regions = BTreeMap::new();
        regions.insert("1".to_string(), region);

        let plane = gray_plane(60, 80, 16);
        let bare = compose_overlay(&plane, &BTreeMap::new(), None);
        assert_eq!(count(&bare, LABEL_COLOR, 0..80, 0..60), 0);

        let image = compose_overlay(&plane, &regions, None);
        // "41.3C" is 38x10 pixels centered on the region
        let (w, h) = text_size("41.3C", LABEL_SCALE);
        assert_eq!((w, h), (38, 10));
        assert!(count(&image, LABEL_COLOR, 21..59, 25..35) > 0);
        assert_eq!(count(&image, LABEL_COLOR, 0..80, 0..25), 0);
        // leading stroke of the "4" glyph
        assert_eq!(*image.get_pixel(21, 25), LABEL_COLOR);
    }

    #[test]
    fn preview_shows_active_slot() {
        let plane = gray_plane(60, 80, 16);
        let preview = DragPreview {
            center: Point::new(60, 45),
            radius: 8,
            slot: "3".into(),
        };
        let idle = compose_overlay(&plane, &BTreeMap::new(), None);
        assert_eq!(count(&idle, LABEL_COLOR, 0..80, 4..14), 0);

        let dragging = compose_overlay(&plane, &BTreeMap::new(), Some(&preview));
        assert!(count(&dragging, LABEL_COLOR, 0..80, 4..14) > 0);
        // top bar of the "A"
        assert_eq!(*dragging.get_pixel(6, 4), LABEL_COLOR);
    }

    #[test]
    fn text_is_clipped() {
        let mut image = RgbImage::new(4, 4);
        draw_text(&mut image, Point::new(0, 0), "1", 1, LABEL_COLOR);
        assert_eq!(*image.get_pixel(1, 0), LABEL_COLOR);
        assert_eq!(*image.get_pixel(0, 0), BLACK);
        draw_text(&mut image, Point::new(-100, 2), "888", 3, LABEL_COLOR);
        draw_text(&mut image, Point::new(i32::MAX - 1, 0), "8", 3, LABEL_COLOR);
    }

    #[test]
    fn circles_are_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_circle(&mut image, Point::new(-5, 3), 8, 2, REGION_COLOR);
        draw_circle(&mut image, Point::new(500, 500), 8, 2, REGION_COLOR);
        assert_eq!(*image.get_pixel(2, 3), REGION_COLOR);
        assert_eq!(*image.get_pixel(0, 3), BLACK);
    }

    #[test]
    fn huge_circle_does_not_overflow() {
        let mut image = RgbImage::new(10, 10);
        draw_circle(&mut image, Point::new(5, 5), u32::MAX, 2, REGION_COLOR);
        assert_eq!(count(&image, REGION_COLOR, 0..10, 0..10), 0);

        // ring passing through the image
        draw_circle(&mut image, Point::new(i32::MIN, 5), 2_147_483_653, 2, REGION_COLOR);
        assert!(count(&image, REGION_COLOR, 0..10, 0..10) > 0);
    }
}
