//! Circular pixel masks for regions, cached per slot.
//!
//! Synthesising a mask touches every pixel of the region's
//! bounding box, which dominates the per-region cost of a
//! cycle. Regions rarely move between frames, so masks are
//! kept until either the region's geometry or the thermal
//! plane's shape changes.

use std::{collections::HashMap, sync::Arc};

use itertools::iproduct;
use ndarray::Array2;

use crate::region::{Point, Region};

/// `true` where a pixel lies inside a region's circle.
pub type RegionMask = Array2<bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MaskKey {
    shape: (usize, usize),
    center: Point,
    radius: u32,
}

impl MaskKey {
    fn of(region: &Region, shape: (usize, usize)) -> Self {
        MaskKey {
            shape,
            center: region.center,
            radius: region.radius,
        }
    }
}

#[derive(Debug, Default)]
pub struct MaskCache {
    entries: HashMap<String, (MaskKey, Arc<RegionMask>)>,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached mask for the region's slot if it was
    /// built for the same shape and geometry, else builds,
    /// caches and returns a fresh one.
    pub fn mask_for(&mut self, region: &Region, shape: (usize, usize)) -> Arc<RegionMask> {
        let key = MaskKey::of(region, shape);
        if let Some((cached, mask)) = self.entries.get(&region.slot) {
            if *cached == key {
                return Arc::clone(mask);
            }
        }

        log::debug!(
            "building mask for slot {} ({}x{})",
            region.slot,
            shape.1,
            shape.0
        );
        let mask = Arc::new(circle_mask(region.center, region.radius, shape));
        self.entries
            .insert(region.slot.clone(), (key, Arc::clone(&mask)));
        mask
    }

    pub fn invalidate(&mut self, slot: &str) {
        self.entries.remove(slot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filled circle of the given shape `(rows, columns)`. Parts
/// of the circle outside the plane are clipped.
pub fn circle_mask(center: Point, radius: u32, shape: (usize, usize)) -> RegionMask {
    let (rows, cols) = shape;
    let mut mask = Array2::from_elem(shape, false);

    let (cx, cy, r) = (center.x as i64, center.y as i64, radius as i64);
    let row_range = clip_range(cy - r, cy + r, rows);
    let col_range = clip_range(cx - r, cx + r, cols);

    let r2 = squared_len(r, 0);
    for (row, col) in iproduct!(row_range, col_range.clone()) {
        if squared_len(col as i64 - cx, row as i64 - cy) <= r2 {
            mask[(row, col)] = true;
        }
    }
    mask
}

/// `dx² + dy²`, widened so any radius or offset between two
/// `i32` / `u32` coordinates squares without overflow.
pub(crate) fn squared_len(dx: i64, dy: i64) -> i128 {
    let (dx, dy) = (i128::from(dx), i128::from(dy));
    dx * dx + dy * dy
}

// Inclusive [lo, hi] clipped to 0..len.
fn clip_range(lo: i64, hi: i64, len: usize) -> std::ops::Range<usize> {
    let start = lo.max(0) as usize;
    let end = if hi < 0 {
        0
    } else {
        ((hi + 1) as usize).min(len)
    };
    start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(slot: &str, x: i32, y: i32, radius: u32) -> Region {
        Region::new(slot, Point::new(x, y), radius)
    }

    fn count(mask: &RegionMask) -> usize {
        mask.iter().filter(|&&v| v).count()
    }

    #[test]
    fn interior_circle_has_lattice_count() {
        let mask = circle_mask(Point::new(30, 30), 10, (60, 80));
        assert_eq!(count(&mask), 317);
        assert!(mask[(30, 30)]);
        assert!(mask[(20, 30)]);
        assert!(!mask[(19, 30)]);
    }

    #[test]
    fn circle_is_clipped_to_plane() {
        let mask = circle_mask(Point::new(0, 0), 10, (50, 50));
        assert_eq!(count(&mask), 90);

        let outside = circle_mask(Point::new(-100, -100), 10, (50, 50));
        assert_eq!(count(&outside), 0);

        let beyond = circle_mask(Point::new(500, 20), 8, (50, 50));
        assert_eq!(count(&beyond), 0);
    }

    #[test]
    fn huge_radius_covers_plane() {
        let mask = circle_mask(Point::new(10, 10), u32::MAX, (20, 20));
        assert_eq!(count(&mask), 400);

        // radius saturated from a drag across the whole i32 range
        let far = circle_mask(Point::new(10, 10), 3_037_000_514, (20, 20));
        assert_eq!(count(&far), 400);

        // about 3.04e9 pixels from the plane's corner
        let distant = circle_mask(Point::new(i32::MIN, i32::MIN), 3_000_000_000, (20, 20));
        assert_eq!(count(&distant), 0);
    }

    #[test]
    fn reuses_mask_for_same_shape() {
        let mut cache = MaskCache::new();
        let r = region("1", 20, 20, 10);
        let first = cache.mask_for(&r, (40, 40));
        let second = cache.mask_for(&r, (40, 40));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rebuilds_mask_on_shape_change() {
        let mut cache = MaskCache::new();
        let r = region("1", 20, 20, 10);
        let first = cache.mask_for(&r, (40, 40));
        let second = cache.mask_for(&r, (38, 40));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.dim(), (38, 40));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rebuilds_mask_on_geometry_change() {
        let mut cache = MaskCache::new();
        let first = cache.mask_for(&region("1", 20, 20, 10), (40, 40));
        let moved = cache.mask_for(&region("1", 21, 20, 10), (40, 40));
        assert!(!Arc::ptr_eq(&first, &moved));
        let grown = cache.mask_for(&region("1", 21, 20, 12), (40, 40));
        assert!(!Arc::ptr_eq(&moved, &grown));
    }

    #[test]
    fn slots_are_cached_independently() {
        let mut cache = MaskCache::new();
        let a = cache.mask_for(&region("1", 10, 10, 6), (40, 40));
        let b = cache.mask_for(&region("2", 30, 30, 6), (40, 40));
        assert!(!Arc::ptr_eq(&a, &b));
        cache.invalidate("1");
        assert_eq!(cache.len(), 1);
        let b2 = cache.mask_for(&region("2", 30, 30, 6), (40, 40));
        assert!(Arc::ptr_eq(&b, &b2));
    }
}
