//! Mean temperature of each region over a thermal plane.

use std::{collections::BTreeMap, sync::Arc};

use ndarray::Zip;
use rayon::prelude::*;

use crate::{
    frame::ThermalPlane,
    mask::{MaskCache, RegionMask},
    region::Region,
    temperature::CalibrationProfile,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Mean { temperature: f64, pixels: usize },
    /// The region's mask selects no pixel of the plane.
    EmptyRegion,
}

impl Reading {
    /// The mean temperature, or `0.0` for an empty region.
    pub fn temperature(&self) -> f64 {
        match self {
            Reading::Mean { temperature, .. } => *temperature,
            Reading::EmptyRegion => 0.,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Reading::EmptyRegion)
    }
}

/// Computes the mean calibrated temperature of every region,
/// keyed by slot.
///
/// Masks come from (and are stored into) `masks`. Regions are
/// reduced in parallel, but each region's sum runs in a fixed
/// order, so results are bit-reproducible.
pub fn aggregate<'a, I>(
    plane: &ThermalPlane,
    regions: I,
    masks: &mut MaskCache,
    profile: &CalibrationProfile,
) -> BTreeMap<String, Reading>
where
    I: IntoIterator<Item = &'a Region>,
{
    let shape = plane.shape();
    let jobs: Vec<(&Region, Arc<RegionMask>)> = regions
        .into_iter()
        .map(|region| (region, masks.mask_for(region, shape)))
        .collect();

    let readings: Vec<_> = jobs
        .par_iter()
        .map(|(region, mask)| (region, mean_temperature(plane, mask, profile)))
        .collect();

    readings
        .into_iter()
        .map(|(region, reading)| {
            if reading.is_empty() {
                log::warn!(
                    "region {} at ({}, {}) radius {} covers no pixels of the {}x{} plane",
                    region.slot,
                    region.center.x,
                    region.center.y,
                    region.radius,
                    shape.1,
                    shape.0
                );
            }
            (region.slot.clone(), reading)
        })
        .collect()
}

/// Mean temperature of the pixels selected by `mask`.
pub fn mean_temperature(
    plane: &ThermalPlane,
    mask: &RegionMask,
    profile: &CalibrationProfile,
) -> Reading {
    if mask.dim() != plane.shape() {
        log::warn!(
            "mask shape {:?} does not match plane shape {:?}",
            mask.dim(),
            plane.shape()
        );
        return Reading::EmptyRegion;
    }

    let temperature = profile.temperature_transform();
    let mut sum = 0.;
    let mut pixels = 0usize;
    Zip::from(mask)
        .and(plane.low_bytes())
        .and(plane.high_bytes())
        .for_each(|&selected, &y, &u| {
            if selected {
                sum += temperature(y, u);
                pixels += 1;
            }
        });

    if pixels == 0 {
        Reading::EmptyRegion
    } else {
        Reading::Mean {
            temperature: sum / pixels as f64,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::{mask::circle_mask, region::Point};

    fn regions(list: &[(&str, i32, i32, u32)]) -> Vec<Region> {
        list.iter()
            .map(|&(slot, x, y, r)| Region::new(slot, Point::new(x, y), r))
            .collect()
    }

    #[test]
    fn uniform_plane_matches_pixel_temperature() {
        let plane = ThermalPlane::uniform(192, 256, 100, 140);
        for profile in [CalibrationProfile::TEFLON, CalibrationProfile::STAINLESS].iter() {
            let expected = profile.temperature(100, 140);
            let mut masks = MaskCache::new();
            let regions = regions(&[("1", 10, 10, 10), ("2", 128, 96, 10), ("3", 245, 181, 10)]);
            let readings = aggregate(&plane, &regions, &mut masks, profile);
            assert_eq!(readings.len(), 3);
            for reading in readings.values() {
                match reading {
                    Reading::Mean { temperature, pixels } => {
                        assert_eq!(*pixels, 317);
                        assert!((temperature - expected).abs() < 1e-9);
                    }
                    Reading::EmptyRegion => panic!("unexpected empty region"),
                }
            }
        }
    }

    #[test]
    fn matches_direct_average_on_gradient() -> anyhow::Result<()> {
        let data = Array3::from_shape_fn((40, 60, 2), |(row, col, c)| {
            if c == 0 {
                (row * 3 + col) as u8
            } else {
                (col / 4) as u8 + 1
            }
        });
        let plane = ThermalPlane::from_array(data)?;
        let profile = CalibrationProfile::STAINLESS;
        let mask = circle_mask(Point::new(25, 18), 9, plane.shape());

        let mut sum = 0.;
        let mut n = 0;
        for row in 0..40 {
            for col in 0..60 {
                if mask[(row, col)] {
                    let (y, u) = plane.pixel(row, col);
                    sum += profile.temperature(y, u);
                    n += 1;
                }
            }
        }
        let reading = mean_temperature(&plane, &mask, &profile);
        assert!((reading.temperature() - sum / n as f64).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn region_outside_plane_is_empty() {
        let plane = ThermalPlane::uniform(50, 50, 100, 140);
        let mut masks = MaskCache::new();
        let regions = regions(&[("1", 200, 200, 10), ("2", 25, 25, 10)]);
        let readings = aggregate(&plane, &regions, &mut masks, &CalibrationProfile::TEFLON);
        assert_eq!(readings["1"], Reading::EmptyRegion);
        assert_eq!(readings["1"].temperature(), 0.);
        assert!(!readings["2"].is_empty());
    }

    #[test]
    fn mismatched_mask_is_empty() {
        let plane = ThermalPlane::uniform(50, 50, 100, 140);
        let mask = circle_mask(Point::new(10, 10), 8, (40, 50));
        assert!(mean_temperature(&plane, &mask, &CalibrationProfile::TEFLON).is_empty());
    }

    #[test]
    fn results_are_reproducible() -> anyhow::Result<()> {
        let data = Array3::from_shape_fn((120, 160, 2), |(row, col, c)| {
            ((row * 7 + col * 13 + c * 5) % 251) as u8
        });
        let plane = ThermalPlane::from_array(data)?;
        let regions = regions(&[("1", 40, 40, 30), ("2", 100, 60, 25), ("3", 150, 110, 40)]);
        let profile = CalibrationProfile::STAINLESS;

        let first = aggregate(&plane, &regions, &mut MaskCache::new(), &profile);
        let second = aggregate(&plane, &regions, &mut MaskCache::new(), &profile);
        for (slot, reading) in first.iter() {
            assert_eq!(
                reading.temperature().to_bits(),
                second[slot].temperature().to_bits()
            );
        }
        Ok(())
    }
}
