//! Functions to compute temperature from raw sensor values.
//!
//! The sensor reports every thermal pixel as a `(Y, U)` byte
//! pair holding the low and high byte of a 16-bit reading,
//! `raw = 256 * U + Y`. A [`CalibrationProfile`] maps the raw
//! reading linearly to degrees celsius:
//!
//! ```text
//! temperature = raw / scale - offset
//! ```
//!
//! Different sensor tip materials (and the sensor's low / high
//! gain ranges) only differ in the `(scale, offset)` pair, so
//! swapping profiles never touches the callers.

use std::{fmt, str::FromStr};

use serde_derive::*;

use crate::error::{Error, Result};

/// Linear mapping from raw sensor readings to temperature.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProfile {
    pub scale: f64,
    pub offset: f64,
}

impl CalibrationProfile {
    /// PTFE coated tips.
    pub const TEFLON: Self = CalibrationProfile {
        scale: 10.0,
        offset: 175.0,
    };

    /// Bare stainless steel tips.
    pub const STAINLESS: Self = CalibrationProfile {
        scale: 9.8,
        offset: 160.0,
    };

    // (256 * (U - 17) + Y) / 25, rewritten in scale / offset form.
    pub const LOW_RANGE: Self = CalibrationProfile {
        scale: 25.0,
        offset: 174.08,
    };

    pub const NAMES: [&'static str; 3] = ["teflon", "stainless", "low-range"];

    pub fn new(scale: f64, offset: f64) -> Result<Self> {
        if !scale.is_finite() || scale <= 0. {
            return Err(Error::InvalidProfile(format!(
                "scale must be finite and positive, got {}",
                scale
            )));
        }
        if !offset.is_finite() {
            return Err(Error::InvalidProfile(format!(
                "offset must be finite, got {}",
                offset
            )));
        }
        Ok(CalibrationProfile { scale, offset })
    }

    /// Look up one of the built-in profiles by name.
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "teflon" => Some(Self::TEFLON),
            "stainless" => Some(Self::STAINLESS),
            "low-range" => Some(Self::LOW_RANGE),
            _ => None,
        }
    }

    #[inline]
    pub fn temperature(&self, y: u8, u: u8) -> f64 {
        raw_value(y, u) as f64 / self.scale - self.offset
    }

    /// Returns a closure computing temperatures with this
    /// profile, for use in tight per-pixel loops.
    pub fn temperature_transform(&self) -> impl Fn(u8, u8) -> f64 {
        let CalibrationProfile { scale, offset } = *self;
        move |y, u| raw_value(y, u) as f64 / scale - offset
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::TEFLON
    }
}

impl fmt::Display for CalibrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scale, self.offset)
    }
}

/// Parses either a profile name (see
/// [`NAMES`][CalibrationProfile::NAMES]) or a custom
/// `"<scale>/<offset>"` pair.
impl FromStr for CalibrationProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(profile) = Self::named(s) {
            return Ok(profile);
        }
        let (scale, offset) = serde_helpers::parse_scale_offset(s).ok_or_else(|| {
            Error::InvalidProfile(format!(
                "expected one of {:?} or `<scale>/<offset>`, got `{}`",
                Self::NAMES,
                s
            ))
        })?;
        Self::new(scale, offset)
    }
}

/// Raw 16-bit sensor reading of a `(Y, U)` pixel pair.
///
/// Widened before the multiply: `256 * U` reaches 65280 and
/// must not wrap in the 8-bit channel type.
#[inline]
pub fn raw_value(y: u8, u: u8) -> i32 {
    256 * i32::from(u) + i32::from(y)
}

#[inline]
pub fn temperature(y: u8, u: u8, profile: &CalibrationProfile) -> f64 {
    profile.temperature(y, u)
}

pub(crate) mod serde_helpers {
    use lazy_static::lazy_static;
    use regex::Regex;
    use serde::*;
    use serde_derive::Deserialize;

    use super::CalibrationProfile;

    pub fn parse_scale_offset(s: &str) -> Option<(f64, f64)> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^\s*([-+]?\d*\.?\d+)\s*/\s*([-+]?\d*\.?\d+)\s*$").unwrap();
        }
        let caps = RE.captures(s)?;
        Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
    }

    /// Accepts a profile name, a `"<scale>/<offset>"`
    /// string, or a `{ "scale": .., "offset": .. }` object.
    pub fn profile_name<'de, D>(de: D) -> Result<Option<CalibrationProfile>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Spec {
            Text(String),
            Pair { scale: f64, offset: f64 },
        }

        use serde::de::Error;
        let profile = match Option::<Spec>::deserialize(de)? {
            None => return Ok(None),
            Some(Spec::Text(s)) => s.parse(),
            Some(Spec::Pair { scale, offset }) => CalibrationProfile::new(scale, offset),
        };
        profile.map(Some).map_err(Error::custom)
    }
}
