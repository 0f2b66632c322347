//! Regions of interest and their durable storage.
//!
//! A [`RegionStore`] owns every region and the mask cache
//! derived from them behind a single reader / writer lock,
//! so a cycle never pairs a stale mask with new geometry.
//! Mutations are written through to a JSON file of the form
//!
//! ```json
//! { "1": { "center": [120, 80], "radius": 14 } }
//! ```
//!
//! The write happens outside the lock, from a copy of the
//! state, via a temporary file that replaces the previous
//! one, so the frame cycle never waits on disk I/O and a
//! failed write never leaves a torn file behind.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde_derive::*;
use tempfile::NamedTempFile;

use crate::{
    aggregate::{aggregate, Reading},
    error::{Error, Result},
    frame::ThermalPlane,
    mask::MaskCache,
    temperature::CalibrationProfile,
};

/// Smallest radius a region may have. Drags shorter than
/// this are clicks.
pub const MIN_RADIUS: u32 = 6;

/// Slot targeted before any other slot has been selected.
pub const DEFAULT_SLOT: &str = "1";

/// Pixel position in thermal plane coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Point { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub slot: String,
    pub center: Point,
    pub radius: u32,
    /// Mean temperature from the last cycle.
    pub temperature: f64,
}

impl Region {
    pub fn new(slot: impl Into<String>, center: Point, radius: u32) -> Self {
        Region {
            slot: slot.into(),
            center,
            radius,
            temperature: 0.,
        }
    }
}

/// Durable form of a region: geometry only.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedRegion {
    pub center: Point,
    pub radius: u32,
}

/// Durable form of a [`RegionStore`], keyed by slot.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct PersistedRegionSet(pub BTreeMap<String, PersistedRegion>);

impl PersistedRegionSet {
    /// Reads the set from a file. Returns `Ok(None)` when the
    /// file does not exist.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let set = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            Error::CorruptPersistence {
                path: path.to_owned(),
                source,
            }
        })?;
        Ok(Some(set))
    }

    /// Replaces the file at `path` with this set. The new
    /// content is written to a temporary file in the same
    /// directory and renamed over the target.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of [`RegionStore::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    pub readings: BTreeMap<String, Reading>,
    /// Every region with its refreshed temperature.
    pub regions: BTreeMap<String, Region>,
}

/// Result of [`RegionStore::set_region`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Applied,
    /// Radius below [`MIN_RADIUS`]; the store is unchanged.
    Rejected,
}

#[derive(Debug, Default)]
struct State {
    regions: BTreeMap<String, Region>,
    masks: MaskCache,
    active_slot: Option<String>,
    generation: u64,
}

impl State {
    fn persisted(&self) -> PersistedRegionSet {
        PersistedRegionSet(
            self.regions
                .iter()
                .map(|(slot, r)| {
                    (
                        slot.clone(),
                        PersistedRegion {
                            center: r.center,
                            radius: r.radius,
                        },
                    )
                })
                .collect(),
        )
    }

    fn replace(&mut self, set: PersistedRegionSet) {
        self.masks.clear();
        self.regions = set
            .0
            .into_iter()
            .filter(|(slot, r)| {
                let valid = r.radius >= MIN_RADIUS;
                if !valid {
                    log::warn!(
                        "skipping stored region {}: radius {} is below {}",
                        slot,
                        r.radius,
                        MIN_RADIUS
                    );
                }
                valid
            })
            .map(|(slot, r)| {
                let region = Region::new(slot.clone(), r.center, r.radius);
                (slot, region)
            })
            .collect();
        self.generation += 1;
    }
}

/// Shared owner of all regions of interest.
///
/// Wrap in an [`Arc`][std::sync::Arc] to share between the
/// frame cycle and the input handlers.
#[derive(Debug)]
pub struct RegionStore {
    path: Option<PathBuf>,
    default_slot: String,
    state: RwLock<State>,
    // generation of the state last written to `path`
    written: Mutex<u64>,
}

impl RegionStore {
    /// A store that is never persisted.
    pub fn in_memory(default_slot: impl Into<String>) -> Self {
        RegionStore {
            path: None,
            default_slot: default_slot.into(),
            state: RwLock::new(State::default()),
            written: Mutex::new(0),
        }
    }

    /// A store persisted at `path`, initialised from its
    /// current content (see [`load`][Self::load]).
    pub fn open(path: impl Into<PathBuf>, default_slot: impl Into<String>) -> Self {
        let store = RegionStore {
            path: Some(path.into()),
            ..Self::in_memory(default_slot)
        };
        store.load();
        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the in-memory regions with the persisted set
    /// and returns how many were loaded. A missing file loads
    /// nothing; an unreadable or corrupt one is logged and
    /// loads nothing.
    pub fn load(&self) -> usize {
        let path = match &self.path {
            Some(path) => path,
            None => return 0,
        };
        let set = match PersistedRegionSet::read_from(path) {
            Ok(Some(set)) => set,
            Ok(None) => {
                log::debug!("no region file at {}", path.display());
                PersistedRegionSet::default()
            }
            Err(e) => {
                log::error!("{}; starting with no regions", e);
                PersistedRegionSet::default()
            }
        };

        let mut state = self.write();
        state.replace(set);
        let count = state.regions.len();
        log::info!("loaded {} region(s) from {}", count, path.display());
        count
    }

    /// Writes the current regions to the backing file.
    pub fn save(&self) -> Result<()> {
        let (generation, set) = {
            let state = self.read();
            (state.generation, state.persisted())
        };
        match &self.path {
            Some(path) => self.write_generation(path, generation, &set),
            None => Ok(()),
        }
    }

    /// Creates or replaces the region at `slot`. Rejects radii
    /// below [`MIN_RADIUS`] without touching the store.
    pub fn set_region(&self, slot: &str, center: Point, radius: u32) -> SetOutcome {
        if radius < MIN_RADIUS {
            log::debug!("rejecting region {} with radius {}", slot, radius);
            return SetOutcome::Rejected;
        }

        let (generation, set) = {
            let mut state = self.write();
            state.masks.invalidate(slot);
            state
                .regions
                .insert(slot.to_owned(), Region::new(slot, center, radius));
            state.active_slot = Some(slot.to_owned());
            state.generation += 1;
            (state.generation, state.persisted())
        };
        log::info!(
            "slot {} set to center ({}, {}) radius {}",
            slot,
            center.x,
            center.y,
            radius
        );

        self.persist(generation, &set);
        SetOutcome::Applied
    }

    /// Removes every region and persists the empty set.
    pub fn clear_all(&self) {
        let (generation, set) = {
            let mut state = self.write();
            state.regions.clear();
            state.masks.clear();
            state.generation += 1;
            (state.generation, state.persisted())
        };
        log::info!("cleared all regions");
        self.persist(generation, &set);
    }

    /// Slot of the most recent successful
    /// [`set_region`][Self::set_region], or the default slot.
    pub fn active_slot(&self) -> String {
        self.read()
            .active_slot
            .clone()
            .unwrap_or_else(|| self.default_slot.clone())
    }

    /// Copy of all regions, ordered by slot.
    pub fn snapshot(&self) -> BTreeMap<String, Region> {
        self.read().regions.clone()
    }

    pub fn persisted(&self) -> PersistedRegionSet {
        self.read().persisted()
    }

    pub fn len(&self) -> usize {
        self.read().regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().regions.is_empty()
    }

    /// Computes the mean temperature of every region on
    /// `plane` and stores it with the region. The returned
    /// regions are taken under the same lock as the readings.
    pub fn refresh(&self, plane: &ThermalPlane, profile: &CalibrationProfile) -> Refresh {
        let mut guard = self.write();
        let state = &mut *guard;
        let readings = aggregate(plane, state.regions.values(), &mut state.masks, profile);
        for (slot, reading) in readings.iter() {
            if let Some(region) = state.regions.get_mut(slot) {
                region.temperature = reading.temperature();
            }
        }
        Refresh {
            readings,
            regions: state.regions.clone(),
        }
    }

    fn persist(&self, generation: u64, set: &PersistedRegionSet) {
        if let Some(path) = &self.path {
            if let Err(e) = self.write_generation(path, generation, set) {
                log::error!("failed to save regions to {}: {}", path.display(), e);
            }
        }
    }

    fn write_generation(&self, path: &Path, generation: u64, set: &PersistedRegionSet) -> Result<()> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written > generation {
            // a newer state is already on disk
            return Ok(());
        }
        set.write_to(path)?;
        *written = generation;
        log::debug!("saved {} region(s) to {}", set.len(), path.display());
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
