//! The per-frame processing cycle.
//!
//! Every cycle decodes a raw frame, refreshes the region
//! temperatures and produces a [`StatusReport`]. Frames are
//! handed from the capture side through a [`FrameMailbox`]
//! holding at most one pending frame: when capture outpaces
//! processing the older frame is dropped, never queued.

use std::{
    collections::BTreeMap,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    aggregate::Reading,
    error::Result,
    frame::{decode, ImagingPlane, RawFrame},
    region::{Refresh, Region, RegionStore},
    status::StatusReport,
    temperature::CalibrationProfile,
};

/// Outcome of one processed frame.
#[derive(Debug)]
pub struct CycleReport {
    pub readings: BTreeMap<String, Reading>,
    pub status: StatusReport,
    /// Regions as refreshed by this cycle.
    pub regions: BTreeMap<String, Region>,
    /// `(rows, columns)` of the decoded thermal plane.
    pub thermal_shape: (usize, usize),
    pub imaging: ImagingPlane,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub processed: u64,
    pub malformed: u64,
}

#[derive(Debug)]
pub struct ThermalMonitor {
    store: Arc<RegionStore>,
    profile: CalibrationProfile,
    last_shape: Option<(usize, usize)>,
    stats: CycleStats,
}

impl ThermalMonitor {
    pub fn new(store: Arc<RegionStore>, profile: CalibrationProfile) -> Self {
        ThermalMonitor {
            store,
            profile,
            last_shape: None,
            stats: CycleStats::default(),
        }
    }

    pub fn store(&self) -> &Arc<RegionStore> {
        &self.store
    }

    pub fn profile(&self) -> CalibrationProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        log::info!("calibration profile set to {}", profile);
        self.profile = profile;
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Runs one cycle. A malformed frame is dropped and leaves
    /// every region untouched.
    pub fn process(&mut self, raw: &RawFrame) -> Result<CycleReport> {
        let (thermal, imaging) = decode(raw).map_err(|e| {
            self.stats.malformed += 1;
            log::warn!("dropping frame: {}", e);
            e
        })?;

        let shape = thermal.shape();
        if self.last_shape != Some(shape) {
            log::info!("thermal plane is {}x{}", shape.1, shape.0);
            self.last_shape = Some(shape);
        }

        let Refresh { readings, regions } = self.store.refresh(&thermal, &self.profile);
        let status = StatusReport::from_regions(&regions);
        self.stats.processed += 1;
        log::debug!(
            "cycle {}: {} region(s)",
            self.stats.processed,
            readings.len()
        );

        Ok(CycleReport {
            readings,
            status,
            regions,
            thermal_shape: shape,
            imaging,
        })
    }

    /// Processes frames from `mailbox` until it is closed and
    /// drained, calling `on_cycle` after every successful
    /// cycle.
    pub fn run<F>(&mut self, mailbox: &FrameMailbox, mut on_cycle: F) -> CycleStats
    where
        F: FnMut(&CycleReport),
    {
        loop {
            match mailbox.take(Duration::from_millis(500)) {
                Some(frame) => {
                    if let Ok(report) = self.process(&frame) {
                        on_cycle(&report);
                    }
                }
                None if mailbox.is_drained() => break,
                None => (),
            }
        }
        self.stats
    }
}

#[derive(Debug, Default)]
struct MailboxState {
    frame: Option<RawFrame>,
    dropped: u64,
    closed: bool,
}

/// Single-slot, latest-wins hand-off of raw frames.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    state: Mutex<MailboxState>,
    ready: Condvar,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands over a frame, replacing any frame not yet taken.
    /// Returns `true` if a pending frame was dropped.
    pub fn offer(&self, frame: RawFrame) -> bool {
        let mut state = self.lock();
        let dropped = state.frame.replace(frame).is_some();
        if dropped {
            state.dropped += 1;
            log::debug!("processing behind capture, dropped a frame");
        }
        self.ready.notify_one();
        dropped
    }

    /// Waits up to `timeout` for a frame. Returns `None` on
    /// timeout, or once closed and empty.
    pub fn take(&self, timeout: Duration) -> Option<RawFrame> {
        let guard = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |s| s.frame.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.frame.take()
    }

    /// No more frames will be offered; wakes any waiting
    /// consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Closed with no frame left to take.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.closed && state.frame.is_none()
    }

    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{
        error::Error,
        region::{Point, DEFAULT_SLOT},
        test_util::synthetic_frame,
    };

    fn monitor() -> ThermalMonitor {
        let store = Arc::new(RegionStore::in_memory(DEFAULT_SLOT));
        ThermalMonitor::new(store, CalibrationProfile::TEFLON)
    }

    #[test]
    fn cycle_reports_region_temperatures() -> anyhow::Result<()> {
        let mut monitor = monitor();
        let _ = monitor.store().set_region("1", Point::new(60, 40), 10);
        let _ = monitor.store().set_region("2", Point::new(200, 150), 12);

        let report = monitor.process(&synthetic_frame(256, 196, 192, (100, 140)))?;
        assert_eq!(report.thermal_shape, (192, 256));
        assert_eq!(report.imaging.shape(), (192, 256));

        let expected = CalibrationProfile::TEFLON.temperature(100, 140);
        for slot in ["1", "2"].iter() {
            assert!((report.readings[*slot].temperature() - expected).abs() < 1e-9);
            assert_eq!(report.status.0[*slot].temperature, 3419.0);
        }
        assert_eq!(monitor.store().snapshot()["1"].temperature, expected);
        assert_eq!(monitor.stats().processed, 1);
        Ok(())
    }

    #[test]
    fn malformed_frame_leaves_regions_untouched() -> anyhow::Result<()> {
        let mut monitor = monitor();
        let _ = monitor.store().set_region("1", Point::new(60, 40), 10);
        monitor.process(&synthetic_frame(256, 196, 192, (100, 140)))?;
        let before = monitor.store().snapshot();

        let result = monitor.process(&synthetic_frame(256, 196, 196, (0, 0)));
        assert!(matches!(result, Err(Error::MalformedFrame(_))));
        assert_eq!(monitor.store().snapshot(), before);
        assert_eq!(
            monitor.stats(),
            CycleStats {
                processed: 1,
                malformed: 1
            }
        );
        Ok(())
    }

    #[test]
    fn follows_blanking_band_changes() -> anyhow::Result<()> {
        let mut monitor = monitor();
        let _ = monitor.store().set_region("1", Point::new(60, 150), 10);

        let tall = monitor.process(&synthetic_frame(256, 196, 192, (100, 140)))?;
        assert!(!tall.readings["1"].is_empty());

        let short = monitor.process(&synthetic_frame(256, 196, 100, (100, 140)))?;
        assert_eq!(short.thermal_shape, (100, 256));
        assert!(short.readings["1"].is_empty());
        assert_eq!(short.status.0["1"].temperature, 0.);
        Ok(())
    }

    #[test]
    fn profile_swap_changes_only_calibration() -> anyhow::Result<()> {
        let mut monitor = monitor();
        let _ = monitor.store().set_region("1", Point::new(60, 40), 10);
        monitor.set_profile(CalibrationProfile::STAINLESS);
        let report = monitor.process(&synthetic_frame(64, 60, 50, (100, 140)))?;
        let expected = CalibrationProfile::STAINLESS.temperature(100, 140);
        assert!((report.readings["1"].temperature() - expected).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn status_matches_readings_under_concurrent_edits() -> anyhow::Result<()> {
        let mut monitor = monitor();
        let store = Arc::clone(monitor.store());
        let editor = thread::spawn(move || {
            for step in 0..200 {
                if step % 7 == 0 {
                    store.clear_all();
                }
                let slot = (step % 4 + 1).to_string();
                let _ = store.set_region(&slot, Point::new(10 + step % 20, 12), 6 + step as u32 % 5);
            }
        });

        let frame = synthetic_frame(64, 30, 24, (100, 140));
        for _ in 0..100 {
            let report = monitor.process(&frame)?;
            assert_eq!(
                report.readings.keys().collect::<Vec<_>>(),
                report.status.0.keys().collect::<Vec<_>>()
            );
            for (slot, reading) in report.readings.iter() {
                assert_eq!(
                    report.status.0[slot].temperature,
                    crate::status::round_to_tenth(reading.temperature())
                );
            }
        }
        editor.join().expect("editor panicked");
        Ok(())
    }

    #[test]
    fn mailbox_keeps_latest_frame() {
        let mailbox = FrameMailbox::new();
        assert!(!mailbox.offer(synthetic_frame(8, 4, 2, (1, 1))));
        assert!(mailbox.offer(synthetic_frame(8, 4, 3, (1, 1))));
        assert_eq!(mailbox.dropped(), 1);

        let frame = mailbox.take(Duration::from_millis(10)).expect("pending frame");
        let (thermal, _) = decode(&frame).expect("valid frame");
        assert_eq!(thermal.shape(), (3, 8));
        assert!(mailbox.take(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn run_drains_until_closed() {
        let mailbox = Arc::new(FrameMailbox::new());
        let producer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                for _ in 0..5 {
                    mailbox.offer(synthetic_frame(32, 20, 16, (100, 140)));
                    thread::sleep(Duration::from_millis(5));
                }
                mailbox.offer(synthetic_frame(32, 20, 20, (100, 140)));
                mailbox.close();
            })
        };

        let mut monitor = monitor();
        let _ = monitor.store().set_region("1", Point::new(10, 8), 6);
        let mut cycles = 0;
        let stats = monitor.run(&mailbox, |report| {
            assert_eq!(report.thermal_shape, (16, 32));
            cycles += 1;
        });
        producer.join().expect("producer panicked");

        assert_eq!(stats.processed, cycles);
        assert_eq!(
            stats.processed + stats.malformed + mailbox.dropped(),
            6
        );
    }
}
