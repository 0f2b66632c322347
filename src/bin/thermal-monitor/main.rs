mod args;

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use args::Args;

use thermal_roi::{
    cli::{expand_paths, progress_bar, read_raw_frames},
    config::MonitorConfig,
    overlay::compose_overlay,
    CycleReport, FrameMailbox, RegionStore, ThermalMonitor,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::from_cmd_line()?;

    let mut cfg = MonitorConfig::load(args.config.as_deref())?;
    if let Some(profile) = args.profile {
        cfg.profile = profile;
    }
    if let Some(regions) = args.regions {
        cfg.regions_path = regions;
    }
    if let Some(dir) = &args.overlay_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create overlay dir {}", dir.display()))?;
    }

    let store = Arc::new(RegionStore::open(&cfg.regions_path, cfg.default_slot.clone()));
    log::info!(
        "{} region(s) from {}, profile {}",
        store.len(),
        cfg.regions_path.display(),
        cfg.profile
    );

    let paths = expand_paths(args.paths)?;
    let mut monitor = ThermalMonitor::new(Arc::clone(&store), cfg.profile);
    let mut sink = CycleSink {
        overlay_dir: args.overlay_dir,
        cycles: 0,
    };

    match args.realtime_ms {
        None => replay(&mut monitor, &mut sink, &paths, &cfg)?,
        Some(ms) => replay_realtime(&mut monitor, &mut sink, paths, &cfg, ms)?,
    }

    let stats = monitor.stats();
    eprintln!(
        "Processed {} frames, dropped {} malformed",
        stats.processed, stats.malformed
    );
    Ok(())
}

fn replay(
    monitor: &mut ThermalMonitor,
    sink: &mut CycleSink,
    paths: &[PathBuf],
    cfg: &MonitorConfig,
) -> Result<()> {
    let bar = progress_bar(paths.len() as u64);
    for path in paths {
        for frame in read_raw_frames(path, cfg.frame_width, cfg.frame_height)? {
            if let Ok(report) = monitor.process(&frame) {
                sink.emit(&report)?;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(())
}

/// Frames are offered from a reader thread at a fixed
/// interval; the ones processing cannot keep up with are
/// dropped.
fn replay_realtime(
    monitor: &mut ThermalMonitor,
    sink: &mut CycleSink,
    paths: Vec<PathBuf>,
    cfg: &MonitorConfig,
    interval_ms: u64,
) -> Result<()> {
    let mailbox = Arc::new(FrameMailbox::new());
    let bar = progress_bar(paths.len() as u64);

    let producer = {
        let mailbox = Arc::clone(&mailbox);
        let bar = bar.clone();
        let (width, height) = (cfg.frame_width, cfg.frame_height);
        thread::spawn(move || -> Result<()> {
            let result = paths.iter().try_for_each(|path| -> Result<()> {
                for frame in read_raw_frames(path, width, height)? {
                    mailbox.offer(frame);
                    thread::sleep(Duration::from_millis(interval_ms));
                }
                bar.inc(1);
                Ok(())
            });
            mailbox.close();
            result
        })
    };

    let mut failure = None;
    monitor.run(&mailbox, |report| {
        if failure.is_none() {
            failure = sink.emit(report).err();
        }
    });
    bar.finish_and_clear();

    producer
        .join()
        .map_err(|_| anyhow!("frame reader panicked"))??;
    if let Some(e) = failure {
        return Err(e);
    }
    eprintln!("Dropped {} late frames", mailbox.dropped());
    Ok(())
}

struct CycleSink {
    overlay_dir: Option<PathBuf>,
    cycles: usize,
}

impl CycleSink {
    fn emit(&mut self, report: &CycleReport) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", report.status.to_json()?)?;

        if let Some(dir) = &self.overlay_dir {
            let path = dir.join(format!("frame-{:06}.png", self.cycles));
            compose_overlay(&report.imaging, &report.regions, None)
                .save(&path)
                .with_context(|| format!("could not write overlay {}", path.display()))?;
        }
        self.cycles += 1;
        Ok(())
    }
}
