use anyhow::Result;
use clap::value_t_or_exit;
use std::path::PathBuf;
use thermal_roi::{arg, args_parser, opt, CalibrationProfile};

pub struct Args {
    pub paths: Vec<String>,
    pub config: Option<PathBuf>,
    pub profile: Option<CalibrationProfile>,
    pub regions: Option<PathBuf>,
    pub overlay_dir: Option<PathBuf>,
    pub realtime_ms: Option<u64>,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-monitor")
            .about("Replay raw frame dumps and report region temperatures, one JSON line per frame.")
            .arg(
                opt!("config")
                    .short("c")
                    .help("Config file (default: $THERMAL_CONFIG, if set)"),
            )
            .arg(
                opt!("profile")
                    .short("p")
                    .help("Calibration profile: teflon, stainless, low-range or SCALE/OFFSET"),
            )
            .arg(opt!("regions").short("r").help("Region file to load and update"))
            .arg(
                opt!("overlay dir")
                    .short("o")
                    .help("Write a PNG with the region outlines for every frame here"),
            )
            .arg(
                opt!("realtime ms")
                    .help("Feed frames at this interval from a capture thread, dropping late ones"),
            )
            .arg(
                arg!("paths")
                    .required(true)
                    .multiple(true)
                    .help("Frame dumps or directories of them"),
            )
            .get_matches();

        let paths = matches
            .values_of("paths")
            .into_iter()
            .flatten()
            .map(|f| f.into())
            .collect();
        let config = matches.value_of("config").map(PathBuf::from);
        let profile = matches
            .value_of("profile")
            .map(str::parse::<CalibrationProfile>)
            .transpose()?;
        let regions = matches.value_of("regions").map(PathBuf::from);
        let overlay_dir = matches.value_of("overlay dir").map(PathBuf::from);
        let realtime_ms = matches
            .is_present("realtime ms")
            .then(|| value_t_or_exit!(matches, "realtime ms", u64));

        Ok(Args {
            paths,
            config,
            profile,
            regions,
            overlay_dir,
            realtime_ms,
        })
    }
}
