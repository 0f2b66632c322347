//! Helpers to parse CLI arguments and read frame dumps in
//! the accompanying binaries.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
pub use clap::{App, Arg};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;

use crate::{frame::CHANNELS, region::Point, RawFrame};

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );
    bar
}

/// Reads a dump of back-to-back raw frames of
/// `width x height` pixels.
pub fn read_raw_frames(path: &Path, width: usize, height: usize) -> Result<Vec<RawFrame>> {
    let bytes =
        fs::read(path).with_context(|| format!("could not read frame dump {}", path.display()))?;
    split_raw_frames(&bytes, width, height)
        .with_context(|| format!("invalid frame dump {}", path.display()))
}

pub fn split_raw_frames(bytes: &[u8], width: usize, height: usize) -> Result<Vec<RawFrame>> {
    let frame_len = width * height * CHANNELS;
    ensure!(frame_len > 0, "frame dimensions must be positive");
    ensure!(
        !bytes.is_empty() && bytes.len() % frame_len == 0,
        "{} bytes is not a whole number of {}x{} frames",
        bytes.len(),
        width,
        height
    );
    bytes
        .chunks_exact(frame_len)
        .map(|chunk| -> Result<RawFrame> {
            Ok(RawFrame::from_bytes(width, height, chunk.to_vec())?)
        })
        .collect()
}

/// Expands directories to the files they contain, sorted by
/// name. Other paths are kept as given.
pub fn expand_paths(paths: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut expanded = vec![];
    for path in paths.into_iter().map(PathBuf::from) {
        if path.is_dir() {
            let mut files = fs::read_dir(&path)
                .with_context(|| format!("could not list {}", path.display()))?
                .map(|entry| Ok(entry?.path()))
                .collect::<Result<Vec<_>>>()?;
            files.retain(|p| p.is_file());
            files.sort();
            expanded.extend(files);
        } else {
            expanded.push(path);
        }
    }
    Ok(expanded)
}

/// Parses `X0,Y0,X1,Y1`.
pub fn parse_drag(value: &str) -> Result<(Point, Point)> {
    let coords = value
        .split(',')
        .map(|c| {
            c.trim()
                .parse::<i32>()
                .with_context(|| format!("invalid coordinate `{}`", c))
        })
        .collect::<Result<Vec<_>>>()?;
    match coords[..] {
        [x0, y0, x1, y1] => Ok((Point::new(x0, y0), Point::new(x1, y1))),
        _ => bail!("expected X0,Y0,X1,Y1, got `{}`", value),
    }
}
