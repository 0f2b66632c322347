use anyhow::Result;
use std::path::PathBuf;
use thermal_roi::{args_parser, cli::parse_drag, opt, Point};

pub struct Args {
    pub config: Option<PathBuf>,
    pub regions: Option<PathBuf>,
    pub slot: Option<String>,
    pub drags: Vec<(Point, Point)>,
    pub clear: bool,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-regions")
            .setting(clap::AppSettings::AllowLeadingHyphen)
            .about("Edit the stored regions and print them as JSON.")
            .arg(
                opt!("config")
                    .short("c")
                    .help("Config file (default: $THERMAL_CONFIG, if set)"),
            )
            .arg(opt!("regions").short("r").help("Region file to edit"))
            .arg(
                opt!("slot")
                    .short("s")
                    .help("Slot key the drags apply to (default: the configured default slot)"),
            )
            .arg(
                opt!("drag")
                    .short("d")
                    .multiple(true)
                    .number_of_values(1)
                    .help("Drag from X0,Y0 to X1,Y1: center and a point on the circle"),
            )
            .arg(
                opt!("clear")
                    .takes_value(false)
                    .help("Remove every region before applying drags"),
            )
            .get_matches();

        let drags = matches
            .values_of("drag")
            .into_iter()
            .flatten()
            .map(parse_drag)
            .collect::<Result<Vec<_>>>()?;

        Ok(Args {
            config: matches.value_of("config").map(PathBuf::from),
            regions: matches.value_of("regions").map(PathBuf::from),
            slot: matches.value_of("slot").map(String::from),
            drags,
            clear: matches.is_present("clear"),
        })
    }
}
