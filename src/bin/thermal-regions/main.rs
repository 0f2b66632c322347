mod args;

use std::sync::Arc;

use anyhow::Result;
use args::Args;

use thermal_roi::{
    config::MonitorConfig,
    gesture::{GestureTranslator, KeyCommand, SlotSelector},
    RegionStore,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::from_cmd_line()?;

    let mut cfg = MonitorConfig::load(args.config.as_deref())?;
    if let Some(regions) = args.regions {
        cfg.regions_path = regions;
    }

    let store = Arc::new(RegionStore::open(&cfg.regions_path, cfg.default_slot.clone()));
    let selector = Arc::new(SlotSelector::new(cfg.default_slot.clone()));

    if args.clear {
        KeyCommand::ClearAll.apply(&selector, &store);
    }
    if let Some(slot) = &args.slot {
        let mut keys = slot.chars();
        match (keys.next(), keys.next()) {
            (Some(key), None) => match KeyCommand::from_key(key, &cfg.slot_keys) {
                cmd @ KeyCommand::Select(_) => cmd.apply(&selector, &store),
                _ => anyhow::bail!("`{}` is not one of the slot keys `{}`", slot, cfg.slot_keys),
            },
            _ => anyhow::bail!("slot must be a single key, got `{}`", slot),
        }
    }

    let mutated = args.clear || !args.drags.is_empty();
    let translator = GestureTranslator::new(Arc::clone(&store), Arc::clone(&selector));
    for (start, end) in args.drags {
        match translator.on_drag_complete(start, end) {
            Some(update) => log::info!(
                "slot {}: center ({}, {}), radius {}",
                update.slot,
                update.center.x,
                update.center.y,
                update.radius
            ),
            None => log::warn!(
                "drag from ({}, {}) to ({}, {}) is too short, ignored",
                start.x,
                start.y,
                end.x,
                end.y
            ),
        }
    }

    if mutated {
        store.save()?;
    }
    serde_json::to_writer_pretty(std::io::stdout().lock(), &store.persisted())?;
    println!();
    Ok(())
}
