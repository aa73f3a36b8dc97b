//! Command-line driver: runs the AI core against the fake engine for a
//! fixed number of frames and prints a metrics summary. Useful for a quick
//! manual soak test outside of `cargo test`.

use clap::Parser;

use aai_core::config::AaiConfig;
use aai_core::root::AaiRoot;
use aai_headless::scenario::two_side_land_catalog;
use aai_headless::RunMetrics;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless AAI soak-test driver")]
struct Args {
    /// Number of engine frames to simulate.
    #[arg(long, default_value_t = 9000)]
    frames: u32,

    /// Map width in tiles.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Map height in tiles.
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Deterministic PRNG seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let (mut engine, ids) = two_side_land_catalog(args.width, args.height);
    let config = AaiConfig {
        sides: 2,
        start_units: vec!["armcom".into(), "corcom".into()],
        ..AaiConfig::default()
    };

    let mut root = match AaiRoot::init(&engine, config, args.seed) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("failed to initialise AI core: {err}");
            std::process::exit(1);
        }
    };

    if let Some(&com) = ids.get("armcom") {
        let unit = aai_core::types::UnitId(1);
        engine.spawn(unit, com, aai_core::types::Pos3::new(1024.0, 0.0, 1024.0), 0);
        root.unit_created(&engine, unit, com);
        root.unit_finished(unit);
    }

    for frame in 0..args.frames {
        engine.set_frame(frame);
        root.update(&mut engine);
    }

    let metrics = RunMetrics::collect(&engine, args.frames);
    println!("{metrics}");
}
