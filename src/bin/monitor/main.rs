mod gui;

use std::{error::Error, process::ExitCode, sync::Arc};

use clap::Parser;
use tracker_validation::{
    args::MonitorArgs,
    collector::{Collector, SourceContext},
    config::TrackerConfig,
    gui::screen_resolution,
    position_store::PositionStore,
};

use gui::engage_gui;

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = MonitorArgs::parse();

    let mut tracker_config = TrackerConfig::default();
    if let Some(address) = args.tracker.address {
        tracker_config.address = address;
    }
    if let Some(port) = args.tracker.port {
        tracker_config.port = port;
    }

    let resolution = screen_resolution()?;
    let gaze = Arc::new(PositionStore::new());
    let pointer = Arc::new(PositionStore::new());
    let context = SourceContext {
        resolution,
        pointer: Arc::clone(&pointer),
    };

    let mut collector = Collector::create(args.system, &tracker_config, context, gaze.clone())?;
    collector.run();

    let res = engage_gui(gaze, pointer, resolution);

    collector.stop()?;
    res
}
