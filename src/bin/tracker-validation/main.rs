//! Runs one validation: connect to the tracker, show the targets, record the
//! clicks.

use clap::Parser;
use log::info;
use std::{error::Error, io, process::ExitCode, sync::Arc, time::Duration};
use tracker_validation::{
    args::ValidatorArgs,
    collector::{Collector, SourceContext},
    gui::{screen_resolution, TerminalUi},
    position_store::PositionStore,
    recorder::{Recorder, RunLabels},
    session::{run_preview, run_session, SessionEnd},
    validator::Validator,
};

// Example:
// cargo run --bin tracker-validation --
//                            --cols     4
//                            --rows     3
//                            --repeats  2
//                            --system   simulated
//                            --output   results.csv

const STOP_TIMEOUT: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    env_logger::init();
    println!("Tracker Validation v{}", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(()) => {
            println!("Have a nice day :)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", report(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// The message a fatal error is reported with.
fn report(error: &dyn Error) -> String {
    format!("Error: {error}")
}

/// Everything owned here, the recorder included, is dropped before `main`
/// reports, so buffered rows are written out on every path.
fn run() -> Result<(), Box<dyn Error>> {
    let config = ValidatorArgs::parse().into_config()?;
    config.validate()?;
    println!("{config}");

    let resolution = screen_resolution()?;
    let pointer = Arc::new(PositionStore::new());

    if config.preview {
        let labels = RunLabels {
            label: config.tracker_label.clone(),
            tracker_name: config.tracker.to_string(),
            subject: config.subject.clone(),
            binocular: false,
        };
        let recorder = Recorder::to_writer(labels, Box::new(io::sink()));
        let validator = Validator::new(&config, resolution, recorder)?;
        let mut ui = TerminalUi::new()?;
        run_preview(&validator, &mut ui)?;
        return Ok(());
    }

    // connect first, so a missing tracker fails before anything is drawn
    let context = SourceContext {
        resolution,
        pointer: Arc::clone(&pointer),
    };
    let source = config.tracker.connect(&config.tracker_config, context)?;

    let labels = RunLabels {
        label: config.tracker_label.clone(),
        tracker_name: source.name().to_owned(),
        subject: config.subject.clone(),
        binocular: config.tracker.is_binocular(),
    };
    let recorder = Recorder::create(config.sink_kind(), labels, config.output_file.as_deref())?;

    let mut validator = Validator::new(&config, resolution, recorder)?;
    let mut collector = Collector::new(source, Arc::clone(validator.gaze_store()));
    let mut ui = TerminalUi::new()?;

    collector.run();
    let outcome = run_session(&mut validator, &mut ui, &pointer);
    let stopped = collector.stop_timeout(STOP_TIMEOUT);
    drop(ui);

    match outcome? {
        SessionEnd::Completed => info!("All targets tested."),
        SessionEnd::Aborted => info!("Stopped before all targets were tested."),
    }
    stopped?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_validation::{collector::CollectorError, config::ConfigError};

    #[test]
    fn errors_are_reported_with_their_message() {
        let error: Box<dyn Error> = Box::new(CollectorError::Connect {
            tracker: "Gazepoint GP3".to_owned(),
            address: "127.0.0.1:4242".to_owned(),
            source: io::ErrorKind::ConnectionRefused.into(),
        });
        let message = report(error.as_ref());
        assert!(
            message.starts_with("Error: could not connect to Gazepoint GP3 at 127.0.0.1:4242"),
            "{message}"
        );
        assert!(!message.contains("Connect {"), "{message}");

        let error: Box<dyn Error> = Box::new(ConfigError::ZeroRepeats);
        assert_eq!(report(error.as_ref()), "Error: repeats must be at least 1");
    }
}
