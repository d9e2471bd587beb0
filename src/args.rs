// Commandline argument parser using clap for the tracker validator

use crate::collector::TrackerKind;
use crate::config::{ConfigError, Placement, TargetStyle, ValidatorConfig};
use crate::recorder::SinkKind;

use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Show fixation targets on a grid and record where the tracker says the
/// user was looking when they clicked each one
pub struct ValidatorArgs {
    /// RON file to read the configuration from; other flags override it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Split the screen into this many columns
    #[arg(long)]
    pub cols: Option<u32>,

    /// Split the screen into this many rows
    #[arg(long)]
    pub rows: Option<u32>,

    /// Number of times to test each point
    #[arg(long)]
    pub repeats: Option<u32>,

    /// Pixels to leave free around the edge of the screen
    #[arg(long)]
    pub padding: Option<u32>,

    /// Diameter of the target, in pixels
    #[arg(long)]
    pub targsize: Option<u32>,

    /// Type of target, "circle" or "crosshairbullseye"
    #[arg(long)]
    pub targtype: Option<TargetStyle>,

    /// Where targets sit in each cell, "middle" or "corners"
    #[arg(long)]
    pub targlocation: Option<Placement>,

    /// Label for this experiment
    #[arg(long)]
    pub label: Option<String>,

    /// The system under test, "mouse", "GP3" or "simulated"
    #[arg(long)]
    pub system: Option<TrackerKind>,

    /// Identifier of the test subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Where the results go, "cout" or "file"
    #[arg(long)]
    pub datastore: Option<SinkKind>,

    /// Append the results to this file instead of printing them
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub tracker: TrackerArgs,

    /// Show every target at once without testing
    #[arg(long)]
    pub preview: bool,
}

/// Where to find a networked tracker
#[derive(Debug, Args, Clone)]
pub struct TrackerArgs {
    /// Address of the tracker server
    #[arg(long)]
    pub address: Option<String>,

    /// Port of the tracker server
    #[arg(long)]
    pub port: Option<u16>,
}

impl ValidatorArgs {
    /// The configuration file (or the defaults), with every flag given on
    /// the command line applied on top.
    pub fn into_config(self) -> Result<ValidatorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ValidatorConfig::from_path(path)?,
            None => ValidatorConfig::default(),
        };

        macro_rules! apply {
            ($($flag:ident => $field:ident),* $(,)?) => {
                $(if let Some(value) = self.$flag {
                    config.$field = value;
                })*
            };
        }
        apply! {
            cols => cols,
            rows => rows,
            repeats => repeats,
            padding => padding,
            targsize => target_size,
            targtype => target_style,
            targlocation => placement,
            label => tracker_label,
            system => tracker,
            subject => subject,
        }

        if self.datastore.is_some() {
            config.data_store = self.datastore;
        }
        if self.output.is_some() {
            config.output_file = self.output;
        }
        if let Some(address) = self.tracker.address {
            config.tracker_config.address = address;
        }
        if let Some(port) = self.tracker.port {
            config.tracker_config.port = port;
        }
        config.preview |= self.preview;

        Ok(config)
    }
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Chart live gaze data from a tracker
pub struct MonitorArgs {
    /// The tracker to watch, "mouse", "GP3" or "simulated"
    #[arg(long, default_value = "simulated")]
    pub system: TrackerKind,

    #[command(flatten)]
    pub tracker: TrackerArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let args = ValidatorArgs::parse_from(["tracker-validation"]);
        assert_eq!(args.into_config().unwrap(), ValidatorConfig::default());
    }

    #[test]
    fn flags_override() {
        let args = ValidatorArgs::parse_from([
            "tracker-validation",
            "--cols",
            "4",
            "--targtype",
            "circle",
            "--targlocation",
            "corners",
            "--system",
            "GP3",
            "--address",
            "10.0.0.2",
            "--port",
            "5000",
            "-o",
            "out.csv",
            "--preview",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.cols, 4);
        assert_eq!(config.rows, 3);
        assert_eq!(config.target_style, TargetStyle::Circle);
        assert_eq!(config.placement, Placement::Corners);
        assert_eq!(config.tracker, TrackerKind::GazepointGp3);
        assert_eq!(config.tracker_config.address, "10.0.0.2");
        assert_eq!(config.tracker_config.port, 5000);
        assert_eq!(config.output_file, Some(PathBuf::from("out.csv")));
        assert!(config.preview);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(ValidatorArgs::try_parse_from(["tracker-validation", "--system", "eyelink"]).is_err());
        assert!(ValidatorArgs::try_parse_from(["tracker-validation", "--targtype", "square"]).is_err());
        assert!(ValidatorArgs::try_parse_from(["tracker-validation", "--datastore", "database"]).is_err());
    }

    #[test]
    fn datastore_flag() {
        let args = ValidatorArgs::parse_from(["tracker-validation", "--datastore", "file"]);
        let config = args.into_config().unwrap();
        assert_eq!(config.sink_kind(), SinkKind::File);
        assert_eq!(config.output_file, None);

        let args = ValidatorArgs::parse_from(["tracker-validation", "--datastore", "cout"]);
        assert_eq!(args.into_config().unwrap().sink_kind(), SinkKind::Console);
    }

    #[test]
    fn flags_override_the_config_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "(cols: 9, rows: 8, subject: \"P01\")").unwrap();

        let args = ValidatorArgs::parse_from([
            "tracker-validation".into(),
            "--config".into(),
            file.path().as_os_str().to_owned(),
            "--rows".into(),
            "2".into(),
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.cols, 9);
        assert_eq!(config.rows, 2);
        assert_eq!(config.subject, "P01");
    }

    #[test]
    fn monitor_defaults_to_simulated() {
        let args = MonitorArgs::parse_from(["monitor"]);
        assert_eq!(args.system, TrackerKind::Simulated);
    }
}
