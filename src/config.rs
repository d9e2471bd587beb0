//! Run configuration: the grid, the targets, the tracker and where the data
//! goes.
//!
//! A [`ValidatorConfig`] can be written out and read back as
//! [RON](https://github.com/ron-rs/ron), for example:
//!
//! ```text
//! (
//!     cols: 5,
//!     rows: 3,
//!     repeats: 2,
//!     padding: 0,
//!     target_size: 6,
//!     target_style: crosshairbullseye,
//!     placement: middle,
//!     tracker_label: "Test project",
//!     tracker: mouse,
//!     subject: "Test user",
//!     data_store: Some(file),
//!     output_file: Some("results.csv"),
//!     preview: false,
//!     tracker_config: (address: "127.0.0.1", port: 4242),
//! )
//! ```
//!
//! Every string tag (tracker, target type, placement, sink) is mapped to its
//! variant once, here, and anything unrecognised is a [`ConfigError`]. Tags
//! are written the same way on the command line, in files and in the printed
//! summary.

use crate::collector::TrackerKind;
use crate::recorder::SinkKind;

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Connection details for a tracker. Not every tracker uses them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Host name or IP address of the tracker server
    pub address: String,
    /// TCP port of the tracker server
    pub port: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_owned(),
            port: 4242,
        }
    }
}

impl fmt::Display for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// What a fixation target looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStyle {
    /// A filled circle
    #[serde(alias = "Circle")]
    Circle,
    /// A large circle with a crosshair through it and a small circle in the
    /// middle, the most stable fixation target in the literature.
    #[serde(alias = "CrosshairBullseye")]
    CrosshairBullseye,
}

impl FromStr for TargetStyle {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "circle" => Ok(Self::Circle),
            "crosshairbullseye" => Ok(Self::CrosshairBullseye),
            _ => Err(ConfigError::UnknownTargetType(s.to_owned())),
        }
    }
}

impl fmt::Display for TargetStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circle => write!(f, "circle"),
            Self::CrosshairBullseye => write!(f, "crosshairbullseye"),
        }
    }
}

/// Where in each grid cell the target goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// In the middle of each of the `cols * rows` cells
    #[serde(alias = "Middle")]
    Middle,
    /// On each of the `(cols + 1) * (rows + 1)` cell corners
    #[serde(alias = "Corners", alias = "corner")]
    Corners,
}

impl FromStr for Placement {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "middle" => Ok(Self::Middle),
            "corners" | "corner" => Ok(Self::Corners),
            _ => Err(ConfigError::UnknownPlacement(s.to_owned())),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Middle => write!(f, "middle"),
            Self::Corners => write!(f, "corners"),
        }
    }
}

/// Everything needed to set up one validation run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Number of grid columns
    pub cols: u32,
    /// Number of grid rows
    pub rows: u32,
    /// How many hits each cell needs
    pub repeats: u32,
    /// Pixels left free around the edge of the screen
    pub padding: u32,
    /// Target diameter, in pixels
    pub target_size: u32,
    /// Target shape
    pub target_style: TargetStyle,
    /// Targets in the middle or on the corners of cells
    pub placement: Placement,
    /// Free-form label for this run, e.g. the tracker settings under test
    pub tracker_label: String,
    /// The tracker under test
    pub tracker: TrackerKind,
    /// Identifier of the person doing the test
    pub subject: String,
    /// Kind of data store; a file when `output_file` is set and the console
    /// otherwise
    pub data_store: Option<SinkKind>,
    /// The file for the file data store
    pub output_file: Option<PathBuf>,
    /// Only display every target at once, don't run the test
    pub preview: bool,
    /// Tracker connection details
    pub tracker_config: TrackerConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            cols: 5,
            rows: 3,
            repeats: 2,
            padding: 0,
            target_size: 6,
            target_style: TargetStyle::CrosshairBullseye,
            placement: Placement::Middle,
            tracker_label: "Test project".to_owned(),
            tracker: TrackerKind::Mouse,
            subject: "Test user".to_owned(),
            data_store: None,
            output_file: None,
            preview: false,
            tracker_config: TrackerConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Read a configuration from a RON file. Fields left out of the file take
    /// their default values.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_ron(&text)
    }

    /// Parse a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        ron::de::from_str(text).map_err(ConfigError::Ron)
    }

    /// The data store to record into.
    pub fn sink_kind(&self) -> SinkKind {
        match (self.data_store, &self.output_file) {
            (Some(kind), _) => kind,
            (None, Some(_)) => SinkKind::File,
            (None, None) => SinkKind::Console,
        }
    }

    /// Check the values that can be checked without knowing the screen size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyGrid {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if self.repeats == 0 {
            return Err(ConfigError::ZeroRepeats);
        }
        if self.target_size == 0 {
            return Err(ConfigError::ZeroTargetSize);
        }
        Ok(())
    }
}

impl fmt::Display for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = match &self.output_file {
            Some(path) => Cow::from(path.display().to_string()),
            None => Cow::from("<console>"),
        };
        writeln!(f, "Validator configuration:")?;
        writeln!(f, "  cols = {}", self.cols)?;
        writeln!(f, "  rows = {}", self.rows)?;
        writeln!(f, "  repeats = {}", self.repeats)?;
        writeln!(f, "  padding = {}", self.padding)?;
        writeln!(f, "  targsize = {}", self.target_size)?;
        writeln!(f, "  targtype = {}", self.target_style)?;
        writeln!(f, "  targlocation = {}", self.placement)?;
        writeln!(f, "  trackerlabel = {}", self.tracker_label)?;
        writeln!(f, "  tracker = {}", self.tracker)?;
        writeln!(f, "  trackerConfig = {}", self.tracker_config)?;
        writeln!(f, "  subject = {}", self.subject)?;
        writeln!(f, "  datastore = {}", self.sink_kind())?;
        writeln!(f, "  outputFile = {}", output)?;
        write!(f, "  preview = {}", self.preview)
    }
}

/// Anything wrong with the configuration. These are all reported before a
/// run starts.
#[derive(Debug)]
pub enum ConfigError {
    /// Tracker name that doesn't match any known tracker
    UnknownTracker(String),
    /// Target type that doesn't match any known target
    UnknownTargetType(String),
    /// Placement that is neither middle nor corners
    UnknownPlacement(String),
    /// Data sink type that doesn't match any known sink
    UnknownSink(String),
    /// The grid has no cells
    EmptyGrid {
        /// Requested columns
        cols: u32,
        /// Requested rows
        rows: u32,
    },
    /// Cells would never need testing
    ZeroRepeats,
    /// Targets would be invisible and impossible to hit
    ZeroTargetSize,
    /// The padding leaves no room on screen for the grid
    PaddingTooLarge {
        /// Requested padding
        padding: u32,
        /// Screen size
        resolution: (u32, u32),
    },
    /// More cells than there are pixels to split between them
    GridTooDense {
        /// Requested columns
        cols: u32,
        /// Requested rows
        rows: u32,
        /// Screen size less the padding
        area: (u32, u32),
    },
    /// Reading the configuration file failed
    Io(std::io::Error),
    /// The configuration file isn't valid RON
    Ron(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::UnknownTracker(t) => Cow::from(format!("unknown tracker: \"{t}\"")),
            CE::UnknownTargetType(t) => Cow::from(format!("unknown fixation target type: \"{t}\"")),
            CE::UnknownPlacement(p) => Cow::from(format!("unknown target location: \"{p}\"")),
            CE::UnknownSink(s) => Cow::from(format!("unknown data store type: \"{s}\"")),
            CE::EmptyGrid { cols, rows } => {
                Cow::from(format!("grid of {cols}x{rows} has no cells"))
            }
            CE::ZeroRepeats => Cow::from("repeats must be at least 1"),
            CE::ZeroTargetSize => Cow::from("target size must be at least 1 pixel"),
            CE::PaddingTooLarge {
                padding,
                resolution: (w, h),
            } => Cow::from(format!("padding of {padding} leaves no room on a {w}x{h} screen")),
            CE::GridTooDense {
                cols,
                rows,
                area: (w, h),
            } => Cow::from(format!("a {cols}x{rows} grid doesn't fit in {w}x{h}")),
            CE::Io(error) => Cow::from(format!("io error: {error}")),
            CE::Ron(error) => Cow::from(format!("ron error: {error}")),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}
