//! Buffered CSV output of committed measurements.
//!
//! Rows are kept in memory while a run is in progress and only written out on
//! [`Recorder::flush`], or when the recorder is dropped. Flushing an empty
//! buffer does nothing, so flushing twice is harmless.
//!
//! The first row is a header:
//!
//! ```text
//! "Label","Subject","Tracker","Timestamp","Target-ID","Target-X","Target-Y","Cursor-X","Cursor-Y","Actual-X","Actual-Y"
//! ```
//!
//! For binocular trackers `"Right-X","Right-Y","Left-X","Left-Y"` follow.

use crate::config::ConfigError;
use crate::position::Position;
use crate::position_store::Snapshot;

use chrono::{DateTime, Local};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt::{self, Write as _},
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BANNER_TOP: &str = "========= data output - copy/paste into notepad =========";
const BANNER_BOTTOM: &str = "=========================================================";

/// Where measurements end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Standard output, wrapped in a banner so it can be copied out
    #[serde(alias = "cout")]
    Console,
    /// Appended to a file
    File,
}

impl FromStr for SinkKind {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cout" | "console" => Ok(Self::Console),
            "file" => Ok(Self::File),
            _ => Err(ConfigError::UnknownSink(s.to_owned())),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::File => write!(f, "file"),
        }
    }
}

/// The fields that are the same on every row of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLabels {
    pub label: String,
    pub tracker_name: String,
    pub subject: String,
    /// Add per-eye columns
    pub binocular: bool,
}

/// One committed measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRecord {
    pub timestamp: DateTime<Local>,
    pub target_index: usize,
    pub target: Position,
    pub cursor: Position,
    /// Best single gaze estimate
    pub gaze: Position,
    pub gaze_right: Position,
    pub gaze_left: Position,
}

impl TrialRecord {
    /// A record of the given snapshot, stamped with the current local time.
    pub fn from_snapshot(target_index: usize, snapshot: &Snapshot) -> Self {
        Self {
            timestamp: Local::now(),
            target_index,
            target: snapshot.target,
            cursor: snapshot.cursor,
            gaze: snapshot.gaze,
            gaze_right: snapshot.gaze_right,
            gaze_left: snapshot.gaze_left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Console,
    File(PathBuf),
    Writer,
}

/// Collects measurement rows and writes them to a sink.
pub struct Recorder {
    labels: RunLabels,
    destination: Destination,
    out: Box<dyn Write + Send>,
    buffer: String,
    /// Bytes of `buffer` already handed to `out`
    written: usize,
}

impl Recorder {
    /// A recorder that prints to standard output.
    pub fn console(labels: RunLabels) -> Self {
        Self::new(labels, Destination::Console, Box::new(io::stdout()), true)
    }

    /// A recorder that appends to the file at `path`, creating it if needed.
    /// The header is only written if the file is empty.
    pub fn file(labels: RunLabels, path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        let open_error = |source: io::Error| RecorderError::Open {
            path: path.to_owned(),
            source,
        };

        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;
        let empty = file.metadata().map_err(open_error)?.len() == 0;

        Ok(Self::new(
            labels,
            Destination::File(path.to_owned()),
            Box::new(file),
            empty,
        ))
    }

    /// A recorder writing to any writer, header first.
    pub fn to_writer(labels: RunLabels, out: Box<dyn Write + Send>) -> Self {
        Self::new(labels, Destination::Writer, out, true)
    }

    /// A recorder of the given kind. File sinks need a path.
    pub fn create(
        kind: SinkKind,
        labels: RunLabels,
        path: Option<&Path>,
    ) -> Result<Self, RecorderError> {
        match kind {
            SinkKind::Console => Ok(Self::console(labels)),
            SinkKind::File => match path {
                Some(path) => Self::file(labels, path),
                None => Err(RecorderError::MissingPath),
            },
        }
    }

    fn new(
        labels: RunLabels,
        destination: Destination,
        out: Box<dyn Write + Send>,
        with_header: bool,
    ) -> Self {
        let mut buffer = String::new();
        if with_header {
            buffer.push_str(&header(labels.binocular));
            buffer.push('\n');
        }
        Self {
            labels,
            destination,
            out,
            buffer,
            written: 0,
        }
    }

    /// Add a row to the buffer. Returns true once the row is buffered.
    pub fn write_row(&mut self, record: &TrialRecord) -> bool {
        let row = format_row(&self.labels, record);
        writeln!(self.buffer, "{row}").is_ok()
    }

    /// Write out everything buffered so far and empty the buffer.
    ///
    /// If writing fails partway, the next flush carries on from the first
    /// byte that didn't make it out.
    pub fn flush(&mut self) -> Result<(), RecorderError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        if self.written == 0 {
            match &self.destination {
                Destination::Console => {
                    writeln!(self.out)?;
                    writeln!(self.out, "{BANNER_TOP}")?;
                }
                Destination::File(path) => info!("Writing data to {}", path.display()),
                Destination::Writer => {}
            }
        }
        self.write_pending()?;
        if self.destination == Destination::Console {
            writeln!(self.out, "{BANNER_BOTTOM}")?;
            writeln!(self.out)?;
        }
        self.out.flush()?;

        self.buffer.clear();
        self.written = 0;
        Ok(())
    }

    fn write_pending(&mut self) -> io::Result<()> {
        while self.written < self.buffer.len() {
            match self.out.write(&self.buffer.as_bytes()[self.written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("labels", &self.labels)
            .field("destination", &self.destination)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!("Lost buffered measurements: {e}");
        }
    }
}

fn header(binocular: bool) -> String {
    let mut columns = vec![
        "Label", "Subject", "Tracker", "Timestamp", "Target-ID", "Target-X", "Target-Y",
        "Cursor-X", "Cursor-Y", "Actual-X", "Actual-Y",
    ];
    if binocular {
        columns.extend(["Right-X", "Right-Y", "Left-X", "Left-Y"]);
    }
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_row(labels: &RunLabels, record: &TrialRecord) -> String {
    let mut row = format!(
        "\"{}\",\"{}\",\"{}\",\"{}\",{},{},{},{},{},{},{}",
        labels.label,
        labels.subject,
        labels.tracker_name,
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.target_index,
        record.target.x,
        record.target.y,
        record.cursor.x,
        record.cursor.y,
        record.gaze.x,
        record.gaze.y,
    );
    if labels.binocular {
        row.push_str(&format!(
            ",{},{},{},{}",
            record.gaze_right.x, record.gaze_right.y, record.gaze_left.x, record.gaze_left.y
        ));
    }
    row
}

/// Failure to set up or write to a measurement sink.
#[derive(Debug)]
pub enum RecorderError {
    /// A file sink was asked for without a file
    MissingPath,
    /// The output file could not be opened
    Open {
        /// The file
        path: PathBuf,
        /// Why it failed
        source: io::Error,
    },
    /// Writing out the buffer failed
    Io(io::Error),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RecorderError as RE;
        let msg = match self {
            RE::MissingPath => Cow::from("no output file given for the file data store"),
            RE::Open { path, source } => {
                Cow::from(format!("could not open file {}: {source}", path.display()))
            }
            RE::Io(error) => Cow::from(format!("io error: {error}")),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for RecorderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Io(error) => Some(error),
            Self::MissingPath => None,
        }
    }
}

impl From<io::Error> for RecorderError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
