//! Collection of gaze (or cursor) samples on a background thread.
//!
//! A [`Collector`] owns one [`SampleSource`], the device-specific part, and
//! runs it in a loop on its own thread, writing every sample into a shared
//! [`PositionStore`]. The collector is either idle or running:
//!
//! - [`Collector::run`] starts the thread. If it is already running, nothing
//!   happens.
//! - [`Collector::stop`] tells the thread to finish and waits for it. Once it
//!   returns, the store will not be written again. If the collector is idle,
//!   nothing happens.
//!
//! Errors the source marks as transient (a single garbled packet, say) are
//! logged and sampling carries on. Any other error is logged, ends the
//! thread, and comes back out of the next `stop()`.

use crate::config::{ConfigError, TrackerConfig};
use crate::cursor_source::CursorSource;
use crate::gazepoint::GazepointSource;
use crate::position::Position;
use crate::position_store::PositionStore;
use crate::simulated_source::SimulatedSource;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt, io,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// One reading from a device. Single-stream devices report the same position
/// for both sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Right eye (or the only) position
    pub right: Position,
    /// Left eye (or the only) position
    pub left: Position,
    /// Sequence number or timestamp from the device, zero if it has none
    pub sequence: f64,
}

impl Sample {
    /// A sample from a device with only one stream.
    pub fn single(pos: Position, sequence: f64) -> Self {
        Self {
            right: pos,
            left: pos,
            sequence,
        }
    }
}

/// The device-specific half of a collector.
pub trait SampleSource: Send {
    /// Human-readable name of the device, used to label recorded data.
    fn name(&self) -> &str;

    /// How long to sleep between calls to [`SampleSource::next_sample`].
    /// Sources that block on I/O themselves return `None`.
    ///
    /// Sources that block must wake up at least every few hundred
    /// milliseconds, otherwise [`Collector::stop`] has to wait for them.
    fn poll_interval(&self) -> Option<Duration>;

    /// Produce the next sample, or `None` if there was nothing new.
    fn next_sample(&mut self) -> Result<Option<Sample>, CollectorError>;
}

/// Things the sources may need from the rest of the program.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Screen size in pixels, for sources that report fractions of it
    pub resolution: (u32, u32),
    /// The live pointer position, kept up to date by the user interface
    pub pointer: Arc<PositionStore>,
}

/// The trackers this program knows how to collect from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    /// The pointer itself, as a stand-in for a gaze tracker
    #[serde(alias = "dummy", alias = "Mouse")]
    Mouse,
    /// Gazepoint GP3, over the Open Gaze API
    #[serde(rename = "gp3", alias = "GP3", alias = "GazepointGp3")]
    GazepointGp3,
    /// Synthetic binocular gaze with jitter and blinks
    #[serde(alias = "Simulated")]
    Simulated,
}

impl TrackerKind {
    /// Open the source for this tracker. Connection problems are reported
    /// here, before any thread has started.
    pub fn connect(
        &self,
        config: &TrackerConfig,
        context: SourceContext,
    ) -> Result<Box<dyn SampleSource>, CollectorError> {
        Ok(match self {
            Self::Mouse => Box::new(CursorSource::new(context.pointer)),
            Self::GazepointGp3 => Box::new(GazepointSource::connect(config, context.resolution)?),
            Self::Simulated => Box::new(
                SimulatedSource::builder()
                    .resolution(context.resolution)
                    .build(),
            ),
        })
    }

    /// Whether this tracker reports the eyes separately.
    pub fn is_binocular(&self) -> bool {
        match self {
            Self::Mouse => false,
            Self::GazepointGp3 | Self::Simulated => true,
        }
    }
}

impl FromStr for TrackerKind {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mouse" | "dummy" => Ok(Self::Mouse),
            "GP3" | "gp3" => Ok(Self::GazepointGp3),
            "simulated" => Ok(Self::Simulated),
            _ => Err(ConfigError::UnknownTracker(s.to_owned())),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mouse => write!(f, "mouse"),
            Self::GazepointGp3 => write!(f, "gp3"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// What the sampling thread hands back when it finishes: the source, so the
/// collector can be started again, and how the loop ended.
type LoopExit = (Box<dyn SampleSource>, Result<(), CollectorError>);

/// Runs a [`SampleSource`] on a background thread, feeding a
/// [`PositionStore`].
pub struct Collector {
    name: String,
    store: Arc<PositionStore>,
    running: Arc<AtomicBool>,
    source: Option<Box<dyn SampleSource>>,
    handle: Option<JoinHandle<LoopExit>>,
}

impl Collector {
    /// A collector in the idle state that will write samples from `source`
    /// into `store`.
    pub fn new(source: Box<dyn SampleSource>, store: Arc<PositionStore>) -> Self {
        Self {
            name: source.name().to_owned(),
            store,
            running: Arc::new(AtomicBool::new(false)),
            source: Some(source),
            handle: None,
        }
    }

    /// Connect to the given tracker and build an idle collector for it.
    pub fn create(
        kind: TrackerKind,
        config: &TrackerConfig,
        context: SourceContext,
        store: Arc<PositionStore>,
    ) -> Result<Self, CollectorError> {
        Ok(Self::new(kind.connect(config, context)?, store))
    }

    /// Name of the tracker being collected from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is the sampling thread running?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start sampling on a background thread. Does nothing if already
    /// running.
    pub fn run(&mut self) {
        if self.is_running() {
            return;
        }

        // a thread that ended on its own is still waiting to be joined
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.reap(handle) {
                warn!("{} : previous collection ended with: {e}", self.name);
            }
        }

        let Some(source) = self.source.take() else {
            error!("{} : source was lost, cannot restart collection", self.name);
            return;
        };

        self.running.store(true, Ordering::Release);
        let store = Arc::clone(&self.store);
        let running = Arc::clone(&self.running);
        self.handle = Some(thread::spawn(move || sample_loop(source, store, running)));
    }

    /// Stop sampling and wait for the background thread to finish, however
    /// long that takes. Does nothing if idle.
    ///
    /// Returns the error that ended the thread, if there was one.
    pub fn stop(&mut self) -> Result<(), CollectorError> {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => self.reap(handle),
            None => Ok(()),
        }
    }

    /// Like [`Collector::stop`], but give up waiting after `timeout`.
    ///
    /// On timeout the thread has still been told to stop and a later `stop()`
    /// will wait for it again.
    pub fn stop_timeout(&mut self, timeout: Duration) -> Result<(), CollectorError> {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                self.handle = Some(handle);
                return Err(CollectorError::StopTimedOut(timeout));
            }
            spin_sleep::sleep(Duration::from_millis(5));
        }
        self.reap(handle)
    }

    fn reap(&mut self, handle: JoinHandle<LoopExit>) -> Result<(), CollectorError> {
        match handle.join() {
            Ok((source, result)) => {
                self.source = Some(source);
                result
            }
            Err(_) => Err(CollectorError::Panicked(self.name.clone())),
        }
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// How long a dropped collector waits for its thread before leaving it
/// behind. Call [`Collector::stop`] first to wait for as long as it takes.
const DROP_STOP_TIMEOUT: Duration = Duration::from_secs(1);

impl Drop for Collector {
    fn drop(&mut self) {
        match self.stop_timeout(DROP_STOP_TIMEOUT) {
            Ok(()) => {}
            Err(CollectorError::StopTimedOut(_)) => {
                warn!("{} : collection thread did not stop, leaving it behind", self.name)
            }
            Err(e) => error!("{} : {e}", self.name),
        }
    }
}

fn sample_loop(
    mut source: Box<dyn SampleSource>,
    store: Arc<PositionStore>,
    running: Arc<AtomicBool>,
) -> LoopExit {
    let name = source.name().to_owned();
    let interval = source.poll_interval();
    info!("{name} : collection started.");

    let mut result = Ok(());
    while running.load(Ordering::Acquire) {
        match source.next_sample() {
            Ok(Some(sample)) => store.set_right_left(sample.right, sample.left, sample.sequence),
            Ok(None) => {}
            Err(e) if e.is_transient() => warn!("{name} : skipping sample : {e}"),
            Err(e) => {
                error!("{name} : collection failed : {e}");
                result = Err(e);
                break;
            }
        }

        if let Some(interval) = interval {
            spin_sleep::sleep(interval);
        }
    }

    running.store(false, Ordering::Release);
    info!("{name} : collection stopped.");
    (source, result)
}

/// Something went wrong talking to a tracker.
#[derive(Debug)]
pub enum CollectorError {
    /// The tracker could not be reached
    Connect {
        /// Tracker name
        tracker: String,
        /// Where we tried to connect
        address: String,
        /// Why it failed
        source: io::Error,
    },
    /// Reading from or writing to the tracker failed
    Io(io::Error),
    /// A single sample could not be understood; sampling continues
    Malformed(String),
    /// The tracker closed the connection
    Disconnected(String),
    /// The sampling thread panicked
    Panicked(String),
    /// The sampling thread did not stop in time
    StopTimedOut(Duration),
}

impl CollectorError {
    /// Transient errors only spoil one sample; everything else ends
    /// collection.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CollectorError as CE;
        let msg = match self {
            CE::Connect {
                tracker,
                address,
                source,
            } => Cow::from(format!("could not connect to {tracker} at {address}: {source}")),
            CE::Io(error) => Cow::from(format!("io error: {error}")),
            CE::Malformed(msg) => Cow::from(format!("malformed sample: {msg}")),
            CE::Disconnected(tracker) => Cow::from(format!("{tracker} closed the connection")),
            CE::Panicked(tracker) => Cow::from(format!("{tracker} collection thread panicked")),
            CE::StopTimedOut(timeout) => {
                Cow::from(format!("collection did not stop within {timeout:?}"))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for CollectorError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
