//! The Gazepoint GP3 tracker, spoken to over its Open Gaze API.
//!
//! The tracker serves XML-ish records over TCP, one per line, terminated by
//! `\r\n`. After the set-up commands are sent it streams records like:
//!
//! ```text
//! <REC CNT="151747" LPOGX="0.87396" LPOGY="0.02765" LPOGV="1" RPOGX="0.89497" RPOGY="0.77830" RPOGV="1" />
//! ```
//!
//! Gaze coordinates are fractions of the screen. They are sometimes a bit
//! outside `0..=1`; those axes are recorded as invalid.

use crate::collector::{CollectorError, Sample, SampleSource};
use crate::config::TrackerConfig;
use crate::position::Position;

use log::{debug, info};
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0, multispace1},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    Finish, IResult,
};
use std::{
    io::{self, BufRead, BufReader, ErrorKind, Write},
    net::{TcpStream, ToSocketAddrs},
    str::FromStr,
    time::Duration,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// One eye's point of gaze, as the tracker reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSample {
    /// Fraction of the screen width
    pub x: f64,
    /// Fraction of the screen height
    pub y: f64,
    /// False when the tracker lost the eye; `x` and `y` are then stale
    pub valid: bool,
}

impl EyeSample {
    fn to_position(self, resolution: (u32, u32)) -> Position {
        Position::from_fraction(self.valid, self.x, self.y, resolution)
    }
}

/// A decoded `<REC ... />` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeRecord {
    pub counter: u64,
    pub left: EyeSample,
    pub right: EyeSample,
}

impl GazeRecord {
    /// Convert to pixels on a screen of the given size.
    pub fn to_sample(&self, resolution: (u32, u32)) -> Sample {
        Sample {
            right: self.right.to_position(resolution),
            left: self.left.to_position(resolution),
            sequence: self.counter as f64,
        }
    }
}

fn parse_key(s: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(s)
}

fn parse_value(s: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"'))(s)
}

fn parse_attribute(s: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(parse_key, char('='), parse_value)(s)
}

/// `<TAG KEY="VALUE" ... />` into the tag and its attributes.
fn parse_element(s: &str) -> IResult<&str, (&str, Vec<(&str, &str)>)> {
    delimited(
        char('<'),
        terminated(
            pair(parse_key, many0(preceded(multispace1, parse_attribute))),
            multispace0,
        ),
        tag("/>"),
    )(s)
}

fn attribute<'a>(attrs: &[(&str, &'a str)], key: &str) -> Result<&'a str, CollectorError> {
    attrs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| CollectorError::Malformed(format!("record has no {key}")))
}

fn number<T: FromStr>(attrs: &[(&str, &str)], key: &str) -> Result<T, CollectorError> {
    let value = attribute(attrs, key)?;
    value
        .parse()
        .map_err(|_| CollectorError::Malformed(format!("{key}=\"{value}\" is not a number")))
}

fn eye(attrs: &[(&str, &str)], prefix: char) -> Result<EyeSample, CollectorError> {
    Ok(EyeSample {
        x: number(attrs, &format!("{prefix}POGX"))?,
        y: number(attrs, &format!("{prefix}POGY"))?,
        valid: attribute(attrs, &format!("{prefix}POGV"))? == "1",
    })
}

/// Is this line a data record, as opposed to an acknowledgement?
pub fn is_record(line: &str) -> bool {
    line.trim_start().starts_with("<REC")
}

impl FromStr for GazeRecord {
    type Err = CollectorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_remaining, (name, attrs)) = parse_element(s.trim())
            .finish()
            .map_err(|e| CollectorError::Malformed(format!("{:?} at \"{}\"", e.code, e.input)))?;

        if name != "REC" {
            return Err(CollectorError::Malformed(format!("expected REC, got {name}")));
        }

        Ok(GazeRecord {
            counter: number(&attrs, "CNT")?,
            left: eye(&attrs, 'L')?,
            right: eye(&attrs, 'R')?,
        })
    }
}

/// The set-up commands, in the order they are sent.
fn setup_commands(resolution: (u32, u32)) -> Vec<String> {
    let (w, h) = resolution;
    let mut commands = vec![format!(
        "<SET ID=\"SCREEN_SIZE\" X=\"0\" Y=\"0\" WIDTH=\"{w}\" HEIGHT=\"{h}\" />"
    )];
    commands.extend(
        [
            "ENABLE_SEND_COUNTER",
            "ENABLE_SEND_POG_RIGHT",
            "ENABLE_SEND_POG_LEFT",
            "ENABLE_SEND_DATA",
        ]
        .iter()
        .map(|id| format!("<SET ID=\"{id}\" STATE=\"1\" />")),
    );
    commands
}

/// A connection to a GP3 tracker server.
#[derive(Debug)]
pub struct GazepointSource {
    reader: BufReader<TcpStream>,
    resolution: (u32, u32),
    pending: Vec<u8>,
}

impl GazepointSource {
    /// Connect to the server and ask it to start streaming gaze data.
    pub fn connect(config: &TrackerConfig, resolution: (u32, u32)) -> Result<Self, CollectorError> {
        let address = config.to_string();
        let connect_error = |source: io::Error| CollectorError::Connect {
            tracker: "Gazepoint GP3".to_owned(),
            address: address.clone(),
            source,
        };

        let addr = (config.address.as_str(), config.port)
            .to_socket_addrs()
            .map_err(connect_error)?
            .next()
            .ok_or_else(|| connect_error(io::Error::from(ErrorKind::AddrNotAvailable)))?;
        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(connect_error)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        for command in setup_commands(resolution) {
            debug!("GP3 <- {command}");
            stream.write_all(command.as_bytes())?;
            stream.write_all(b"\r\n")?;
        }
        stream.flush()?;
        info!("Connected to Gazepoint GP3 at {address}");

        Ok(Self {
            reader: BufReader::new(stream),
            resolution,
            pending: Vec::new(),
        })
    }

    /// Read until the end of a line. Partial lines are kept across timeouts.
    fn read_line(&mut self) -> Result<Option<String>, CollectorError> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => Err(CollectorError::Disconnected("Gazepoint GP3".to_owned())),
            Ok(_) if self.pending.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&self.pending).trim_end().to_owned();
                self.pending.clear();
                Ok(Some(line))
            }
            Ok(_) => Ok(None),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(CollectorError::Io(e)),
        }
    }
}

impl SampleSource for GazepointSource {
    fn name(&self) -> &str {
        "Gazepoint GP3"
    }

    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    fn next_sample(&mut self) -> Result<Option<Sample>, CollectorError> {
        let Some(line) = self.read_line()? else {
            return Ok(None);
        };
        if !is_record(&line) {
            debug!("GP3 -> {line}");
            return Ok(None);
        }
        let record: GazeRecord = line.parse()?;
        Ok(Some(record.to_sample(self.resolution)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::INVALID_COORD;
    use std::{io::Read, net::TcpListener, thread};

    #[test]
    fn parse_record() {
        let s = "<REC CNT=\"151747\" LPOGX=\"0.87396\" LPOGY=\"0.02765\" LPOGV=\"1\" \
                 RPOGX=\"0.89497\" RPOGY=\"0.77830\" RPOGV=\"0\" />";

        let record: GazeRecord = s.parse().unwrap();
        assert_eq!(
            record,
            GazeRecord {
                counter: 151747,
                left: EyeSample {
                    x: 0.87396,
                    y: 0.02765,
                    valid: true,
                },
                right: EyeSample {
                    x: 0.89497,
                    y: 0.77830,
                    valid: false,
                },
            }
        );
    }

    #[test]
    fn record_to_pixels() {
        let s = "<REC CNT=\"7\" LPOGX=\"0.5\" LPOGY=\"1.08536\" LPOGV=\"1\" \
                 RPOGX=\"0.25\" RPOGY=\"0.5\" RPOGV=\"1\" />";
        let sample = s.parse::<GazeRecord>().unwrap().to_sample((1000, 800));

        assert_eq!(sample.sequence, 7.0);
        assert_eq!(sample.left, Position::new(500, INVALID_COORD));
        assert_eq!(sample.right, Position::new(250, 400));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let s = "<REC RPOGV=\"1\" RPOGY=\"0.1\" RPOGX=\"0.2\" LPOGV=\"1\" LPOGY=\"0.3\" \
                 LPOGX=\"0.4\" CNT=\"1\"/>";
        let record: GazeRecord = s.parse().unwrap();
        assert_eq!(record.left.x, 0.4);
        assert_eq!(record.right.y, 0.1);
    }

    #[test]
    fn malformed_records() {
        for s in [
            "<REC CNT=\"1\" />",
            "<REC CNT=\"x\" LPOGX=\"0\" LPOGY=\"0\" LPOGV=\"1\" RPOGX=\"0\" RPOGY=\"0\" RPOGV=\"1\" />",
            "<ACK ID=\"ENABLE_SEND_DATA\" STATE=\"1\" />",
            "garbage",
        ] {
            let err = s.parse::<GazeRecord>().unwrap_err();
            assert!(err.is_transient(), "{s}: {err}");
        }
    }

    #[test]
    fn setup_then_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while received.iter().filter(|&&b| b == b'\n').count() < 5 {
                let n = stream.read(&mut buf).unwrap();
                received.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"<ACK ID=\"ENABLE_SEND_DATA\" STATE=\"1\" />\r\n")
                .unwrap();
            stream
                .write_all(
                    b"<REC CNT=\"3\" LPOGX=\"0.5\" LPOGY=\"0.5\" LPOGV=\"1\" \
                      RPOGX=\"0.5\" RPOGY=\"0.5\" RPOGV=\"1\" />\r\n",
                )
                .unwrap();
            String::from_utf8(received).unwrap()
        });

        let config = TrackerConfig {
            address: "127.0.0.1".to_owned(),
            port,
        };
        let mut source = GazepointSource::connect(&config, (200, 100)).unwrap();

        let mut sample = None;
        for _ in 0..50 {
            if let Some(s) = source.next_sample().unwrap() {
                sample = Some(s);
                break;
            }
        }
        let sample = sample.unwrap();
        assert_eq!(sample.right, Position::new(100, 50));
        assert_eq!(sample.sequence, 3.0);

        let commands = server.join().unwrap();
        let lines: Vec<&str> = commands.split("\r\n").collect();
        assert_eq!(
            lines[0],
            "<SET ID=\"SCREEN_SIZE\" X=\"0\" Y=\"0\" WIDTH=\"200\" HEIGHT=\"100\" />"
        );
        assert_eq!(lines[4], "<SET ID=\"ENABLE_SEND_DATA\" STATE=\"1\" />");

        // server hung up
        let mut result = Ok(None);
        for _ in 0..50 {
            result = source.next_sample();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(CollectorError::Disconnected(_))));
    }

    #[test]
    fn refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = TrackerConfig {
            address: "127.0.0.1".to_owned(),
            port,
        };
        assert!(matches!(
            GazepointSource::connect(&config, (1, 1)),
            Err(CollectorError::Connect { .. })
        ));
    }
}
