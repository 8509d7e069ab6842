use regex::Regex;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::*;

/// Largest channel number a pore range may name.
pub const MAX_CHANNEL: u32 = 512;

/// Inclusive interval of channel numbers to keep.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoreRange {
    start: u32,
    stop: u32,
}

impl PoreRange {
    /// Create a range from its bounds, checking `start <= stop` and that both bounds are at most
    /// [`MAX_CHANNEL`].
    pub fn new(start: u32, stop: u32) -> Result<Self> {
        Self::checked(start, stop, &format!("{start}-{stop}"))
    }

    /// Parse a range written as `"start-stop"`, for example `"0-256"`.
    pub fn parse(range: &str) -> Result<Self> {
        static FORMAT: OnceLock<Regex> = OnceLock::new();
        let format = FORMAT.get_or_init(|| Regex::new(r"^(\d+)-(\d+)$").unwrap());

        let invalid = |reason| Error::InvalidRange {
            range: range.to_owned(),
            reason,
        };

        let caps = format
            .captures(range.trim())
            .ok_or_else(|| invalid("range format needs to be \"start-end\""))?;
        let start = caps[1]
            .parse::<u32>()
            .map_err(|_| invalid("pore range values must be between 0-512"))?;
        let stop = caps[2]
            .parse::<u32>()
            .map_err(|_| invalid("pore range values must be between 0-512"))?;

        Self::checked(start, stop, range)
    }

    fn checked(start: u32, stop: u32, range: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidRange {
            range: range.to_owned(),
            reason,
        };

        if start > stop {
            return Err(invalid(
                "the first value of the range must be lower than the second one",
            ));
        }
        if start > MAX_CHANNEL {
            return Err(invalid("pore range values must be between 0-512"));
        }
        if stop > MAX_CHANNEL {
            return Err(invalid("pore range values must be between 0-512"));
        }

        Ok(Self { start, stop })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn stop(&self) -> u32 {
        self.stop
    }

    /// Whether a channel lies inside the range, bounds included.
    pub fn contains(&self, channel: i64) -> bool {
        i64::from(self.start) <= channel && channel <= i64::from(self.stop)
    }
}

impl FromStr for PoreRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PoreRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.stop)
    }
}
