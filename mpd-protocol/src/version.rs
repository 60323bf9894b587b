use std::fmt;

use crate::error::{ProtocolError, Result};

/// Greeting prefix sent by the daemon right after accept.
pub const GREETING_PREFIX: &str = "OK MPD ";

/// Protocol version advertised in the `OK MPD x.y.z` greeting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProtocolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the greeting line (with or without the trailing newline).
    ///
    /// Missing minor/patch components default to 0, matching how older
    /// daemons announce themselves (`OK MPD 0.12`).
    pub fn parse_greeting(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let rest = line
            .strip_prefix(GREETING_PREFIX)
            .ok_or_else(|| ProtocolError::InvalidGreeting(line.to_owned()))?;

        let mut parts = rest.trim().split('.');
        let mut next = |required: bool| -> Result<u32> {
            match parts.next() {
                Some(p) => p
                    .parse()
                    .map_err(|_| ProtocolError::InvalidGreeting(line.to_owned())),
                None if required => Err(ProtocolError::InvalidGreeting(line.to_owned())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
