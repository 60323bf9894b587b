use std::fmt;

use crate::error::{ProtocolError, Result};

/// Numeric error codes carried in `ACK [code@index]` lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AckCode {
    NotList,
    Argument,
    Password,
    Permission,
    Unknown,
    NoExist,
    PlaylistMax,
    System,
    PlaylistLoad,
    UpdateAlready,
    PlayerSync,
    Exist,
    /// A code this crate does not know; the raw number is preserved.
    Other(i32),
}

impl AckCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::NotList,
            2 => Self::Argument,
            3 => Self::Password,
            4 => Self::Permission,
            5 => Self::Unknown,
            50 => Self::NoExist,
            51 => Self::PlaylistMax,
            52 => Self::System,
            53 => Self::PlaylistLoad,
            54 => Self::UpdateAlready,
            55 => Self::PlayerSync,
            56 => Self::Exist,
            n => Self::Other(n),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NotList => 1,
            Self::Argument => 2,
            Self::Password => 3,
            Self::Permission => 4,
            Self::Unknown => 5,
            Self::NoExist => 50,
            Self::PlaylistMax => 51,
            Self::System => 52,
            Self::PlaylistLoad => 53,
            Self::UpdateAlready => 54,
            Self::PlayerSync => 55,
            Self::Exist => 56,
            Self::Other(n) => *n,
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A parsed `ACK [code@index] {command} message` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub code: AckCode,
    /// Position of the failing command inside a command list (0 otherwise).
    pub command_index: u32,
    /// Name of the failing command; empty when the daemon did not know it.
    pub command: String,
    pub message: String,
}

impl Ack {
    fn parse(line: &str) -> Result<Self> {
        let invalid = || ProtocolError::InvalidAck(line.to_owned());

        let rest = line.strip_prefix("ACK ").ok_or_else(invalid)?;
        let rest = rest.strip_prefix('[').ok_or_else(invalid)?;
        let (bracket, rest) = rest.split_once(']').ok_or_else(invalid)?;
        let (code, index) = bracket.split_once('@').ok_or_else(invalid)?;
        let code: i32 = code.parse().map_err(|_| invalid())?;
        let command_index: u32 = index.parse().map_err(|_| invalid())?;

        let rest = rest.trim_start();
        let rest = rest.strip_prefix('{').ok_or_else(invalid)?;
        let (command, message) = rest.split_once('}').ok_or_else(invalid)?;

        Ok(Self {
            code: AckCode::from_code(code),
            command_index,
            command: command.to_owned(),
            message: message.trim_start().to_owned(),
        })
    }
}

/// One line of a daemon response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Terminates a successful response.
    Ok,
    /// Separates results inside a `command_list_ok_begin` batch.
    ListOk,
    /// Terminates a failed response.
    Ack(Ack),
    /// A `key: value` payload line.
    Pair { key: String, value: String },
}

impl Response {
    /// Classify a single response line.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');

        if line == "OK" {
            return Ok(Self::Ok);
        }

        if line == "list_OK" {
            return Ok(Self::ListOk);
        }

        if line.starts_with("ACK ") {
            return Ack::parse(line).map(Self::Ack);
        }

        match split_pair(line) {
            Some((key, value)) => Ok(Self::Pair {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
            None => Err(ProtocolError::InvalidResponse(format!(
                "unrecognized response: {line:?}"
            ))),
        }
    }

    /// Returns true for lines that end a response (`OK` or `ACK`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Ack(_))
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ok => b"OK\n".to_vec(),
            Self::ListOk => b"list_OK\n".to_vec(),
            Self::Ack(ack) => format!(
                "ACK [{}@{}] {{{}}} {}\n",
                ack.code.code(),
                ack.command_index,
                ack.command,
                ack.message
            )
            .into_bytes(),
            Self::Pair { key, value } => format!("{key}: {value}\n").into_bytes(),
        }
    }
}

/// Split a `key: value` line. A bare `key:` yields an empty value.
pub fn split_pair(line: &str) -> Option<(&str, &str)> {
    if let Some((key, value)) = line.split_once(": ") {
        if key.is_empty() || key.contains(' ') {
            return None;
        }
        return Some((key, value));
    }
    let key = line.strip_suffix(':')?;
    if key.is_empty() || key.contains(' ') {
        None
    } else {
        Some((key, ""))
    }
}
