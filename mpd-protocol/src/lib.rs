//! MPD protocol types, commands, and response parsing.
//!
//! This crate provides the wire layer of the Music Player Daemon text
//! protocol: request serialization, response line classification, the
//! greeting, idle notifications, and the key/value payloads of the
//! `status` and `currentsong` queries. It performs no I/O.

pub mod command;
pub mod error;
pub mod idle;
pub mod response;
pub mod song;
pub mod status;
pub mod version;

pub use command::Command;
pub use error::{ProtocolError, Result};
pub use idle::IdleEvents;
pub use response::{Ack, AckCode, Response};
pub use song::RawSong;
pub use status::{PlayState, RawStatus};
pub use version::ProtocolVersion;
