//! Async Music Player Daemon client for status-bar style hosts.
//!
//! Holds one connection to the daemon, parks it in idle mode between ticks,
//! and exposes status and current-song snapshots plus the playback and
//! option commands. Playback commands never fail loudly: they log and return
//! a [`CommandOutcome`].
//!
//! ```no_run
//! # async fn example() -> mpd_rs_client::Result<()> {
//! use mpd_rs_client::{ConnectionConfig, DEFAULT_RETRY_INTERVAL, MpdConnection};
//!
//! let mut conn = MpdConnection::new(ConnectionConfig::default().with_password("hunter2"));
//! conn.retry_connection(DEFAULT_RETRY_INTERVAL).await;
//!
//! let mut status = conn.get_status().await?;
//! let song = conn.get_song().await?;
//! println!("{} - {} [{}]", song.artist(), song.title(), status.formatted_elapsed());
//!
//! conn.idle().await?;
//! let events = conn.wait_idle().await?;
//! status.update(events, Some(&mut conn)).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod reconnect;
pub mod song;
pub mod state;
pub mod status;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod mock;

pub use client::MpdConnection;
pub use error::{ClientError, ClientErrorCode, MpdError, Result, ServerError};
pub use mpd_rs_protocol::{Command, IdleEvents, ProtocolVersion};
pub use song::Song;
pub use state::{CommandOutcome, ConnectionConfig, DEFAULT_PORT, DEFAULT_RETRY_INTERVAL, Mode};
pub use status::{PlaybackState, Status};
pub use stream::idle_events;
