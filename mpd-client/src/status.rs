use mpd_rs_protocol::{Command, IdleEvents, PlayState, RawStatus};
use tokio::time::Instant;
use tracing::trace;

use crate::client::MpdConnection;
use crate::error::{MpdError, Result};

/// Playback state of a [`Status`] snapshot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Unknown,
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl From<PlayState> for PlaybackState {
    fn from(state: PlayState) -> Self {
        match state {
            PlayState::Play => Self::Playing,
            PlayState::Pause => Self::Paused,
            PlayState::Stop => Self::Stopped,
            PlayState::Unknown => Self::Unknown,
        }
    }
}

/// Cached playback status with local elapsed-time interpolation.
///
/// Fetched values are authoritative only right after a fetch; between
/// fetches [`update_timer()`](Self::update_timer) advances the elapsed time
/// from the clock so a display can tick without polling the daemon.
#[derive(Clone, Debug)]
pub struct Status {
    raw: RawStatus,
    state: PlaybackState,
    song_id: Option<u32>,
    random: bool,
    repeat: bool,
    single: bool,
    elapsed_time: u32,
    elapsed_ms: u64,
    total_time: u32,
    updated_at: Instant,
}

impl Status {
    /// Fetch a new snapshot. With `auto_update` the playback state and the
    /// millisecond counter are populated as well.
    pub async fn fetch(conn: &mut MpdConnection, auto_update: bool) -> Result<Self> {
        let mut status = Self::from_parts(RawStatus::default(), Instant::now());
        status.fetch_data(conn).await?;
        if auto_update {
            status.update(IdleEvents::ALL, Some(conn)).await?;
        }
        Ok(status)
    }

    /// Send `status` and copy the raw values into the snapshot.
    pub async fn fetch_data(&mut self, conn: &mut MpdConnection) -> Result<()> {
        let pairs = conn.query(&Command::Status).await?;
        let raw = RawStatus::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(MpdError::from);
        let raw = conn.translate(raw)?;

        self.updated_at = Instant::now();
        self.song_id = raw.song_id;
        self.random = raw.random;
        self.repeat = raw.repeat;
        self.single = raw.single;
        self.elapsed_time = display_seconds(raw.elapsed_ms);
        self.total_time = raw.total_time;
        self.raw = raw;
        trace!(state = self.raw.state.as_str(), elapsed_ms = self.raw.elapsed_ms, "status fetched");
        Ok(())
    }

    /// Re-fetch when `events` report a player or options change.
    ///
    /// Returns whether a fetch happened. Without a connection this is a
    /// no-op.
    pub async fn update(
        &mut self,
        events: IdleEvents,
        conn: Option<&mut MpdConnection>,
    ) -> Result<bool> {
        let Some(conn) = conn else {
            return Ok(false);
        };
        if !events.intersects(IdleEvents::PLAYER | IdleEvents::OPTIONS) {
            return Ok(false);
        }

        self.fetch_data(conn).await?;
        self.apply_fetched();
        Ok(true)
    }

    /// Advance the elapsed time by the clock delta since the last update.
    pub fn update_timer(&mut self) {
        self.update_timer_at(Instant::now());
    }

    pub fn update_timer_at(&mut self, now: Instant) {
        let delta = now.saturating_duration_since(self.updated_at);
        self.elapsed_ms += delta.as_millis() as u64;
        self.elapsed_time = display_seconds(self.elapsed_ms);
        self.updated_at = now;
    }

    // -- Accessors --

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn match_state(&self, state: PlaybackState) -> bool {
        self.state == state
    }

    /// Id of the current song, `None` when nothing is selected.
    pub fn song_id(&self) -> Option<u32> {
        self.song_id
    }

    pub fn random(&self) -> bool {
        self.random
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn single(&self) -> bool {
        self.single
    }

    /// Elapsed seconds, interpolated by [`update_timer()`](Self::update_timer).
    pub fn elapsed_time(&self) -> u32 {
        self.elapsed_time
    }

    pub fn total_time(&self) -> u32 {
        self.total_time
    }

    /// Instant of the last fetch or timer update.
    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    pub fn elapsed_percentage(&self) -> u32 {
        if self.total_time == 0 {
            return 0;
        }
        (self.elapsed_time as f32 / self.total_time as f32 * 100.0 + 0.5) as u32
    }

    /// Map a seek gesture in percent to an absolute offset in seconds.
    /// `percentage` is clamped to `0..=100`.
    pub fn seek_position(&self, percentage: i32) -> u32 {
        if self.total_time == 0 {
            return 0;
        }
        let percentage = percentage.clamp(0, 100);
        (self.total_time as f32 * percentage as f32 / 100.0 + 0.5) as u32
    }

    /// Elapsed time as `m:ss`.
    pub fn formatted_elapsed(&self) -> String {
        format_time(self.elapsed_time)
    }

    /// Total time as `m:ss`.
    pub fn formatted_total(&self) -> String {
        format_time(self.total_time)
    }

    pub fn volume(&self) -> Option<u8> {
        self.raw.volume
    }

    pub fn queue_length(&self) -> u32 {
        self.raw.queue_length
    }

    pub fn bitrate(&self) -> u32 {
        self.raw.bitrate
    }

    pub fn audio_format(&self) -> Option<&str> {
        self.raw.audio_format.as_deref()
    }

    /// Last player error reported by the daemon.
    pub fn error(&self) -> Option<&str> {
        self.raw.error.as_deref()
    }

    pub fn raw(&self) -> &RawStatus {
        &self.raw
    }

    fn from_parts(raw: RawStatus, now: Instant) -> Self {
        Self {
            state: PlaybackState::Unknown,
            song_id: raw.song_id,
            random: raw.random,
            repeat: raw.repeat,
            single: raw.single,
            elapsed_time: display_seconds(raw.elapsed_ms),
            elapsed_ms: 0,
            total_time: raw.total_time,
            updated_at: now,
            raw,
        }
    }

    fn apply_fetched(&mut self) {
        self.elapsed_ms = self.raw.elapsed_ms;
        self.state = self.raw.state.into();
    }
}

/// Build a fully populated snapshot from an already decoded response.
impl From<RawStatus> for Status {
    fn from(raw: RawStatus) -> Self {
        let mut status = Self::from_parts(raw, Instant::now());
        status.apply_fetched();
        status
    }
}

fn display_seconds(ms: u64) -> u32 {
    (ms as f64 / 1000.0 + 0.5) as u32
}

fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
