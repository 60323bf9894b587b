use crate::error::{ProtocolError, Result};

/// Playback state as reported in the `state:` field.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlayState {
    #[default]
    Unknown,
    Stop,
    Play,
    Pause,
}

impl PlayState {
    /// Unrecognized values map to [`PlayState::Unknown`].
    pub fn parse(s: &str) -> Self {
        match s {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stop => "stop",
            Self::Play => "play",
            Self::Pause => "pause",
        }
    }
}

/// The decoded payload of a `status` response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStatus {
    /// Mixer volume, `None` when the daemon has no mixer.
    pub volume: Option<u8>,
    pub repeat: bool,
    pub random: bool,
    /// `single` is on or in oneshot mode.
    pub single: bool,
    pub consume: bool,
    pub queue_version: u32,
    pub queue_length: u32,
    pub state: PlayState,
    pub song_pos: Option<u32>,
    pub song_id: Option<u32>,
    /// Elapsed time of the current song in milliseconds.
    pub elapsed_ms: u64,
    /// Total time of the current song in whole seconds.
    pub total_time: u32,
    /// Instantaneous bitrate in kbit/s.
    pub bitrate: u32,
    /// Audio format as `samplerate:bits:channels`.
    pub audio_format: Option<String>,
    /// Last player error, if any.
    pub error: Option<String>,
}

impl RawStatus {
    /// Build from the `key: value` pairs of a `status` response.
    ///
    /// `elapsed` and `duration` take precedence over the legacy integer
    /// `time: elapsed:total` field when both are present. Unknown keys are
    /// ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut status = Self::default();
        let mut precise_elapsed = None;
        let mut precise_total = None;

        for (key, value) in pairs {
            match key {
                "volume" => {
                    let v: i32 = parse_num(value, "volume")?;
                    status.volume = u8::try_from(v).ok();
                }
                "repeat" => status.repeat = parse_flag(value, "repeat")?,
                "random" => status.random = parse_flag(value, "random")?,
                "single" => status.single = value == "oneshot" || parse_flag(value, "single")?,
                "consume" => status.consume = value == "oneshot" || parse_flag(value, "consume")?,
                "playlist" => status.queue_version = parse_num(value, "playlist")?,
                "playlistlength" => status.queue_length = parse_num(value, "playlistlength")?,
                "state" => status.state = PlayState::parse(value),
                "song" => status.song_pos = Some(parse_num(value, "song")?),
                "songid" => status.song_id = Some(parse_num(value, "songid")?),
                "elapsed" => precise_elapsed = Some(parse_seconds(value, "elapsed")?),
                "duration" => precise_total = Some(parse_seconds(value, "duration")?),
                "time" => {
                    let (elapsed, total) = value.split_once(':').ok_or_else(|| {
                        ProtocolError::InvalidValue {
                            key: "time",
                            value: value.to_owned(),
                        }
                    })?;
                    let elapsed: u64 = parse_num(elapsed, "time")?;
                    status.elapsed_ms = elapsed * 1000;
                    status.total_time = parse_num(total, "time")?;
                }
                "bitrate" => status.bitrate = parse_num(value, "bitrate")?,
                "audio" => status.audio_format = Some(value.to_owned()),
                "error" => status.error = Some(value.to_owned()),
                _ => {}
            }
        }

        if let Some(elapsed) = precise_elapsed {
            status.elapsed_ms = (elapsed * 1000.0).round() as u64;
        }
        if let Some(total) = precise_total {
            status.total_time = total.round() as u32;
        }

        Ok(status)
    }

    /// Elapsed time truncated to whole seconds.
    pub fn elapsed_time(&self) -> u32 {
        (self.elapsed_ms / 1000) as u32
    }
}

fn parse_flag(value: &str, key: &'static str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ProtocolError::InvalidValue {
            key,
            value: value.to_owned(),
        }),
    }
}

pub(crate) fn parse_num<T: std::str::FromStr>(value: &str, key: &'static str) -> Result<T> {
    value.trim().parse().map_err(|_| ProtocolError::InvalidValue {
        key,
        value: value.to_owned(),
    })
}

pub(crate) fn parse_seconds(value: &str, key: &'static str) -> Result<f64> {
    let secs: f64 = parse_num(value, key)?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(ProtocolError::InvalidValue {
            key,
            value: value.to_owned(),
        })
    }
}
