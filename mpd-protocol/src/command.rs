use crate::error::{ProtocolError, Result};

/// A request understood by the adapter.
///
/// Only connection, idle, status, current-song and transport commands are
/// modelled; everything else in the daemon's command set is out of reach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    // Connection
    Password { password: String },
    Ping,
    Close,

    // Idle
    Idle,
    NoIdle,

    // Queries
    Status,
    CurrentSong,

    // Playback
    Play,
    Pause { state: bool },
    TogglePause,
    Stop,
    Previous,
    Next,
    SeekId { song_id: u32, position: u32 },

    // Options
    Repeat { enabled: bool },
    Random { enabled: bool },
    Single { enabled: bool },

    // Command lists
    CommandListOkBegin,
    CommandListEnd,
}

impl Command {
    /// Parse a request line (daemon side; used by test servers).
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let args = tokenize(line)?;
        let mut parts = args.iter().map(String::as_str);
        let keyword = parts
            .next()
            .ok_or_else(|| ProtocolError::InvalidCommand("empty command".into()))?;

        let cmd = match keyword {
            "password" => Self::Password {
                password: required(&mut parts, "password")?.to_owned(),
            },
            "ping" => Self::Ping,
            "close" => Self::Close,
            "idle" => {
                // Subsystem filters are accepted but not modelled.
                parts.by_ref().for_each(drop);
                Self::Idle
            }
            "noidle" => Self::NoIdle,
            "status" => Self::Status,
            "currentsong" => Self::CurrentSong,
            "play" => Self::Play,
            "pause" => match parts.next() {
                Some(v) => Self::Pause {
                    state: parse_bool(v, "pause")?,
                },
                None => Self::TogglePause,
            },
            "stop" => Self::Stop,
            "previous" => Self::Previous,
            "next" => Self::Next,
            "seekid" => {
                let song_id = parse_u32(required(&mut parts, "seekid")?, "seekid")?;
                let position = parse_u32(required(&mut parts, "seekid")?, "seekid")?;
                Self::SeekId { song_id, position }
            }
            "repeat" => Self::Repeat {
                enabled: parse_bool(required(&mut parts, "repeat")?, "repeat")?,
            },
            "random" => Self::Random {
                enabled: parse_bool(required(&mut parts, "random")?, "random")?,
            },
            "single" => Self::Single {
                enabled: parse_bool(required(&mut parts, "single")?, "single")?,
            },
            "command_list_ok_begin" => Self::CommandListOkBegin,
            "command_list_end" => Self::CommandListEnd,
            _ => {
                return Err(ProtocolError::InvalidCommand(format!(
                    "unknown command: {keyword:?}"
                )));
            }
        };

        if parts.next().is_some() {
            return Err(ProtocolError::InvalidCommand(format!(
                "{}: unexpected extra arguments",
                cmd.name()
            )));
        }
        Ok(cmd)
    }

    /// Serialize to wire bytes (one newline-terminated line).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut line = self.format_line();
        line.push('\n');
        line.into_bytes()
    }

    /// The command keyword as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Ping => "ping",
            Self::Close => "close",
            Self::Idle => "idle",
            Self::NoIdle => "noidle",
            Self::Status => "status",
            Self::CurrentSong => "currentsong",
            Self::Play => "play",
            Self::Pause { .. } | Self::TogglePause => "pause",
            Self::Stop => "stop",
            Self::Previous => "previous",
            Self::Next => "next",
            Self::SeekId { .. } => "seekid",
            Self::Repeat { .. } => "repeat",
            Self::Random { .. } => "random",
            Self::Single { .. } => "single",
            Self::CommandListOkBegin => "command_list_ok_begin",
            Self::CommandListEnd => "command_list_end",
        }
    }

    /// True for commands that may appear inside a command list.
    pub fn is_listable(&self) -> bool {
        !matches!(
            self,
            Self::Idle
                | Self::NoIdle
                | Self::Close
                | Self::Password { .. }
                | Self::CommandListOkBegin
                | Self::CommandListEnd
        )
    }

    fn format_line(&self) -> String {
        match self {
            Self::Password { password } => format!("password {}", quote(password)),
            Self::Pause { state } => format!("pause {}", flag(*state)),
            Self::SeekId { song_id, position } => format!("seekid {song_id} {position}"),
            Self::Repeat { enabled } => format!("repeat {}", flag(*enabled)),
            Self::Random { enabled } => format!("random {}", flag(*enabled)),
            Self::Single { enabled } => format!("single {}", flag(*enabled)),
            other => other.name().to_owned(),
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Quote an argument, escaping `"` and `\`.
pub fn quote(arg: &str) -> String {
    let mut s = String::with_capacity(arg.len() + 2);
    s.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            s.push('\\');
        }
        s.push(c);
    }
    s.push('"');
    s
}

/// Split a request line into arguments, honouring double quotes and
/// backslash escapes inside them.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut arg = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => arg.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    c => arg.push(c),
                }
            }
            if !closed {
                return Err(ProtocolError::UnterminatedQuote(line.to_owned()));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_ascii_whitespace()) {
                arg.push(c);
            }
        }
        args.push(arg);
    }

    Ok(args)
}

fn required<'a>(parts: &mut impl Iterator<Item = &'a str>, command: &str) -> Result<&'a str> {
    parts
        .next()
        .ok_or_else(|| ProtocolError::InvalidCommand(format!("{command} requires an argument")))
}

fn parse_bool(value: &str, command: &str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ProtocolError::InvalidCommand(format!(
            "{command}: expected 0 or 1, got {value:?}"
        ))),
    }
}

fn parse_u32(value: &str, command: &str) -> Result<u32> {
    value.parse().map_err(|_| {
        ProtocolError::InvalidCommand(format!("{command}: expected integer, got {value:?}"))
    })
}
