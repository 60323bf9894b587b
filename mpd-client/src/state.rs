use std::time::Duration;

use crate::error::MpdError;

/// Default daemon port.
pub const DEFAULT_PORT: u16 = 6600;

/// Default pause between reconnect attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Protocol mode of a live connection.
///
/// Transitions: `Active` ⇄ `Idle`, `Active` ⇄ `CommandList`. Idle and an
/// open command list are mutually exclusive by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Ordinary request/response commands may be sent.
    #[default]
    Active,
    /// `idle` was sent; nothing but `noidle` may be written until the daemon
    /// answers.
    Idle,
    /// A `command_list_ok_begin` batch is open.
    CommandList,
}

impl Mode {
    /// Returns the mode name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Idle => "Idle",
            Self::CommandList => "CommandList",
        }
    }
}

/// Configuration for [`MpdConnection`](crate::MpdConnection).
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Host name or address of the daemon.
    pub host: String,
    /// TCP port. Default: 6600.
    pub port: u16,
    /// Password sent after connecting. `None` (or empty) skips
    /// authentication.
    pub password: Option<String>,
    /// Bound on connect and on every read or write. Default: 15 seconds.
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The password, if one is set and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            password: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Result of a playback or option command.
///
/// These commands never return `Err`: failures are logged and reported here
/// so the caller can inspect them or ignore them.
#[derive(Debug)]
pub enum CommandOutcome {
    Completed,
    Failed(MpdError),
}

impl CommandOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn error(&self) -> Option<&MpdError> {
        match self {
            Self::Completed => None,
            Self::Failed(e) => Some(e),
        }
    }

    /// Convert back into a `Result` for callers that want `?`.
    pub fn into_result(self) -> Result<(), MpdError> {
        match self {
            Self::Completed => Ok(()),
            Self::Failed(e) => Err(e),
        }
    }
}
