use mpd_rs_protocol::{Command, IdleEvents, ProtocolVersion, RawSong, Response};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ClientError, MpdError, Result, ServerError};
use crate::song::Song;
use crate::state::{CommandOutcome, ConnectionConfig, Mode};
use crate::status::Status;
use crate::transport::Transport;

/// Async MPD connection with idle-mode tracking.
///
/// Implements the protocol mode machine:
/// `Disconnected` → `Active` ⇄ `Idle`, with `Active` ⇄ `CommandList` for
/// batches. Every command and query leaves idle mode first, so a caller can
/// park the connection in [`idle()`](Self::idle) between ticks and still
/// issue commands at any time.
///
/// # Cancel safety
///
/// [`wait_idle()`](Self::wait_idle) is cancel safe: dropping it leaves the
/// connection idle. Every other async method is not. Dropping one after its
/// request went out leaves an unread response on the socket, so the next
/// call drops the transport and fails with
/// [`ClientError::NotConnected`]; [`connected()`](Self::connected) reports
/// false from then on and the host reconnects as after any other failure.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> mpd_rs_client::Result<()> {
/// use mpd_rs_client::{ConnectionConfig, MpdConnection};
///
/// let mut conn = MpdConnection::new(ConnectionConfig::new("localhost"));
/// conn.connect().await?;
///
/// let status = conn.get_status().await?;
/// println!("{}/{}", status.formatted_elapsed(), status.formatted_total());
///
/// conn.toggle().await;
/// conn.idle().await?;
/// # Ok(())
/// # }
/// ```
pub struct MpdConnection {
    config: ConnectionConfig,
    transport: Option<Transport>,
    mode: Mode,
    fd: i32,
    version: Option<ProtocolVersion>,
}

impl MpdConnection {
    /// Create a disconnected instance. No socket is opened until
    /// [`connect()`](Self::connect).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            transport: None,
            mode: Mode::Active,
            fd: -1,
            version: None,
        }
    }

    // -- Accessors --

    /// Returns the configuration used for this connection.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the current protocol mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    /// True iff a transport is held.
    pub fn connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Raw socket descriptor, or -1 when disconnected. Hosts poll it to learn
    /// when an idle response is ready.
    pub fn get_fd(&self) -> i32 {
        self.fd
    }

    /// Protocol version from the greeting, if connected.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    // -- Lifecycle --

    /// Open the transport and authenticate if a password is configured.
    ///
    /// Re-entrant: an existing transport is dropped first. On any failure the
    /// connection is rolled back to disconnected and the error returned.
    pub async fn connect(&mut self) -> Result<()> {
        trace!(
            host = %self.config.host,
            port = self.config.port,
            timeout = ?self.config.timeout,
            auth = self.config.password().is_some(),
            "connect"
        );
        self.disconnect();

        match self.establish().await {
            Ok(()) => {
                info!(host = %self.config.host, version = ?self.version, "connected");
                Ok(())
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<()> {
        let (transport, version) =
            Transport::connect(&self.config.host, self.config.port, self.config.timeout).await?;
        self.fd = transport.fd();
        self.transport = Some(transport);
        self.version = Some(version);

        if let Some(password) = self.config.password().map(str::to_owned) {
            debug!("sending password");
            self.exchange_ok(&Command::Password { password }).await?;
        }
        Ok(())
    }

    /// Drop the transport and reset the mode. Always succeeds.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            debug!(host = %self.config.host, "disconnected");
        }
        self.mode = Mode::Active;
        self.fd = -1;
        self.version = None;
    }

    /// Say goodbye with `close` before dropping the transport. Errors on
    /// the way out are ignored.
    pub async fn close(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            let _ = transport.send_command(&Command::Close).await;
            let _ = transport.shutdown().await;
        }
        self.disconnect();
    }

    // -- Idle protocol --

    /// Enter idle mode. No-op if already idle.
    pub async fn idle(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.mode == Mode::Idle {
            return Ok(());
        }

        let transport = self.ensure_connected()?;
        let result = transport.send_command(&Command::Idle).await;
        self.translate(result)?;
        self.mode = Mode::Idle;
        trace!("entered idle");
        Ok(())
    }

    /// Leave idle mode and return the events that fired while idle.
    ///
    /// Returns an empty mask when the connection was not idle. Every command
    /// and query calls this first.
    pub async fn noidle(&mut self) -> Result<IdleEvents> {
        self.ensure_usable()?;
        if self.mode != Mode::Idle {
            return Ok(IdleEvents::NONE);
        }

        let transport = self.ensure_connected()?;
        let result = async move {
            transport.send_command(&Command::NoIdle).await?;
            transport.read_idle(false).await
        }
        .await;
        self.mode = Mode::Active;
        let events = self.translate(result)?;
        trace!(%events, "left idle");
        Ok(events)
    }

    /// Wait, without a timeout, for the daemon to report a change while
    /// idle, then return to active mode.
    ///
    /// Returns an empty mask immediately when the connection is not idle.
    /// Dropping the future leaves the connection idle; the next command
    /// cancels it as usual.
    pub async fn wait_idle(&mut self) -> Result<IdleEvents> {
        self.ensure_usable()?;
        if self.mode != Mode::Idle {
            return Ok(IdleEvents::NONE);
        }

        let transport = self.ensure_connected()?;
        let result = transport.read_idle(true).await;
        self.mode = Mode::Active;
        let events = self.translate(result)?;
        trace!(%events, "idle notification");
        Ok(events)
    }

    // -- Queries --

    /// Fetch a status snapshot. Errors propagate.
    pub async fn get_status(&mut self) -> Result<Status> {
        self.check_prerequisites_commands().await?;
        Status::fetch(self, true).await
    }

    /// Like [`get_status()`](Self::get_status) but absorbs every error into
    /// `None`.
    pub async fn get_status_safe(&mut self) -> Option<Status> {
        match self.get_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "status unavailable");
                None
            }
        }
    }

    /// Fetch the current song. A daemon with nothing queued yields a song
    /// whose [`is_found()`](Song::is_found) is false.
    pub async fn get_song(&mut self) -> Result<Song> {
        let pairs = self.query(&Command::CurrentSong).await?;
        let raw = RawSong::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let raw = self.translate(raw.map_err(MpdError::from))?;
        Ok(Song::new(raw))
    }

    /// Leave idle, send `cmd` and collect the response pairs.
    pub(crate) async fn query(&mut self, cmd: &Command) -> Result<Vec<(String, String)>> {
        self.check_prerequisites_commands().await?;
        let transport = self.ensure_connected()?;
        let result = async move {
            transport.send_command(cmd).await?;
            transport.read_pairs().await
        }
        .await;
        self.translate(result)
    }

    // -- Playback --

    pub async fn play(&mut self) -> CommandOutcome {
        self.run_command("play", Command::Play).await
    }

    pub async fn pause(&mut self, state: bool) -> CommandOutcome {
        self.run_command("pause", Command::Pause { state }).await
    }

    pub async fn toggle(&mut self) -> CommandOutcome {
        self.run_command("toggle", Command::TogglePause).await
    }

    pub async fn stop(&mut self) -> CommandOutcome {
        self.run_command("stop", Command::Stop).await
    }

    pub async fn prev(&mut self) -> CommandOutcome {
        self.run_command("prev", Command::Previous).await
    }

    pub async fn next(&mut self) -> CommandOutcome {
        self.run_command("next", Command::Next).await
    }

    /// Seek within song `song_id` to `position` seconds.
    pub async fn seek(&mut self, song_id: u32, position: u32) -> CommandOutcome {
        self.run_command("seek", Command::SeekId { song_id, position })
            .await
    }

    // -- Options --

    pub async fn set_repeat(&mut self, enabled: bool) -> CommandOutcome {
        self.run_command("set_repeat", Command::Repeat { enabled })
            .await
    }

    pub async fn set_random(&mut self, enabled: bool) -> CommandOutcome {
        self.run_command("set_random", Command::Random { enabled })
            .await
    }

    pub async fn set_single(&mut self, enabled: bool) -> CommandOutcome {
        self.run_command("set_single", Command::Single { enabled })
            .await
    }

    // -- Command lists --

    /// Send `commands` as one `command_list_ok_begin` batch.
    ///
    /// The daemon stops at the first failing command; its ACK is returned
    /// with `command_index` pointing into `commands`. The connection is back
    /// in active mode afterwards unless the transport failed.
    pub async fn command_list(&mut self, commands: &[Command]) -> Result<()> {
        if let Some(bad) = commands.iter().find(|c| !c.is_listable()) {
            return Err(ClientError::Argument(format!(
                "{} cannot be used in a command list",
                bad.name()
            ))
            .into());
        }

        self.check_prerequisites_commands().await?;
        self.mode = Mode::CommandList;
        debug!(count = commands.len(), "command list");

        let transport = self.ensure_connected()?;
        let result = async move {
            let mut wire = Command::CommandListOkBegin.to_bytes();
            for cmd in commands {
                wire.extend_from_slice(&cmd.to_bytes());
            }
            wire.extend_from_slice(&Command::CommandListEnd.to_bytes());
            transport.send_raw(&wire).await?;

            for _ in commands {
                read_list_entry(transport).await?;
            }
            transport.read_ok().await
        }
        .await;

        if self.connected() {
            self.mode = Mode::Active;
        }
        self.translate(result)
    }

    // -- Private helpers --

    fn ensure_connected(&mut self) -> Result<&mut Transport> {
        self.transport
            .as_mut()
            .ok_or_else(|| MpdError::from(ClientError::NotConnected))
    }

    /// Like [`ensure_connected()`](Self::ensure_connected), but first drops
    /// a transport that a cancelled call left mid-exchange: a command list
    /// still open, or a response not yet read outside idle mode. The next
    /// bytes on such a stream belong to a request nobody is waiting for.
    fn ensure_usable(&mut self) -> Result<()> {
        let interrupted = match &self.transport {
            None => return Err(ClientError::NotConnected.into()),
            Some(transport) => {
                self.mode == Mode::CommandList
                    || (transport.in_flight() && self.mode != Mode::Idle)
            }
        };
        if interrupted {
            warn!(mode = self.mode.as_str(), "previous request interrupted, dropping connection");
            self.disconnect();
            return Err(ClientError::NotConnected.into());
        }
        Ok(())
    }

    /// Guard for commands and queries: a usable transport in active mode.
    async fn check_prerequisites_commands(&mut self) -> Result<()> {
        self.noidle().await?;
        Ok(())
    }

    async fn exchange_ok(&mut self, cmd: &Command) -> Result<()> {
        let transport = self.ensure_connected()?;
        let result = async move {
            transport.send_command(cmd).await?;
            transport.read_ok().await
        }
        .await;
        self.translate(result)
    }

    async fn run_command(&mut self, method: &'static str, cmd: Command) -> CommandOutcome {
        let result = match self.check_prerequisites_commands().await {
            Ok(()) => self.exchange_ok(&cmd).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => CommandOutcome::Completed,
            Err(e) => {
                error!(method, error = %e, "command failed");
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Pass `result` through; a client error that leaves the byte stream in
    /// an unknown state drops the transport. Server ACKs end their response
    /// cleanly and keep the connection usable.
    pub(crate) fn translate<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.is_fatal()
        {
            warn!(error = %e, "dropping connection");
            self.disconnect();
        }
        result
    }
}

/// Consume one command's share of a command-list response, up to its
/// `list_OK`.
async fn read_list_entry(transport: &mut Transport) -> Result<()> {
    loop {
        match transport.read_response().await? {
            Response::ListOk => return Ok(()),
            Response::Ack(ack) => return Err(ServerError::from(ack).into()),
            Response::Pair { .. } => {}
            Response::Ok => {
                return Err(
                    ClientError::UnexpectedResponse("OK before end of command list".into()).into(),
                );
            }
        }
    }
}
