use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mpd_rs_protocol::{Ack, AckCode, Command, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;

pub const PLAYING_STATUS: &str = "volume: 80\nrepeat: 0\nrandom: 1\nsingle: 0\nconsume: 0\n\
playlist: 4\nplaylistlength: 10\nstate: play\nsong: 2\nsongid: 7\ntime: 30:120\n\
elapsed: 30.000\nbitrate: 320\nduration: 120.000\naudio: 44100:16:2\n";

pub const CURRENT_SONG: &str = "file: music/aphex/xtal.flac\nArtist: Aphex Twin\n\
Album: Selected Ambient Works 85-92\nTitle: Xtal\nTime: 294\nduration: 293.640\nPos: 2\nId: 7\n";

pub struct MockConfig {
    pub greeting: String,
    pub password: Option<String>,
    pub status: String,
    pub current_song: String,
    /// Commands (by wire name) answered with an ACK instead of OK.
    pub failures: HashMap<&'static str, (AckCode, &'static str)>,
    /// Subsystems reported when the client cancels idle with `noidle`.
    pub idle_events: Vec<&'static str>,
    /// Changes pushed unprompted, one entry per `idle` received.
    pub pushed_events: Vec<Vec<&'static str>>,
    /// Number of initial connections dropped before the greeting.
    pub refuse_first: usize,
    pub max_connections: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            greeting: "OK MPD 0.23.5".to_owned(),
            password: None,
            status: PLAYING_STATUS.to_owned(),
            current_song: CURRENT_SONG.to_owned(),
            failures: HashMap::new(),
            idle_events: Vec::new(),
            pushed_events: Vec::new(),
            refuse_first: 0,
            max_connections: 8,
        }
    }
}

#[derive(Default)]
struct Shared {
    status: String,
    received: Vec<String>,
    accepted: usize,
}

pub struct MockServer {
    addr: SocketAddr,
    shared: Arc<Mutex<Shared>>,
}

impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Mutex::new(Shared {
            status: config.status.clone(),
            ..Shared::default()
        }));

        let task_shared = shared.clone();
        tokio::spawn(async move {
            Self::handle_connections(listener, config, task_shared).await;
        });

        Self { addr, shared }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every request line received so far, across connections.
    pub fn received(&self) -> Vec<String> {
        self.shared.lock().unwrap().received.clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.received()
            .iter()
            .filter(|l| l.split_whitespace().next() == Some(command))
            .count()
    }

    pub fn accepted(&self) -> usize {
        self.shared.lock().unwrap().accepted
    }

    pub fn set_status(&self, status: &str) {
        self.shared.lock().unwrap().status = status.to_owned();
    }

    async fn handle_connections(
        listener: TcpListener,
        config: MockConfig,
        shared: Arc<Mutex<Shared>>,
    ) {
        let config = Arc::new(config);
        let pushed = Arc::new(Mutex::new(VecDeque::from(config.pushed_events.clone())));

        for index in 0..config.max_connections {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            shared.lock().unwrap().accepted += 1;

            if index < config.refuse_first {
                drop(stream);
                continue;
            }

            let config = config.clone();
            let shared = shared.clone();
            let pushed = pushed.clone();
            tokio::spawn(async move {
                let (read_half, write_half) = stream.into_split();
                let session = Session {
                    config,
                    shared,
                    pushed,
                    writer: write_half,
                    authenticated: false,
                };
                session.run(BufReader::new(read_half)).await;
            });
        }
    }
}

struct Session {
    config: Arc<MockConfig>,
    shared: Arc<Mutex<Shared>>,
    pushed: Arc<Mutex<VecDeque<Vec<&'static str>>>>,
    writer: OwnedWriteHalf,
    authenticated: bool,
}

impl Session {
    async fn run(mut self, mut reader: BufReader<tokio::net::tcp::OwnedReadHalf>) {
        let greeting = format!("{}\n", self.config.greeting);
        if self.write(greeting.as_bytes()).await.is_err() {
            return;
        }

        let mut idle = false;
        let mut list: Option<Vec<Command>> = None;
        let mut line = String::new();

        loop {
            line.clear();
            let n = match reader.read_line(&mut line).await {
                Ok(n) => n,
                Err(_) => break,
            };
            if n == 0 {
                break;
            }
            let trimmed = line.trim_end().to_owned();
            self.shared.lock().unwrap().received.push(trimmed.clone());

            let Ok(cmd) = Command::parse(&trimmed) else {
                let ack = ack(AckCode::Unknown, 0, "", "unknown command");
                if self.write(&ack).await.is_err() {
                    break;
                }
                continue;
            };

            if idle {
                // The daemon drops clients that send anything but noidle.
                if cmd != Command::NoIdle {
                    break;
                }
                idle = false;
                let mut out = String::new();
                for ev in &self.config.idle_events {
                    out.push_str(&format!("changed: {ev}\n"));
                }
                out.push_str("OK\n");
                if self.write(out.as_bytes()).await.is_err() {
                    break;
                }
                continue;
            }

            if let Some(batch) = list.as_mut() {
                if cmd == Command::CommandListEnd {
                    let batch = list.take().unwrap_or_default();
                    let out = self.run_list(&batch);
                    if self.write(&out).await.is_err() {
                        break;
                    }
                } else {
                    batch.push(cmd);
                }
                continue;
            }

            match cmd {
                Command::Idle => {
                    let push = self.pushed.lock().unwrap().pop_front();
                    match push {
                        Some(events) => {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            let mut out = String::new();
                            for ev in events {
                                out.push_str(&format!("changed: {ev}\n"));
                            }
                            out.push_str("OK\n");
                            if self.write(out.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                        None => idle = true,
                    }
                }
                // noidle outside idle is ignored by the daemon.
                Command::NoIdle => {}
                Command::CommandListOkBegin => list = Some(Vec::new()),
                Command::Close => break,
                other => {
                    let out = self.execute(&other, 0).unwrap_or_else(|e| e);
                    if self.write(&out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns the payload plus `OK`, or an ACK line.
    fn execute(&mut self, cmd: &Command, index: u32) -> Result<Vec<u8>, Vec<u8>> {
        let name = cmd.name();

        if let Command::Password { password } = cmd {
            return if self.config.password.as_deref() == Some(password.as_str()) {
                self.authenticated = true;
                Ok(b"OK\n".to_vec())
            } else {
                Err(ack(AckCode::Password, index, name, "incorrect password"))
            };
        }

        if self.config.password.is_some() && !self.authenticated && *cmd != Command::Ping {
            return Err(ack(
                AckCode::Permission,
                index,
                name,
                &format!("you don't have permission for \"{name}\""),
            ));
        }

        if let Some((code, message)) = self.config.failures.get(name) {
            return Err(ack(*code, index, name, message));
        }

        let mut out = match cmd {
            Command::Status => self.shared.lock().unwrap().status.clone().into_bytes(),
            Command::CurrentSong => self.config.current_song.clone().into_bytes(),
            _ => Vec::new(),
        };
        out.extend_from_slice(b"OK\n");
        Ok(out)
    }

    fn run_list(&mut self, batch: &[Command]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, cmd) in batch.iter().enumerate() {
            match self.execute(cmd, i as u32) {
                Ok(mut payload) => {
                    // Strip the per-command OK; list_OK separates results.
                    payload.truncate(payload.len() - 3);
                    out.extend_from_slice(&payload);
                    out.extend_from_slice(b"list_OK\n");
                }
                Err(ack) => {
                    out.extend_from_slice(&ack);
                    return out;
                }
            }
        }
        out.extend_from_slice(b"OK\n");
        out
    }

    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }
}

fn ack(code: AckCode, index: u32, command: &str, message: &str) -> Vec<u8> {
    Response::Ack(Ack {
        code,
        command_index: index,
        command: command.to_owned(),
        message: message.to_owned(),
    })
    .to_bytes()
}
