use std::time::Duration;

use mpd_rs_protocol::{Command, IdleEvents, ProtocolVersion, Response};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result, ServerError};

/// Longest response line accepted, newline included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// An open TCP connection to the daemon, past the greeting.
///
/// Dropping the transport closes the socket.
pub struct Transport {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    timeout: Duration,
    fd: i32,
    in_flight: bool,
}

impl Transport {
    /// Resolve, connect and read the `OK MPD x.y.z` greeting, all within
    /// one `timeout`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<(Self, ProtocolVersion)> {
        debug!(host, port, "TCP connecting");
        tokio::time::timeout(timeout, Self::open(host, port, timeout))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    async fn open(host: &str, port: u16, timeout: Duration) -> Result<(Self, ProtocolVersion)> {
        let stream = open_stream(host, port).await?;
        stream.set_nodelay(true).ok();
        let fd = raw_fd(&stream);

        let (read_half, write_half) = stream.into_split();
        let mut transport = Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            timeout,
            fd,
            in_flight: false,
        };

        let greeting = transport.read_line_unbounded().await?;
        let version = ProtocolVersion::parse_greeting(&greeting)?;
        debug!(%version, "greeting received");
        Ok((transport, version))
    }

    pub fn fd(&self) -> i32 {
        self.fd
    }

    /// True between a send and the `OK`/`ACK` that ends its response. Still
    /// set outside idle mode means a caller gave up halfway through an
    /// exchange and the stream is out of step.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub async fn send_command(&mut self, cmd: &Command) -> Result<()> {
        trace!(command = cmd.name(), "sending");
        self.send_raw(&cmd.to_bytes()).await
    }

    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.in_flight = true;
        let timeout = self.timeout;
        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(data).await?;
            writer.flush().await
        };
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
            .map_err(ClientError::Io)?;
        Ok(())
    }

    /// Read one line, bounded by the transport timeout.
    pub async fn read_line(&mut self) -> Result<String> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_line_unbounded())
            .await
            .map_err(|_| {
                warn!(?timeout, "read timeout");
                ClientError::Timeout(timeout)
            })?
    }

    /// Read one line with no timeout. Only used while waiting in idle mode,
    /// where silence is the normal case.
    async fn read_line_unbounded(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_line(&mut line)
            .await
            .map_err(ClientError::Io)?;
        if n == 0 {
            return Err(ClientError::Closed.into());
        }
        if line.len() > MAX_LINE_LEN {
            return Err(ClientError::UnexpectedResponse(format!(
                "response line exceeds {MAX_LINE_LEN} bytes"
            ))
            .into());
        }
        Ok(line)
    }

    pub async fn read_response(&mut self) -> Result<Response> {
        let line = self.read_line().await?;
        self.classify(&line)
    }

    fn classify(&mut self, line: &str) -> Result<Response> {
        let response = Response::parse_line(line)?;
        if response.is_terminal() {
            self.in_flight = false;
        }
        Ok(response)
    }

    /// Read `key: value` pairs up to the terminating `OK`.
    ///
    /// An `ACK` terminates the response as a [`ServerError`]; the stream is
    /// left positioned at the next response.
    pub async fn read_pairs(&mut self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        loop {
            match self.read_response().await? {
                Response::Ok => return Ok(pairs),
                Response::Ack(ack) => return Err(ServerError::from(ack).into()),
                Response::Pair { key, value } => pairs.push((key, value)),
                Response::ListOk => {
                    return Err(ClientError::UnexpectedResponse("list_OK outside command list".into()).into());
                }
            }
        }
    }

    /// Read a response that must carry no payload.
    pub async fn read_ok(&mut self) -> Result<()> {
        let pairs = self.read_pairs().await?;
        if let Some((key, _)) = pairs.first() {
            return Err(ClientError::UnexpectedResponse(format!("unexpected pair {key:?} before OK")).into());
        }
        Ok(())
    }

    /// Read the `changed:` lines that answer `idle`, up to `OK`.
    ///
    /// With `wait` the first line is awaited without a timeout, for callers
    /// that park on the socket until the daemon reports a change.
    pub async fn read_idle(&mut self, wait: bool) -> Result<IdleEvents> {
        let mut events = IdleEvents::NONE;
        let mut first = wait;
        loop {
            let line = if first {
                first = false;
                self.read_line_unbounded().await?
            } else {
                self.read_line().await?
            };

            match self.classify(&line)? {
                Response::Ok => return Ok(events),
                Response::Ack(ack) => return Err(ServerError::from(ack).into()),
                Response::Pair { .. } => {
                    if let Some(ev) = IdleEvents::parse_changed(&line) {
                        events |= ev;
                    }
                }
                Response::ListOk => {
                    return Err(ClientError::UnexpectedResponse("list_OK in idle response".into()).into());
                }
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(ClientError::Io)?;
        Ok(())
    }
}

async fn open_stream(host: &str, port: u16) -> Result<TcpStream> {
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| ClientError::Resolve(host.to_owned()))?
        .collect();
    if addrs.is_empty() {
        return Err(ClientError::Resolve(host.to_owned()).into());
    }
    Ok(TcpStream::connect(&addrs[..]).await.map_err(ClientError::Io)?)
}

#[cfg(unix)]
fn raw_fd(stream: &TcpStream) -> i32 {
    use std::os::fd::AsRawFd;
    stream.as_raw_fd()
}

#[cfg(not(unix))]
fn raw_fd(_stream: &TcpStream) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MpdError;
    use mpd_rs_protocol::AckCode;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn setup_pair() -> (Transport, OwnedWriteHalf, OwnedReadHalf) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (client_stream, server_accept) =
            tokio::join!(async { TcpStream::connect(addr).await.unwrap() }, async {
                listener.accept().await.unwrap()
            });

        let (server_read, server_write) = server_accept.0.into_split();
        let fd = raw_fd(&client_stream);
        let (client_read, client_write) = client_stream.into_split();

        let transport = Transport {
            reader: BufReader::new(client_read),
            writer: BufWriter::new(client_write),
            timeout: Duration::from_secs(5),
            fd,
            in_flight: false,
        };

        (transport, server_write, server_read)
    }

    #[tokio::test]
    async fn connect_reads_greeting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"OK MPD 0.23.5\n").await.unwrap();
            // Keep the socket open until the client is done.
            let mut buf = [0u8; 16];
            let _ = stream.read(&mut buf).await;
        });

        let (transport, version) = Transport::connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(version, ProtocolVersion::new(0, 23, 5));
        if cfg!(unix) {
            assert!(transport.fd() >= 0);
        }
    }

    #[tokio::test]
    async fn connect_rejects_bad_greeting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"HTTP/1.1 400 Bad Request\n").await.unwrap();
        });

        let result = Transport::connect("127.0.0.1", port, Duration::from_secs(5)).await;
        assert!(matches!(
            result,
            Err(MpdError::Client(ClientError::Protocol(_)))
        ));
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Transport::connect("127.0.0.1", port, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(MpdError::Client(ClientError::Io(_)))));
    }

    #[tokio::test]
    async fn connect_timeout() {
        // Non-routable address to trigger timeout
        let result = Transport::connect("192.0.2.1", 6600, Duration::from_millis(50)).await;
        assert!(matches!(
            result,
            Err(MpdError::Client(ClientError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn send_command() {
        let (mut transport, _server_write, mut server_read) = setup_pair().await;

        transport
            .send_command(&Command::SeekId {
                song_id: 4,
                position: 10,
            })
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        let n = server_read.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"seekid 4 10\n");
    }

    #[tokio::test]
    async fn read_pairs_until_ok() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;

        server_write
            .write_all(b"volume: 50\nstate: play\nOK\n")
            .await
            .unwrap();

        let pairs = transport.read_pairs().await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ("volume".to_owned(), "50".to_owned()),
                ("state".to_owned(), "play".to_owned())
            ]
        );
    }

    #[tokio::test]
    async fn read_pairs_ack_leaves_stream_usable() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;

        server_write
            .write_all(b"ACK [50@0] {play} No such song\nOK\n")
            .await
            .unwrap();

        let err = transport.read_pairs().await.unwrap_err();
        match err {
            MpdError::Server(e) => {
                assert_eq!(e.code, AckCode::NoExist);
                assert_eq!(e.command, "play");
            }
            other => panic!("expected server error, got {other:?}"),
        }

        transport.read_ok().await.unwrap();
    }

    #[tokio::test]
    async fn read_ok_rejects_payload() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;

        server_write.write_all(b"foo: bar\nOK\n").await.unwrap();
        let err = transport.read_ok().await.unwrap_err();
        assert!(matches!(
            err,
            MpdError::Client(ClientError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn read_idle_collects_mask() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;

        server_write
            .write_all(b"changed: player\nchanged: mixer\nchanged: shiny_new\nOK\n")
            .await
            .unwrap();

        let events = transport.read_idle(false).await.unwrap();
        assert_eq!(events, IdleEvents::PLAYER | IdleEvents::MIXER);
    }

    #[tokio::test]
    async fn greeting_counts_against_connect_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Accept but never greet.
            let mut buf = [0u8; 16];
            let _ = stream.read(&mut buf).await;
        });

        let timeout = Duration::from_millis(200);
        let start = tokio::time::Instant::now();
        let result = Transport::connect("127.0.0.1", port, timeout).await;
        assert!(matches!(
            result,
            Err(MpdError::Client(ClientError::Timeout(_)))
        ));
        assert!(start.elapsed() < timeout * 2);
    }

    #[tokio::test]
    async fn in_flight_until_terminator() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;
        assert!(!transport.in_flight());

        transport.send_command(&Command::Status).await.unwrap();
        assert!(transport.in_flight());

        server_write.write_all(b"state: stop\nOK\n").await.unwrap();
        transport.read_pairs().await.unwrap();
        assert!(!transport.in_flight());

        transport.send_command(&Command::Play).await.unwrap();
        server_write
            .write_all(b"ACK [2@0] {play} Bad song index\n")
            .await
            .unwrap();
        assert!(transport.read_ok().await.is_err());
        assert!(!transport.in_flight());
    }

    #[tokio::test]
    async fn oversized_line_rejected() {
        let (mut transport, mut server_write, _server_read) = setup_pair().await;

        tokio::spawn(async move {
            let mut line = vec![b'a'; MAX_LINE_LEN + 10];
            line.extend_from_slice(b": x\n");
            let _ = server_write.write_all(&line).await;
            // Hold the socket open until the client gives up.
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let err = transport.read_line().await.unwrap_err();
        assert!(matches!(
            err,
            MpdError::Client(ClientError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn read_line_closed() {
        let (mut transport, server_write, server_read) = setup_pair().await;
        drop(server_write);
        drop(server_read);

        let result = transport.read_line().await;
        assert!(matches!(result, Err(MpdError::Client(ClientError::Closed))));
    }

    #[tokio::test]
    async fn read_timeout_triggers() {
        let (mut transport, _server_write, _server_read) = setup_pair().await;
        transport.timeout = Duration::from_millis(50);

        // Server sends nothing; read_line should time out
        let result = transport.read_line().await;
        assert!(matches!(
            result,
            Err(MpdError::Client(ClientError::Timeout(_)))
        ));
    }
}
