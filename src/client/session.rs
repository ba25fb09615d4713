//! Chat Client Session
//!
//! Connects to the room with a short timeout, then runs a loop multiplexing
//! two sources with the same readiness-wait discipline as the server: the
//! local input stream and the server socket. Incoming broadcasts are
//! rendered to the output stream followed by the prompt; local lines are
//! framed and sent. The input and output streams are parameters so the
//! session can run against in-memory pipes as easily as stdin/stdout.

use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::protocol::codec;
use crate::shutdown::ShutdownSignal;
use crate::Result;

const PROMPT: &str = "<You> ";

/// One readiness-wait outcome
enum Step {
    Stop,
    Idle,
    SocketReady,
    Line(Option<String>),
}

/// The chat client session
pub struct ChatClient {
    config: ClientConfig,
    stream: TcpStream,
    shutdown: ShutdownSignal,
}

impl ChatClient {
    /// Connect to the configured server.
    ///
    /// The attempt is bounded by the connect timeout. Failure is fatal for
    /// the session; there is no retry.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let server_addr = config.server_addr;
        let stream = time::timeout(config.connect_timeout, TcpStream::connect(server_addr))
            .await
            .map_err(|_| anyhow!("Connection to {} timed out", server_addr))?
            .with_context(|| format!("Failed to connect to {}", server_addr))?;

        info!("Connected to {}", server_addr);
        Ok(Self {
            config,
            stream,
            shutdown: ShutdownSignal::new(),
        })
    }

    /// A handle that stops the session loop when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Request the session to stop. Safe to call more than once; the socket
    /// is dropped when the session ends.
    pub fn stop(&self) {
        self.shutdown.stop();
    }

    /// The address of the connected server
    pub fn server_addr(&self) -> SocketAddr {
        self.config.server_addr
    }

    /// Run the session until stopped, disconnected, or out of input.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        write_all(
            &mut output,
            "Connected to remote host. Start sending messages.\n",
        )
        .await?;
        write_all(&mut output, PROMPT).await?;

        while self.shutdown.is_running() {
            let step = tokio::select! {
                _ = self.shutdown.stopped() => Step::Stop,
                _ = time::sleep(self.config.poll_timeout) => Step::Idle,
                _ = self.stream.readable() => Step::SocketReady,
                line = lines.next_line() => {
                    Step::Line(line.context("Failed to read local input")?)
                }
            };

            match step {
                Step::Stop => break,
                Step::Idle => continue,
                Step::SocketReady => {
                    match codec::read_frame(&mut self.stream, self.config.recv_buffer_size).await {
                        Ok(Some(payload)) => {
                            output.write_all(&payload).await?;
                            write_all(&mut output, PROMPT).await?;
                        }
                        Ok(None) | Err(_) => {
                            write_all(&mut output, "\nDisconnected from the server.\n").await?;
                            break;
                        }
                    }
                }
                Step::Line(Some(line)) => {
                    // The line reader strips the newline; the room's relay
                    // format expects it on the wire
                    let message = format!("{}\n", line);
                    if let Err(e) = codec::write_frame(&mut self.stream, message.as_bytes()).await {
                        warn!("Send failed: {}", e);
                        write_all(&mut output, "\nDisconnected from the server.\n").await?;
                        break;
                    }
                    write_all(&mut output, PROMPT).await?;
                }
                Step::Line(None) => {
                    // Local input closed
                    break;
                }
            }
        }

        self.stop();
        Ok(())
    }
}

async fn write_all<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .await
        .context("Failed to write to output stream")?;
    output.flush().await.context("Failed to flush output stream")?;
    Ok(())
}
