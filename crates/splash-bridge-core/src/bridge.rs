use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::task::JoinHandle;
use tracing::{Level, debug, error};

use crate::error::SplashError;
use crate::protocol::{GUI_TAG, LINE_DELIMITER, decode_line};
use crate::queue::StatusQueue;
use crate::sink::LogSlot;
use crate::supervisor::{SessionLifetime, SessionStdio};

/// Counters reported by the outbound loop when it stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutboundStats {
    pub cycles: u64,
    pub messages: u64,
    pub flushes: u64,
}

/// Drain `queue` into `writer` every `interval` until the session exits.
///
/// Each cycle writes every queued message as one delimited line and flushes once if
/// anything was written. Any write error ends the loop.
pub async fn run_outbound<W>(
    queue: &StatusQueue,
    writer: W,
    lifetime: &SessionLifetime,
    interval: Duration,
) -> Result<OutboundStats, SplashError>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut stats = OutboundStats::default();

    while !lifetime.has_exited() {
        stats.cycles += 1;

        let batch = queue.drain();
        if !batch.is_empty() {
            let written: std::io::Result<()> = async {
                for message in &batch {
                    writer.write_all(message.as_str().as_bytes()).await?;
                    writer.write_all(LINE_DELIMITER).await?;
                }
                writer.flush().await
            }
            .await;
            written.map_err(SplashError::BridgeIo)?;
            stats.messages += batch.len() as u64;
            stats.flushes += 1;
        }

        tokio::time::sleep(interval).await;
    }

    Ok(stats)
}

/// Forward every line from `reader` to the log at `level`, tagged as GUI output.
/// Returns the number of lines relayed once the stream ends.
pub async fn relay_lines<R>(reader: R, level: Level, log: &LogSlot) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut relayed = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(relayed);
        }
        let line = String::from_utf8_lossy(&buf);
        log.log(level, &format!("{GUI_TAG}{}", decode_line(&line)));
        relayed += 1;
    }
}

/// Outbound loop plus the two inbound relays of one display session
pub struct CommunicationBridge {
    running: Arc<AtomicBool>,
    outbound: JoinHandle<()>,
    stdout_relay: JoinHandle<()>,
    stderr_relay: JoinHandle<()>,
}

impl CommunicationBridge {
    /// Spawn all three tasks on the current runtime. `on_stop` runs once the outbound
    /// loop has stopped, for whatever reason.
    pub fn start<F>(
        stdio: SessionStdio,
        lifetime: Arc<SessionLifetime>,
        queue: Arc<StatusQueue>,
        log: Arc<LogSlot>,
        interval: Duration,
        on_stop: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let SessionStdio {
            stdin,
            stdout,
            stderr,
        } = stdio;

        let stdout_relay = tokio::spawn({
            let log = log.clone();
            async move {
                if let Err(e) = relay_lines(stdout, Level::DEBUG, &log).await {
                    debug!(error = %e, "GUI output relay stopped");
                }
            }
        });

        let stderr_relay = tokio::spawn({
            let log = log.clone();
            async move {
                if let Err(e) = relay_lines(stderr, Level::ERROR, &log).await {
                    debug!(error = %e, "GUI error relay stopped");
                }
            }
        });

        let running = Arc::new(AtomicBool::new(true));
        let outbound = tokio::spawn({
            let running = running.clone();
            async move {
                debug!("Connected to the GUI process");
                match run_outbound(&queue, stdin, &lifetime, interval).await {
                    Ok(stats) => {
                        debug!(
                            cycles = stats.cycles,
                            messages = stats.messages,
                            flushes = stats.flushes,
                            "Communication loop finished"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Crash in communication loop, aborting");
                    }
                }
                running.store(false, Ordering::Release);
                on_stop();
            }
        });

        Self {
            running,
            outbound,
            stdout_relay,
            stderr_relay,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True once the outbound loop and both relays have ended
    pub fn is_finished(&self) -> bool {
        self.outbound.is_finished()
            && self.stdout_relay.is_finished()
            && self.stderr_relay.is_finished()
    }
}
