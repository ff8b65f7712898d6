//! Server management - spawning, log streaming and stopping the server under test

use colored::Colorize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{E2eError, E2eResult};

/// Lines buffered between the output readers and the printer
const LOG_CHANNEL_CAPACITY: usize = 256;

/// How long `stop` waits for the printer to flush after the process exits
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Handle to a running server process
pub struct ServerHandle {
    child: Option<Child>,
    pid: Option<u32>,
    pub base_url: String,
    pub port: u16,
    stop_timeout: Duration,
    log_pump: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Spawn `<binary> <port> <instruments>` and start streaming its output.
    ///
    /// stdout and stderr are merged into one `[SERVER]`-prefixed stream that
    /// is printed by a background task until both pipes close.
    pub fn start(config: &ServerConfig, port: u16) -> E2eResult<Self> {
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.binary_path.display(), port);

        let mut child = Command::new(&config.binary_path)
            .arg(port.to_string())
            .arg(&config.instruments_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::ServerStartup(format!(
                    "Failed to spawn {}: {}",
                    config.binary_path.display(),
                    e
                ))
            })?;

        let pid = child.id();
        debug!("Server pid: {:?}", pid);

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        // The printer ends once both readers drop their senders
        drop(tx);
        let log_pump = tokio::spawn(drain_lines(rx, |line| {
            println!("  {} {}", "[SERVER]".dimmed(), line)
        }));

        Ok(Self {
            child: Some(child),
            pid,
            base_url,
            port,
            stop_timeout: config.stop_timeout,
            log_pump: Some(log_pump),
        })
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// OS process id, if the process was spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the server: SIGTERM, wait up to `stop_timeout`, then SIGKILL.
    ///
    /// Calling this again after the process is gone does nothing.
    pub async fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping server (pid: {:?})", self.pid);

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    debug!("SIGTERM to {} failed: {}", pid, e);
                }
            }
        }
        #[cfg(not(unix))]
        let _ = child.start_kill();

        let waited = timeout(self.stop_timeout, child.wait()).await;
        match waited {
            Ok(status) => {
                let status = status?;
                debug!("Server exited with {}", status);
            }
            Err(_) => {
                warn!("Server did not exit within {:?}, killing", self.stop_timeout);
                child.kill().await?;
            }
        }

        if let Some(pump) = self.log_pump.as_mut() {
            if timeout(LOG_DRAIN_TIMEOUT, pump).await.is_err() {
                debug!("Server output still open after exit; detaching log pump");
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // kill_on_drop reaps whatever stop() did not
        if self.child.is_some() {
            warn!("Server handle dropped while running (pid: {:?})", self.pid);
        }
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

/// Hand every merged line to `sink` until all senders are dropped
async fn drain_lines<F>(mut rx: mpsc::Receiver<String>, mut sink: F)
where
    F: FnMut(&str),
{
    while let Some(line) = rx.recv().await {
        sink(line.trim_end());
    }
}
