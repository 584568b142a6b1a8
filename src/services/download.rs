use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::metrics::RunMetrics;
use crate::models::{Config, DestinationIndex};
use crate::replicate;
use crate::services::classify::{DownloadEvent, LineClassifier, PathStyle};
use camino::{Utf8Path, Utf8PathBuf};

/// Download events buffered between the stdout reader and the relocation
/// loop. SteamCMD blocks once its stdout pipe fills, so the reader must keep
/// draining while a copy is in flight; the buffer absorbs bursts of small
/// items landing during one large copy.
const EVENT_BUFFER: usize = 64;

/// Outcome of a completed download run.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// Workshop items relocated to their destinations
    pub relocated: usize,
    /// Bytes downloaded, as reported by SteamCMD
    pub bytes: u64,
    /// Wall-clock time for the whole run
    pub duration: Duration,
}

/// Errors that can end a download run
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("failed to launch SteamCMD at {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("steam login failed for user {username}")]
    LoginFailed { username: String },

    #[error("no destination configured for app {app_id} (workshop item {mod_id})")]
    DestinationNotFound { app_id: String, mod_id: String },

    #[error("failed to copy {source} to {destination}: {cause}")]
    Replication {
        source: String,
        destination: Utf8PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("download run timed out after {0:?}")]
    Timeout(Duration),

    #[error("SteamCMD exited abnormally: {status}")]
    ProcessExit { status: ExitStatus },

    #[error("failed to wait for SteamCMD: {0}")]
    Wait(#[from] std::io::Error),
}

/// Service running one end-to-end download operation against SteamCMD.
///
/// The whole download script is handed to SteamCMD on the argument vector
/// (login, one `workshop_download_item` per configured mod, quit), so stdin
/// stays closed and stdout is only scanned, never answered. One task drains
/// stdout through the [`LineClassifier`], one drains stderr for diagnostics,
/// and the orchestrating task relocates each completed download while output
/// consumption continues. A single deadline covers launch through exit;
/// expiry kills the process.
pub struct DownloadService {
    classifier: LineClassifier,
}

impl DownloadService {
    pub fn new() -> Self {
        Self::with_style(PathStyle::host_default())
    }

    /// Use an explicit path style for parsing SteamCMD's printed paths, e.g.
    /// when driving a Windows SteamCMD from another host.
    pub fn with_style(style: PathStyle) -> Self {
        Self {
            classifier: LineClassifier::new(style),
        }
    }

    /// Run one download operation and return its single outcome.
    ///
    /// Never retries; the caller decides whether a failed run is worth
    /// re-running. Partial progress is not rolled back; already relocated
    /// mods stay in place and a re-run simply overwrites them.
    pub async fn run(&self, cfg: &Config) -> Result<DownloadReport, DownloadError> {
        let started = Instant::now();
        let deadline = Duration::from_secs(cfg.steam.timeout_secs);
        let index = DestinationIndex::build(&cfg.apps);
        let metrics = RunMetrics::new();

        let args = cfg.steam_args();
        tracing::info!(
            cmd = %cfg.steam.cmd,
            login = %cfg.steam.login,
            items = cfg.item_count(),
            ?deadline,
            "starting SteamCMD"
        );

        let mut child = Command::new(&cfg.steam.cmd)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DownloadError::Launch {
                command: cfg.steam.cmd.clone(),
                source,
            })?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(drain_stdout(stdout, self.classifier.clone(), events_tx));
        tokio::spawn(drain_stderr(stderr));

        let fail_fast = cfg.steam.fail_fast;
        let username = cfg.steam.login.username.as_str();

        let supervised = self.supervise(&mut child, events_rx, &index, &metrics, fail_fast, username);
        // Bind before matching so the supervise future (and its borrow of the
        // child) is dropped before the deadline path kills the process.
        let outcome = timeout(deadline, supervised).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(?deadline, "SteamCMD run deadline expired, killing process");
                if let Err(err) = child.kill().await {
                    tracing::warn!(%err, "failed to kill timed out SteamCMD process");
                }
                Err(DownloadError::Timeout(deadline))
            }
        };

        metrics.log_summary();

        match result {
            Ok(()) => Ok(DownloadReport {
                relocated: metrics.relocated(),
                bytes: metrics.bytes(),
                duration: started.elapsed(),
            }),
            Err(err) => {
                // Under fail-fast a relocation error surfaces while SteamCMD
                // is still running; reap it before reporting.
                if fail_fast
                    && matches!(
                        err,
                        DownloadError::DestinationNotFound { .. } | DownloadError::Replication { .. }
                    )
                {
                    if let Err(kill_err) = child.kill().await {
                        tracing::warn!(%kill_err, "failed to kill SteamCMD after relocation failure");
                    }
                }
                Err(err)
            }
        }
    }

    /// Consume download events and await process exit, whichever order they
    /// arrive in. Events are handled strictly in the order SteamCMD reported
    /// them; events buffered when the process exits are still relocated.
    async fn supervise(
        &self,
        child: &mut Child,
        mut events: mpsc::Receiver<DownloadEvent>,
        index: &DestinationIndex,
        metrics: &RunMetrics,
        fail_fast: bool,
        username: &str,
    ) -> Result<(), DownloadError> {
        // Once a relocation fails under fail_fast = false, the error is
        // parked here while output keeps draining until SteamCMD exits.
        let mut halted: Option<DownloadError> = None;

        let early_status = loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.observe(event, index, metrics, fail_fast, &mut halted).await?,
                    // stdout closed; the process is exiting
                    None => break None,
                },
                status = child.wait() => break Some(status?),
            }
        };

        let status = match early_status {
            Some(status) => {
                // Process exited first: relocate whatever is still buffered.
                while let Some(event) = events.recv().await {
                    self.observe(event, index, metrics, fail_fast, &mut halted).await?;
                }
                status
            }
            None => child.wait().await?,
        };

        if let Some(err) = halted {
            return Err(err);
        }

        tracing::debug!(%status, "SteamCMD exited");
        if status.success() {
            return Ok(());
        }
        if metrics.relocated() == 0 {
            // SteamCMD exits non-zero without downloading anything when the
            // login is rejected.
            return Err(DownloadError::LoginFailed {
                username: username.to_string(),
            });
        }
        Err(DownloadError::ProcessExit { status })
    }

    /// Handle one download event under the configured failure policy.
    async fn observe(
        &self,
        event: DownloadEvent,
        index: &DestinationIndex,
        metrics: &RunMetrics,
        fail_fast: bool,
        halted: &mut Option<DownloadError>,
    ) -> Result<(), DownloadError> {
        if halted.is_some() {
            metrics.record_discarded();
            tracing::warn!(
                app_id = %event.app_id,
                mod_id = %event.mod_id,
                "skipping relocation after earlier failure"
            );
            return Ok(());
        }

        match self.relocate(&event, index, metrics).await {
            Ok(()) => Ok(()),
            Err(err) if fail_fast => Err(err),
            Err(err) => {
                tracing::error!(%err, "relocation failed, awaiting SteamCMD exit");
                *halted = Some(err);
                Ok(())
            }
        }
    }

    /// Copy a completed download's `mods` directory into its destination.
    async fn relocate(
        &self,
        event: &DownloadEvent,
        index: &DestinationIndex,
        metrics: &RunMetrics,
    ) -> Result<(), DownloadError> {
        let dest = index
            .lookup(&event.app_id)
            .ok_or_else(|| DownloadError::DestinationNotFound {
                app_id: event.app_id.clone(),
                mod_id: event.mod_id.clone(),
            })?;

        let source = self.classifier.style().join(&event.path, "mods");
        tracing::info!(
            app = %dest.app_name,
            mod_id = %event.mod_id,
            from = %source,
            to = %dest.path,
            "relocating downloaded mod"
        );

        let copy_started = Instant::now();
        let copy_src = source.clone();
        let copy_dst = dest.path.clone();
        let copied = tokio::task::spawn_blocking(move || {
            replicate::copy_tree(Utf8Path::new(&copy_src), &copy_dst)
        })
        .await
        .unwrap_or_else(|join_err| Err(std::io::Error::other(join_err)));

        copied.map_err(|cause| DownloadError::Replication {
            source,
            destination: dest.path.clone(),
            cause,
        })?;

        metrics.record_relocated(event.bytes, copy_started.elapsed());
        Ok(())
    }
}

impl Default for DownloadService {
    fn default() -> Self {
        Self::new()
    }
}

/// Read SteamCMD stdout line by line, forwarding classified download events.
/// Lines are consumed in emission order; everything is logged at debug level.
async fn drain_stdout(
    stdout: ChildStdout,
    classifier: LineClassifier,
    events: mpsc::Sender<DownloadEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(line = %line, "steamcmd output");
                if let Some(event) = classifier.classify(&line) {
                    if events.send(event).await.is_err() {
                        // Receiver gone: the run already has its outcome.
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                // A broken pipe here races with process exit and carries no
                // signal of its own once the exit path owns the outcome.
                tracing::debug!(%err, "steamcmd stdout closed");
                break;
            }
        }
    }
}

/// Drain SteamCMD stderr for diagnostics. Never parsed for control decisions.
async fn drain_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(line = %line, "steamcmd error output");
    }
}
