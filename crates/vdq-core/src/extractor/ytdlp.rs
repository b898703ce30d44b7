//! `yt-dlp` process adapter.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::types::{DownloadOutput, DownloadRequest, ExtractorError, FetchOptions, ProgressEvent, ProgressSink};
use super::Extractor;
use crate::config::ExtractorConfig;
use crate::media::MediaInfo;

/// Prefix of progress lines emitted through `--progress-template`.
const PROGRESS_PREFIX: &str = "VDQ ";
/// Prefix of the line printed once the final file is in place.
const DONE_PREFIX: &str = "VDQ-DONE ";

const PROGRESS_TEMPLATE: &str = "download:VDQ %(progress.downloaded_bytes)s \
    %(progress.total_bytes)s %(progress.total_bytes_estimate)s \
    %(progress.speed)s %(progress.eta)s";
const DONE_TEMPLATE: &str = "after_move:VDQ-DONE %(ext)s";

/// Drives the `yt-dlp` binary as a child process.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    socket_timeout_secs: u32,
    retries: u32,
    cookies_file: Option<PathBuf>,
    player_clients: Vec<String>,
}

impl YtDlp {
    pub fn new(cfg: &ExtractorConfig) -> Self {
        let cookies_file = match &cfg.cookies_file {
            Some(p) if p.exists() => Some(p.clone()),
            Some(p) => {
                tracing::warn!("cookies file configured but not found: {}", p.display());
                None
            }
            None => None,
        };
        Self {
            binary: cfg.binary.clone(),
            socket_timeout_secs: cfg.socket_timeout_secs,
            retries: cfg.retries,
            cookies_file,
            player_clients: cfg.player_clients.clone(),
        }
    }

    /// True when requests carry a cookies file.
    pub fn cookies_enabled(&self) -> bool {
        self.cookies_file.is_some()
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
        ];
        if !self.player_clients.is_empty() {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", self.player_clients.join(",")));
        }
        if let Some(path) = &self.cookies_file {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
        args
    }

    fn metadata_args(&self, url: &str, opts: FetchOptions) -> Vec<String> {
        let mut args = vec!["--dump-single-json".to_string()];
        if opts.fast {
            args.push("--flat-playlist".to_string());
        }
        args.extend(self.common_args());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, req: &DownloadRequest) -> Vec<String> {
        let template = req
            .output_dir
            .join(format!("{}.%(ext)s", req.output_stem))
            .to_string_lossy()
            .into_owned();
        let mut args = vec![
            "-f".to_string(),
            req.selector.clone(),
            "-o".to_string(),
            template,
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            DONE_TEMPLATE.to_string(),
            "--no-simulate".to_string(),
        ];
        args.extend(self.common_args());
        args.push("--".to_string());
        args.push(req.url.clone());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> ExtractorError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractorError::Unavailable(format!("{} not found in PATH", self.binary))
        } else {
            ExtractorError::Unavailable(format!("failed to start {}: {}", self.binary, e))
        }
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn fetch_metadata(
        &self,
        url: &str,
        opts: FetchOptions,
    ) -> Result<MediaInfo, ExtractorError> {
        let args = self.metadata_args(url, opts);
        tracing::debug!(url, fast = opts.fast, "fetching metadata");
        let out = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !out.status.success() {
            return Err(classify_stderr(&String::from_utf8_lossy(&out.stderr)));
        }
        serde_json::from_slice(&out.stdout)
            .map_err(|e| ExtractorError::ExtractionFailed(format!("invalid metadata JSON: {e}")))
    }

    async fn download(
        &self,
        req: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutput, ExtractorError> {
        tokio::fs::create_dir_all(&req.output_dir)
            .await
            .map_err(|e| {
                ExtractorError::Unavailable(format!(
                    "cannot create {}: {e}",
                    req.output_dir.display()
                ))
            })?;

        let args = self.download_args(req);
        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::Unavailable("stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractorError::Unavailable("stderr not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let extension = match read_output(stdout, sink).await {
            Ok(ext) => ext,
            Err(e) => {
                // Nobody drains the pipe any more; stop the child before waiting.
                tracing::warn!("reading {} output failed: {}", self.binary, e);
                if let Err(e) = child.start_kill() {
                    tracing::warn!("could not stop {}: {}", self.binary, e);
                }
                None
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| ExtractorError::Unavailable(format!("wait for {}: {e}", self.binary)))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(classify_stderr(&stderr_text));
        }
        let extension = extension.ok_or_else(|| {
            ExtractorError::ExtractionFailed("extractor did not report the output file".to_string())
        })?;
        Ok(DownloadOutput { extension })
    }
}

/// Feed every stdout line to `sink` until EOF and return the extension from
/// the done line. Lines that are not UTF-8 are decoded lossily, so a stray
/// byte never ends the read early.
async fn read_output<R>(stdout: R, sink: &dyn ProgressSink) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut extension = None;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(extension);
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(ext) = parse_done_line(&line) {
            extension = Some(ext);
        } else if let Some(ev) = parse_progress_line(&line) {
            sink.on_progress(ev);
        }
    }
}

fn parse_num(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse one `--progress-template` line:
/// `VDQ <downloaded> <total> <total_estimate> <speed> <eta>`, with `NA` for
/// unknown fields.
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() != 5 {
        return None;
    }
    let downloaded = parse_num(fields[0])?;
    let total = parse_num(fields[1]).or_else(|| parse_num(fields[2]));
    Some(ProgressEvent {
        downloaded_bytes: downloaded as u64,
        total_bytes: total.map(|t| t as u64),
        speed_bytes_per_sec: parse_num(fields[3]),
        eta_secs: parse_num(fields[4]).map(|e| e as u64),
    })
}

pub(crate) fn parse_done_line(line: &str) -> Option<String> {
    let ext = line.trim().strip_prefix(DONE_PREFIX)?.trim();
    if ext.is_empty() || ext == "NA" {
        None
    } else {
        Some(ext.to_string())
    }
}

/// Last `ERROR:` line of the extractor's stderr, else its last non-empty line.
fn error_summary(stderr: &str) -> String {
    let lines = || stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .filter(|l| l.starts_with("ERROR:"))
        .last()
        .or_else(|| lines().last())
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "extractor exited with an error".to_string())
}

/// Map extractor stderr to a structured error.
pub(crate) fn classify_stderr(stderr: &str) -> ExtractorError {
    let summary = error_summary(stderr);
    let lower = stderr.to_lowercase();
    if stderr.contains("Requested format is not available") {
        ExtractorError::FormatUnavailable(summary)
    } else if lower.contains("sign in to confirm you're not a bot") || lower.contains("cookies") {
        ExtractorError::AuthChallenge(summary)
    } else {
        ExtractorError::ExtractionFailed(summary)
    }
}
