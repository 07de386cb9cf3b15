//! Per-session trace file written with `--trace`.
//!
//! Each [`TraceEvent`] becomes one or more lines of the form
//! `[<utc timestamp>] [<kind>] <text>`. The lines of one event are written
//! under a single lock so concurrent writers never interleave them.

use anyhow::{Result, anyhow, bail};
use reqwest::header::HeaderMap;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

use crate::http::{ERROR_BODY_LIMIT, Exchange};
use crate::tools::Tool;

const TRACE_DIR_NAME: &str = "gbit-studio/traces";

/// How one orchestrator attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome<'a> {
    Succeeded,
    Retrying { cause: &'a str, delay: Duration },
    GaveUp { cause: &'a str },
}

#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    ToolInput {
        tool: Tool,
        text: &'a str,
    },
    ToolOutput {
        tool: Tool,
        text: &'a str,
    },
    Failure {
        text: &'a str,
    },
    HttpRequest {
        exchange: Exchange,
        method: &'a str,
        url: &'a str,
        headers: &'a HeaderMap,
        body: &'a str,
    },
    HttpResponse {
        exchange: Exchange,
        status: u16,
        headers: &'a HeaderMap,
        body: &'a str,
        truncated: bool,
    },
    HttpError {
        exchange: Exchange,
        message: &'a str,
    },
    /// `attempt` is 1-based.
    Attempt {
        attempt: u32,
        max_attempts: u32,
        outcome: AttemptOutcome<'a>,
    },
}

impl TraceEvent<'_> {
    fn entries(&self) -> Vec<(String, String)> {
        match *self {
            Self::ToolInput { tool, text } => text_entries(&format!("{}.in", tool.name()), text),
            Self::ToolOutput { tool, text } => text_entries(&format!("{}.out", tool.name()), text),
            Self::Failure { text } => text_entries("error", text),
            Self::HttpRequest {
                exchange,
                method,
                url,
                headers,
                body,
            } => {
                let mut entries = vec![entry("http.req", format!("{exchange} {method} {url}"))];
                entries.extend(header_entries("http.req", headers));
                entries.extend(text_entries("http.req", body));
                entries
            }
            Self::HttpResponse {
                exchange,
                status,
                headers,
                body,
                truncated,
            } => {
                let mut entries = vec![entry("http.res", format!("{exchange} HTTP {status}"))];
                entries.extend(header_entries("http.res", headers));
                entries.extend(text_entries("http.res", body));
                if truncated {
                    entries.push(entry(
                        "http.res",
                        format!("<body cut at {ERROR_BODY_LIMIT} bytes>"),
                    ));
                }
                entries
            }
            Self::HttpError { exchange, message } => {
                vec![entry("http.err", format!("{exchange} {message}"))]
            }
            Self::Attempt {
                attempt,
                max_attempts,
                outcome,
            } => {
                let text = match outcome {
                    AttemptOutcome::Succeeded => format!("{attempt}/{max_attempts} succeeded"),
                    AttemptOutcome::Retrying { cause, delay } => format!(
                        "{attempt}/{max_attempts} failed, retrying in {}ms: {cause}",
                        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
                    ),
                    AttemptOutcome::GaveUp { cause } => {
                        format!("{attempt}/{max_attempts} failed, giving up: {cause}")
                    }
                };
                vec![entry("attempt", text)]
            }
        }
    }
}

fn entry(kind: &str, text: String) -> (String, String) {
    (kind.to_string(), text)
}

fn text_entries(kind: &str, text: &str) -> Vec<(String, String)> {
    if text.is_empty() {
        return vec![entry(kind, "<empty>".to_string())];
    }
    text.lines().map(|line| entry(kind, line.to_string())).collect()
}

fn header_entries<'h>(
    kind: &'h str,
    headers: &'h HeaderMap,
) -> impl Iterator<Item = (String, String)> + 'h {
    headers.iter().map(move |(name, value)| {
        let value = value.to_str().unwrap_or("<non-utf8>");
        entry(kind, format!("{}: {value}", name.as_str()))
    })
}

/// Append-only log of one CLI session. Secrets are written unredacted, so
/// the file is owner-only.
#[derive(Clone)]
pub struct SessionTrace {
    inner: Arc<TraceInner>,
}

struct TraceInner {
    writer: Mutex<BufWriter<File>>,
    file_path: PathBuf,
    write_failed: AtomicBool,
}

impl SessionTrace {
    pub fn create(session_id: &str) -> Result<Self> {
        let trace_dir = resolve_trace_dir_from_env()?;
        Self::create_in_dir(session_id, &trace_dir)
    }

    fn create_in_dir(session_id: &str, trace_dir: &Path) -> Result<Self> {
        fs::create_dir_all(trace_dir).map_err(|err| {
            anyhow!(
                "Failed to create trace directory {}: {err}",
                trace_dir.display()
            )
        })?;

        let started = OffsetDateTime::now_utc();
        let file_path = trace_dir.join(format!(
            "session-{session_id}-{}.log",
            started.unix_timestamp()
        ));
        let file = create_trace_file(&file_path)
            .map_err(|err| anyhow!("Failed to create trace file {}: {err}", file_path.display()))?;

        let trace = Self {
            inner: Arc::new(TraceInner {
                writer: Mutex::new(BufWriter::new(file)),
                file_path,
                write_failed: AtomicBool::new(false),
            }),
        };
        trace.write_entries(&[entry(
            "session",
            format!(
                "gbit-studio {} session {session_id}",
                env!("CARGO_PKG_VERSION")
            ),
        )]);
        Ok(trace)
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn create_in_temp_dir(session_id: &str, trace_dir: &Path) -> Result<Self> {
        Self::create_in_dir(session_id, trace_dir)
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.file_path
    }

    pub fn record(&self, event: TraceEvent<'_>) {
        self.write_entries(&event.entries());
    }

    fn write_entries(&self, entries: &[(String, String)]) {
        let timestamp = current_timestamp();
        let text: String = entries
            .iter()
            .map(|(kind, line)| format!("[{timestamp}] [{kind:<11}] {line}\n"))
            .collect();

        let Ok(mut writer) = self.inner.writer.lock() else {
            self.report_write_failure("failed to acquire trace writer lock");
            return;
        };
        if writer.write_all(text.as_bytes()).is_err() || writer.flush().is_err() {
            self.report_write_failure("failed to write to trace file");
        }
    }

    fn report_write_failure(&self, message: &str) {
        if !self.inner.write_failed.swap(true, Ordering::Relaxed) {
            tracing::warn!(path = %self.inner.file_path.display(), "trace disabled: {message}");
        }
    }
}

#[cfg(unix)]
fn create_trace_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_trace_file(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

fn current_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}

pub fn resolve_trace_dir_from_env() -> Result<PathBuf> {
    let xdg_state = env::var("XDG_STATE_HOME").ok();
    resolve_trace_dir(xdg_state.as_deref(), dirs::home_dir().as_deref())
}

fn resolve_trace_dir(xdg_state_home: Option<&str>, home_dir: Option<&Path>) -> Result<PathBuf> {
    match xdg_state_home.map(str::trim) {
        Some("") => bail!("Failed to resolve trace path: XDG_STATE_HOME is set but empty"),
        Some(state) => Ok(PathBuf::from(state).join(TRACE_DIR_NAME)),
        None => home_dir
            .map(|home| home.join(".local/state").join(TRACE_DIR_NAME))
            .ok_or_else(|| anyhow!("Failed to resolve trace path: HOME directory is unavailable")),
    }
}
