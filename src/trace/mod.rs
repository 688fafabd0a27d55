use anyhow::{Result, anyhow, bail};
use reqwest::header::HeaderMap;
use std::env;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;

use crate::http::redact::redact_header_value;

const TRACE_DIR_NAME: &str = "escola-chat/traces";

/// Append-only log of one interactive session. Cloning shares the same file.
#[derive(Clone)]
pub struct SessionTrace {
    inner: Arc<TraceInner>,
}

struct TraceInner {
    writer: Mutex<BufWriter<File>>,
    file_path: PathBuf,
    write_failure: OnceLock<String>,
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

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs());
        let file_name = format!("session-{session_id}-{timestamp}.log");
        let file_path = trace_dir.join(&file_name);
        let file = create_trace_file(&file_path)
            .map_err(|err| anyhow!("Failed to create trace file {}: {err}", file_path.display()))?;

        Ok(Self {
            inner: Arc::new(TraceInner {
                writer: Mutex::new(BufWriter::new(file)),
                file_path,
                write_failure: OnceLock::new(),
            }),
        })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn create_in_temp_dir(session_id: &str, trace_dir: &Path) -> Result<Self> {
        Self::create_in_dir(session_id, trace_dir)
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.file_path
    }

    pub fn log_user_turn(&self, text: &str) {
        self.log_lines("chat.user", text);
    }

    pub fn log_assistant_turn(&self, text: &str) {
        self.log_lines("chat.asst", text);
    }

    pub fn log_rule_hit(&self, rule: &str) {
        self.log_single("intent", &format!("rule matched: {rule}"));
    }

    pub fn log_fallback(&self) {
        self.log_single("intent", "no rule matched, asking the model");
    }

    pub fn log_info(&self, text: &str) {
        self.log_lines("sys", text);
    }

    pub fn log_http_request(&self, method: &str, url: &str, headers: &HeaderMap, body: &str) {
        self.log_single("llm.http.in", &format!("{method} {url}"));
        for (name, value) in headers {
            self.log_single(
                "llm.http.in",
                &format!("{}: {}", name.as_str(), redact_header_value(name.as_str(), value)),
            );
        }
        self.log_lines("llm.http.in", body);
    }

    pub fn log_http_response(&self, status: u16, headers: &HeaderMap) {
        self.log_single("llm.http.out", &format!("HTTP {status}"));
        for (name, value) in headers {
            self.log_single(
                "llm.http.out",
                &format!("{}: {}", name.as_str(), redact_header_value(name.as_str(), value)),
            );
        }
    }

    pub fn log_http_error(&self, message: &str) {
        self.log_single("llm.http.err", message);
    }

    pub fn log_stream_text(&self, text: &str) {
        self.log_lines("llm.stream", text);
    }

    pub fn log_stream_skipped(&self, reason: &str) {
        self.log_single("llm.stream", &format!("skipped chunk: {reason}"));
    }

    pub fn log_gateway_error(&self, message: &str) {
        self.log_lines("llm.err", message);
    }

    fn log_lines(&self, kind: &str, text: &str) {
        if text.is_empty() {
            self.log_single(kind, "<empty>");
            return;
        }

        for line in text.lines() {
            self.log_single(kind, line);
        }
    }

    fn log_single(&self, kind: &str, text: &str) {
        let timestamp = current_timestamp();
        self.write_raw(&format!("[{timestamp}] [{:<12}] {text}\n", kind));
    }

    fn write_raw(&self, text: &str) {
        let Ok(mut writer) = self.inner.writer.lock() else {
            self.report_write_failure("failed to acquire trace writer lock");
            return;
        };

        if writer.write_all(text.as_bytes()).is_err() || writer.flush().is_err() {
            self.report_write_failure("failed to write to trace file");
        }
    }

    // The TUI owns the terminal while it runs, so only the first failure is
    // kept and surfaced in the status line.
    fn report_write_failure(&self, message: &str) {
        let _ = self.inner.write_failure.set(message.to_string());
    }

    pub fn write_failure(&self) -> Option<&str> {
        self.inner.write_failure.get().map(String::as_str)
    }
}

impl fmt::Debug for SessionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionTrace").field(&self.file_path()).finish()
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
    let home = dirs::home_dir();
    resolve_trace_dir(xdg_state.as_deref(), home.as_deref())
}

fn resolve_trace_dir(xdg_state_home: Option<&str>, home_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(xdg) = xdg_state_home {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve trace path: XDG_STATE_HOME is set but empty");
        }
        return Ok(PathBuf::from(trimmed).join(TRACE_DIR_NAME));
    }

    let home = home_dir
        .ok_or_else(|| anyhow!("Failed to resolve trace path: HOME directory is unavailable"))?;
    Ok(home.join(".local/state").join(TRACE_DIR_NAME))
}
