//! Point-in-time observations of remote state.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Maximum characters of observed text carried into diagnostics.
const SUMMARY_LIMIT: usize = 512;

/// Captured result of one command client invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code (`-1` when the process was killed by a signal).
    pub exit_code: i32,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Decoded body of an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    /// Decode raw bytes, preferring JSON and falling back to text.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Captured HTTP response from the management API or a route probe.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response headers (lowercased names; repeated headers joined with `; `).
    pub headers: BTreeMap<String, String>,

    /// Response body.
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body))
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, ResponseBody::Text(body.into()))
    }

    /// Attach a header. A repeated name is joined onto the existing value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str("; ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.clone());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// What a single sample observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Output of a command client invocation.
    Command(CommandOutput),

    /// Response from an HTTP call.
    Http(HttpResponse),

    /// The collaborator call itself did not complete (transport error,
    /// collaborator timeout, spawn failure).
    Failure(String),
}

impl Observation {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

impl From<CommandOutput> for Observation {
    fn from(output: CommandOutput) -> Self {
        Self::Command(output)
    }
}

impl From<HttpResponse> for Observation {
    fn from(response: HttpResponse) -> Self {
        Self::Http(response)
    }
}

/// An immutable capture of observed state at one sampling instant.
///
/// Snapshots are stamped by the poller with a 1-based sequence number and the
/// wall-clock time of capture. Command output that is itself JSON (for example
/// a raw API call made through the command client) is decoded once here so
/// structured predicates can use it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    sequence: u32,
    captured_at: DateTime<Utc>,
    observation: Observation,
    decoded: Option<Value>,
}

impl Snapshot {
    /// Create a snapshot of an observation.
    pub fn new(sequence: u32, observation: Observation) -> Self {
        let decoded = match &observation {
            Observation::Command(output) => decode_json_text(&output.stdout),
            Observation::Http(HttpResponse {
                body: ResponseBody::Text(text),
                ..
            }) => decode_json_text(text),
            _ => None,
        };

        Self {
            sequence,
            captured_at: Utc::now(),
            observation,
            decoded,
        }
    }

    /// Sequence number of this sample within its poll.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Wall-clock time the sample was captured.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// The underlying observation.
    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    /// Returns true if the collaborator call failed to complete.
    pub fn is_failure(&self) -> bool {
        matches!(self.observation, Observation::Failure(_))
    }

    /// Command output, if this snapshot came from the command client.
    pub fn command(&self) -> Option<&CommandOutput> {
        match &self.observation {
            Observation::Command(output) => Some(output),
            _ => None,
        }
    }

    /// HTTP response, if this snapshot came from an HTTP call.
    pub fn http(&self) -> Option<&HttpResponse> {
        match &self.observation {
            Observation::Http(response) => Some(response),
            _ => None,
        }
    }

    /// Exit code of a command observation.
    pub fn exit_code(&self) -> Option<i32> {
        self.command().map(|output| output.exit_code)
    }

    /// HTTP status of a response observation.
    pub fn status(&self) -> Option<u16> {
        self.http().map(|response| response.status)
    }

    /// Textual view used by substring predicates.
    ///
    /// For commands this is stdout followed by stderr, since clients report
    /// errors such as `not found` on either stream.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.observation {
            Observation::Command(output) if output.stderr.trim().is_empty() => {
                Cow::Borrowed(output.stdout.as_str())
            }
            Observation::Command(output) if output.stdout.trim().is_empty() => {
                Cow::Borrowed(output.stderr.as_str())
            }
            Observation::Command(output) => Cow::Owned(format!(
                "{}\n{}",
                output.stdout.trim_end(),
                output.stderr
            )),
            Observation::Http(response) => match &response.body {
                ResponseBody::Json(value) => Cow::Owned(value.to_string()),
                ResponseBody::Text(text) => Cow::Borrowed(text.as_str()),
                ResponseBody::Empty => Cow::Borrowed(""),
            },
            Observation::Failure(message) => Cow::Borrowed(message.as_str()),
        }
    }

    /// Structured view of the observation, if any.
    pub fn json(&self) -> Option<&Value> {
        match &self.observation {
            Observation::Http(HttpResponse {
                body: ResponseBody::Json(value),
                ..
            }) => Some(value),
            _ => self.decoded.as_ref(),
        }
    }

    /// Resolve a JSON pointer (`/last_operation/state`) in the structured view.
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.json().and_then(|value| value.pointer(pointer))
    }

    /// Short human-readable summary for diagnostics.
    pub fn summary(&self) -> String {
        let prefix = match &self.observation {
            Observation::Command(output) => format!("exit {}: ", output.exit_code),
            Observation::Http(response) => format!("HTTP {}: ", response.status),
            Observation::Failure(_) => "sampling failed: ".to_string(),
        };
        let text = self.text();
        let trimmed = text.trim();
        if trimmed.chars().count() > SUMMARY_LIMIT {
            let cut: String = trimmed.chars().take(SUMMARY_LIMIT).collect();
            format!("{prefix}{cut}...")
        } else {
            format!("{prefix}{trimmed}")
        }
    }
}

fn decode_json_text(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(trimmed).ok()
    } else {
        None
    }
}
