//! HTTP helpers shared by the REST clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{Result, VaiaeError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Build the HTTP client used for every management call.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(VaiaeError::from)
}

/// Headers for a Bearer-token JSON API.
pub fn bearer_headers(access_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Payload of one line of a streamed response.
///
/// Accepts SSE `data:` lines as well as bare JSON lines. Returns `None` for
/// blank lines, SSE comments and `[DONE]`.
pub fn parse_stream_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Splits a byte stream into lines.
///
/// Bytes are held until a `\n` arrives, so a UTF-8 sequence split across
/// network chunks is decoded whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos])?);
        }
        Ok(lines)
    }

    /// The trailing line left when the stream ends without a newline.
    pub fn finish(&mut self) -> Result<Option<String>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest).map(Some)
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| VaiaeError::Stream(format!("response line is not valid UTF-8: {e}")))
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> VaiaeError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => VaiaeError::Authentication(message),
        404 => VaiaeError::ResourceNotFound(message),
        _ => VaiaeError::api(status, message),
    }
}

/// Check a response status, turning failures into errors.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body_text = resp.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &body_text))
}

// Google APIs wrap failures as {"error": {"code", "message", "status"}}.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
}
