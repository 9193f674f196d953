//! `$batch` response parser
//!
//! Accepts the multipart envelope (optionally with nested changeset
//! responses) and the OData JSON batch envelope `{"responses":[...]}`.
//! A response that cannot be read as either is a protocol error, never an
//! empty result.

use super::builder::RequestPart;
use crate::api::error::{ApiError, ApiResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Status reported in parse errors; the envelope itself was accepted
const ENVELOPE_STATUS: u16 = 200;

#[derive(Debug, Clone, Copy)]
enum ParsingState {
    MultipartHeaders,
    HttpStatus,
    HttpHeaders,
    Body,
}

/// Parsed batch response
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    pub items: Vec<BatchResponseItem>,
    /// Last part status that is >= 300, else 200
    pub status: u16,
}

/// One part of a batch response
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponseItem {
    pub content_id: Option<u32>,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// Decoded outcome of one part
#[derive(Debug, Clone, PartialEq)]
pub struct PartResult<T> {
    pub id: u32,
    pub status: u16,
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> PartResult<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl BatchResponseItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Server error message of a failed part
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        extract_error_message(self.body.as_deref())
            .or_else(|| Some(format!("HTTP {}", self.status_code)))
    }

    /// Decode the body of a successful part; `None` for failures and empty bodies
    pub fn decode<T: DeserializeOwned>(&self) -> ApiResult<Option<T>> {
        if !self.is_success() {
            return Ok(None);
        }
        match self.body.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(body) => serde_json::from_str(body).map(Some).map_err(|e| {
                ApiError::unparsable(
                    self.status_code,
                    format!("batch part {}: {}", self.content_id.unwrap_or_default(), e),
                )
            }),
        }
    }
}

impl BatchResponse {
    pub fn new(items: Vec<BatchResponseItem>) -> Self {
        let status = Self::aggregate_status(&items);
        Self { items, status }
    }

    /// Last status >= 300 in part order, or 200 when every part succeeded
    pub fn aggregate_status(items: &[BatchResponseItem]) -> u16 {
        items
            .iter()
            .rev()
            .find(|item| item.status_code >= 300)
            .map_or(200, |item| item.status_code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reorder parts to match `parts`, by Content-ID where it matches and by position otherwise
    pub fn align(self, parts: &[RequestPart]) -> ApiResult<Self> {
        if self.items.len() != parts.len() {
            return Err(ApiError::unparsable(
                ENVELOPE_STATUS,
                format!(
                    "batch response has {} parts for {} requests",
                    self.items.len(),
                    parts.len()
                ),
            ));
        }

        let mut by_id: HashMap<u32, usize> = HashMap::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            if let Some(id) = item.content_id {
                if by_id.insert(id, index).is_some() {
                    return Err(ApiError::unparsable(
                        ENVELOPE_STATUS,
                        format!("batch response repeats Content-ID {}", id),
                    ));
                }
            }
        }

        let aligned = parts
            .iter()
            .enumerate()
            .map(|(position, part)| {
                let index = by_id.get(&part.id).copied().unwrap_or(position);
                BatchResponseItem {
                    content_id: Some(part.id),
                    ..self.items[index].clone()
                }
            })
            .collect();

        Ok(Self::new(aligned))
    }

    /// Decode every part into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> ApiResult<Vec<PartResult<T>>> {
        self.items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                Ok(PartResult {
                    id: item.content_id.unwrap_or(position as u32 + 1),
                    status: item.status_code,
                    value: item.decode()?,
                    error: item.error_message(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct JsonBatchEnvelope {
    responses: Vec<JsonBatchPart>,
}

#[derive(Debug, Deserialize)]
struct JsonBatchPart {
    #[serde(default)]
    id: Option<Value>,
    status: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
}

/// Parser for batch responses
pub struct BatchResponseParser;

impl BatchResponseParser {
    /// Parse a batch response body given the response `Content-Type`
    pub fn parse(response_text: &str, content_type: Option<&str>) -> ApiResult<BatchResponse> {
        let is_json = content_type.is_some_and(|ct| ct.contains("application/json"))
            || response_text.trim_start().starts_with('{');

        let items = if is_json {
            Self::parse_json(response_text)?
        } else {
            let boundary = content_type
                .and_then(boundary_param)
                .or_else(|| Self::first_boundary_line(response_text))
                .ok_or_else(|| ApiError::unparsable(ENVELOPE_STATUS, "no multipart boundary"))?;
            Self::parse_multipart(response_text, &boundary)?
        };

        if items.is_empty() {
            return Err(ApiError::unparsable(
                ENVELOPE_STATUS,
                "batch response contains no parts",
            ));
        }

        Ok(BatchResponse::new(items))
    }

    /// Parse and align the response with the request parts that produced it
    pub fn parse_for(
        response_text: &str,
        content_type: Option<&str>,
        parts: &[RequestPart],
    ) -> ApiResult<BatchResponse> {
        Self::parse(response_text, content_type)?.align(parts)
    }

    fn parse_json(response_text: &str) -> ApiResult<Vec<BatchResponseItem>> {
        let envelope: JsonBatchEnvelope = serde_json::from_str(response_text)
            .map_err(|e| ApiError::unparsable(ENVELOPE_STATUS, e))?;

        Ok(envelope
            .responses
            .into_iter()
            .map(|part| BatchResponseItem {
                content_id: part.id.as_ref().and_then(|id| match id {
                    Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                    Value::String(s) => s.parse().ok(),
                    _ => None,
                }),
                status_code: part.status,
                headers: part.headers,
                body: match part.body {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s),
                    Some(other) => Some(other.to_string()),
                },
            })
            .collect())
    }

    fn parse_multipart(response_text: &str, boundary: &str) -> ApiResult<Vec<BatchResponseItem>> {
        let mut results = Vec::new();

        // First segment is the preamble
        for part in response_text.split(&format!("--{}", boundary)).skip(1) {
            let part = part.trim();
            if part.is_empty() || part == "--" || part.starts_with("--") {
                continue;
            }

            let part_type = part
                .lines()
                .take_while(|line| !line.trim().is_empty())
                .find_map(|line| header_value(line, "content-type"));

            match part_type {
                Some(ct) if ct.contains("multipart/mixed") => {
                    let nested = boundary_param(ct).ok_or_else(|| {
                        ApiError::unparsable(ENVELOPE_STATUS, "changeset without boundary")
                    })?;
                    results.extend(Self::parse_multipart(part, &nested)?);
                }
                Some(ct) if ct.contains("application/http") => {
                    results.push(Self::parse_http_response(part)?);
                }
                _ => {}
            }
        }

        Ok(results)
    }

    /// Parse one `application/http` part
    fn parse_http_response(response_text: &str) -> ApiResult<BatchResponseItem> {
        let mut content_id = None;
        let mut status_code = None;
        let mut headers = HashMap::new();
        let mut state = ParsingState::MultipartHeaders;
        let mut body_lines = Vec::new();

        for raw_line in response_text.lines() {
            let line = raw_line.trim();

            match state {
                ParsingState::MultipartHeaders => {
                    if let Some(id) = header_value(line, "content-id") {
                        content_id = id.parse().ok();
                    } else if line.is_empty() {
                        state = ParsingState::HttpStatus;
                    }
                }
                ParsingState::HttpStatus => {
                    if line.starts_with("HTTP/") {
                        let code = line
                            .split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse::<u16>().ok())
                            .ok_or_else(|| {
                                ApiError::unparsable(
                                    ENVELOPE_STATUS,
                                    format!("bad status line '{}'", line),
                                )
                            })?;
                        status_code = Some(code);
                        state = ParsingState::HttpHeaders;
                    }
                }
                ParsingState::HttpHeaders => {
                    if line.is_empty() {
                        state = ParsingState::Body;
                    } else if let Some((name, value)) = line.split_once(':') {
                        headers.insert(name.trim().to_string(), value.trim().to_string());
                    }
                }
                ParsingState::Body => body_lines.push(raw_line.trim_end_matches('\r')),
            }
        }

        let status_code = status_code.ok_or_else(|| {
            ApiError::unparsable(ENVELOPE_STATUS, "batch part without HTTP status line")
        })?;

        let body = Some(body_lines.join("\n").trim().to_string()).filter(|b| !b.is_empty());

        Ok(BatchResponseItem {
            content_id,
            status_code,
            headers,
            body,
        })
    }

    fn first_boundary_line(text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .find(|line| line.starts_with("--") && line.len() > 2)
            .map(|line| line.trim_start_matches("--").trim_end_matches("--").to_string())
    }
}

/// Value of `name:` when `line` is that header, compared case-insensitively
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

/// `boundary=` parameter of a content type, unquoted
fn boundary_param(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Extract a readable message from an error body
pub(crate) fn extract_error_message(body: Option<&str>) -> Option<String> {
    let body = body?.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(body) {
        // {"error":{"code":"...","message":"..."}}
        if let Some(error_obj) = json_value.get("error") {
            if let Some(message) = error_obj.get("message").and_then(|m| m.as_str()) {
                return Some(match error_obj.get("code").and_then(|c| c.as_str()) {
                    Some(code) => format!("[{}] {}", code, message),
                    None => message.to_string(),
                });
            }
        }

        if let Some(message) = json_value.get("Message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
    }

    Some(body.to_string())
}
