//! `$batch` request builder
//!
//! Builds the `multipart/mixed; boundary=changeset` body posted to the batch
//! endpoint. Each part carries its own `Content-ID`, assigned in insertion
//! order starting at 1.

use crate::api::constants::{self, headers, methods};
use serde_json::Value;

const CRLF: &str = "\r\n";

/// HTTP method of a batch part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartMethod {
    Get,
    Post,
    Put,
}

impl PartMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartMethod::Get => methods::GET,
            PartMethod::Post => methods::POST,
            PartMethod::Put => methods::PUT,
        }
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self, PartMethod::Get)
    }
}

/// One sub-request of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPart {
    /// 1-based, unique within the batch it was added to
    pub id: u32,
    pub method: PartMethod,
    pub url: String,
    /// Present only for mutating methods
    pub payload: Option<Value>,
}

/// Builder for batch requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchBuilder {
    parts: Vec<RequestPart>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a GET part
    pub fn add_get(self, url: impl Into<String>) -> Self {
        self.push(PartMethod::Get, url.into(), None)
    }

    /// Append a POST part with a JSON payload
    pub fn add_post(self, url: impl Into<String>, payload: Value) -> Self {
        self.push(PartMethod::Post, url.into(), Some(payload))
    }

    /// Append a PUT part with a JSON payload
    pub fn add_put(self, url: impl Into<String>, payload: Value) -> Self {
        self.push(PartMethod::Put, url.into(), Some(payload))
    }

    fn push(mut self, method: PartMethod, url: String, payload: Option<Value>) -> Self {
        let id = self.parts.last().map_or(1, |last| last.id + 1);
        self.parts.push(RequestPart {
            id,
            method,
            url,
            payload: payload.filter(|_| method.is_mutating()),
        });
        self
    }

    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Partition into consecutive chunks of at most `chunk_size` parts
    ///
    /// Parts keep their original ids, so every chunk preserves the insertion
    /// order of the batch it came from.
    pub fn split(&self, chunk_size: usize) -> Vec<BatchBuilder> {
        let chunk_size = chunk_size.max(1);
        if self.parts.len() == chunk_size {
            return vec![self.clone()];
        }

        (0..self.parts.len())
            .step_by(chunk_size)
            .map(|offset| self.chunk(offset, chunk_size))
            .collect()
    }

    /// The next `chunk_size` parts (or fewer) starting at `offset`
    pub fn chunk(&self, offset: usize, chunk_size: usize) -> BatchBuilder {
        let start = offset.min(self.parts.len());
        let end = start.saturating_add(chunk_size.max(1)).min(self.parts.len());
        BatchBuilder {
            parts: self.parts[start..end].to_vec(),
        }
    }

    /// Build the complete batch request body
    pub fn build(&self) -> BatchRequest {
        let mut body = String::new();

        for part in &self.parts {
            body.push_str(&format!("--{}{}", constants::CHANGESET_BOUNDARY, CRLF));
            body.push_str(&format!("Content-Type: {}{}", headers::CONTENT_TYPE_HTTP, CRLF));
            body.push_str(&format!("Content-Transfer-Encoding: binary{}", CRLF));
            body.push_str(&format!("Content-ID: {}{}", part.id, CRLF));
            body.push_str(CRLF);

            // HTTP request line
            body.push_str(&format!("{} {} HTTP/1.1{}", part.method.as_str(), part.url, CRLF));

            match &part.payload {
                Some(payload) => {
                    body.push_str(&format!("Content-Type: {}{}", headers::CONTENT_TYPE_JSON, CRLF));
                    body.push_str(CRLF);
                    body.push_str(&payload.to_string());
                    body.push_str(CRLF);
                }
                None => body.push_str(CRLF),
            }
        }

        body.push_str(&format!("--{}--{}", constants::CHANGESET_BOUNDARY, CRLF));

        BatchRequest {
            content_type: constants::batch_content_type(),
            body,
        }
    }
}

impl From<Vec<RequestPart>> for BatchBuilder {
    fn from(parts: Vec<RequestPart>) -> Self {
        Self { parts }
    }
}

/// Complete batch request ready to send
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub content_type: String,
    pub body: String,
}

impl BatchRequest {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}
