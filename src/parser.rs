//! Re-parse-from-scratch HTTP/1.x request recognition.
//!
//! Every read appends to the connection buffer and the whole buffer is parsed
//! again, so a [`ParsedRequest`] never carries state between reads. The parser
//! never fails: malformed or partial input only shows up as milestones that are
//! not yet recognized.

use std::collections::HashMap;

use http::{Method, Version};

use crate::constants::{CONTENT_LENGTH, HEADER_BOUNDARY, SUPPORTED_VERSIONS};

/// Deployment-specific parsing policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treat a `GET` as complete as soon as its header block is terminated,
    /// without waiting for a `Content-Length` match.
    pub complete_get_on_headers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    pub version_recognized: bool,
    pub version: String,
    pub method: Option<String>,
    pub url: String,
    pub url_recognized: bool,
    pub headers: HashMap<String, String>,
    pub headers_started: bool,
    pub headers_complete: bool,
    pub body_started: bool,
    pub body: Vec<u8>,
    pub body_complete: bool,
    pub request_complete: bool,
}

impl ParsedRequest {
    /// Header lookup with an ASCII case-insensitive name match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether a `Content-Length` header was sent at all, parseable or not.
    pub fn has_content_length(&self) -> bool {
        self.header(CONTENT_LENGTH).is_some()
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header(CONTENT_LENGTH)
            .and_then(|value| value.parse::<usize>().ok())
    }

    pub fn is_get(&self) -> bool {
        self.method.as_deref() == Some(Method::GET.as_str())
    }

    pub fn http_version(&self) -> Option<Version> {
        string_to_http_version(&self.version)
    }
}

pub fn parse(buffer: &[u8], options: &ParseOptions) -> ParsedRequest {
    let mut request = ParsedRequest::default();

    let boundary = find_boundary(buffer);
    let head = match boundary {
        Some(position) => &buffer[..position],
        None => buffer,
    };

    // A head cut inside a multi-byte character is just "not enough data yet".
    let Ok(head) = std::str::from_utf8(head) else {
        return request;
    };

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() == 3 {
        request.method = Some(parts[0].to_string());
        request.url = parts[1].to_string();
        request.version = parts[2].to_string();
        request.url_recognized = true;
        request.version_recognized = SUPPORTED_VERSIONS.contains(&parts[2]);
    }

    for line in lines {
        if !line.is_empty() {
            request.headers_started = true;
        }
        if let Some((key, value)) = line.split_once(':') {
            request
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let Some(position) = boundary else {
        return request;
    };

    request.headers_started = true;
    request.headers_complete = request.url_recognized;
    request.body_started = true;
    request.body = buffer[position + HEADER_BOUNDARY.len()..].to_vec();
    request.body_complete = request.content_length() == Some(request.body.len());
    request.request_complete = request.body_complete
        || (options.complete_get_on_headers && request.headers_complete && request.is_get());

    request
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_BOUNDARY.len())
        .position(|window| window == HEADER_BOUNDARY)
}

fn string_to_http_version(version: &str) -> Option<Version> {
    match version {
        "HTTP/1.0" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2.0" => Some(Version::HTTP_2),
        _ => None,
    }
}
