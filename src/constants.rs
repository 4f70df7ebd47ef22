use std::time::Duration;

pub const SUPPORTED_VERSIONS: [&str; 3] = ["HTTP/1.0", "HTTP/1.1", "HTTP/2.0"];

pub const HEADER_BOUNDARY: &[u8] = b"\r\n\r\n";
pub const CONTENT_LENGTH: &str = "Content-Length";

pub const NORMAL_RESPONSE_BODY: &str = "ok";
pub const DELAYED_RESPONSE_BODY: &str = "after timeout";

/// Status line cut off before the status code is complete.
pub const STATUS_LINE_FRAGMENT: &[u8] = b"HTTP/1.0 20";
/// Valid status line followed by a single stray header byte.
pub const HEADER_MIDDLE_FRAGMENT: &[u8] = b"HTTP/1.0 200 OK\na";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BREAK_PORT: u16 = 65432;
pub const DEFAULT_NORMAL_PORT: u16 = 65433;

// Small enough that a single request arrives over several reads.
pub const DEFAULT_RECV_BUFFER_SIZE: u32 = 100;
pub const DEFAULT_READ_CHUNK_SIZE: usize = 10;

pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Head of the minimal response: status line and `Content-Length`, no body.
pub fn response_head(body_len: usize) -> String {
    format!("HTTP/1.0 200 OK\n{}: {}\n\n", CONTENT_LENGTH, body_len)
}

pub fn minimal_response(body: &str) -> Vec<u8> {
    let mut response = response_head(body.len()).into_bytes();
    response.extend_from_slice(body.as_bytes());
    response
}
