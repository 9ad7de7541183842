//! Control-message grammar shared by the ferry client and server.
//!
//! Two message classes travel over the WebSocket: UTF-8 text control
//! messages (request, response header, end marker, error statuses) and raw
//! binary frames carrying file content. This module owns the text grammar;
//! it performs no I/O.

/// Default server port.
pub const DEFAULT_PORT: u16 = 34094;

/// WebSocket upgrade path.
pub const WS_PATH: &str = "/";

/// Maximum payload of one binary chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Default per-operation network timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Prefix shared by the request and the response header.
pub const REQUEST_PREFIX: &str = "FILE: ";

const SIZE_SEP: &str = " SIZE: ";

// Terminal and status markers. Exact, case-sensitive strings.
pub const FILE_END: &str = "FILE END";
pub const INVALID_REQUEST: &str = "INVALID REQUEST";
pub const FILE_NOT_FOUND: &str = "FILE NOT FOUND";
pub const FILE_OPEN_ERROR: &str = "SERVER FILE OPEN ERROR";

/// Build a `FILE: <name>` request.
pub fn encode_request(name: &str) -> String {
    format!("{REQUEST_PREFIX}{name}")
}

/// Parse a request, returning the raw (unvalidated) file name.
///
/// An empty name is grammatical; the path validator rejects it later.
pub fn parse_request(msg: &str) -> Option<&str> {
    msg.strip_prefix(REQUEST_PREFIX)
}

/// Build a `FILE: <name> SIZE: <n>` response header.
pub fn encode_header(name: &str, size: u64) -> String {
    format!("{REQUEST_PREFIX}{name}{SIZE_SEP}{size}")
}

/// Parse a response header into (echoed name, announced size).
///
/// The name may itself contain ` SIZE: `, so the split happens at the last
/// occurrence; the size must be nothing but ASCII digits.
pub fn parse_header(msg: &str) -> Option<(&str, u64)> {
    let rest = msg.strip_prefix(REQUEST_PREFIX)?;
    let at = rest.rfind(SIZE_SEP)?;
    let name = &rest[..at];
    let digits = &rest[at + SIZE_SEP.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((name, digits.parse().ok()?))
}

/// Whether a text message is one of the server's refusal statuses.
pub fn is_status(msg: &str) -> bool {
    msg == INVALID_REQUEST || msg == FILE_NOT_FOUND || msg == FILE_OPEN_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let req = encode_request("report.bin");
        assert_eq!(req, "FILE: report.bin");
        assert_eq!(parse_request(&req), Some("report.bin"));
    }

    #[test]
    fn test_request_empty_name_is_grammatical() {
        assert_eq!(parse_request("FILE: "), Some(""));
    }

    #[test]
    fn test_request_rejects_bad_prefix() {
        assert_eq!(parse_request("GIMME report.bin"), None);
        assert_eq!(parse_request("file: report.bin"), None); // case-sensitive
        assert_eq!(parse_request("FILE:report.bin"), None); // space required
        assert_eq!(parse_request(""), None);
    }

    #[test]
    fn test_header_round_trip() {
        let hdr = encode_header("report.bin", 10);
        assert_eq!(hdr, "FILE: report.bin SIZE: 10");
        assert_eq!(parse_header(&hdr), Some(("report.bin", 10)));
    }

    #[test]
    fn test_header_zero_size() {
        assert_eq!(parse_header("FILE: empty SIZE: 0"), Some(("empty", 0)));
    }

    #[test]
    fn test_header_name_with_spaces() {
        let hdr = encode_header("my file.txt", 42);
        assert_eq!(parse_header(&hdr), Some(("my file.txt", 42)));
    }

    #[test]
    fn test_header_name_containing_size_sep() {
        // The last " SIZE: " wins, so a pathological name still round-trips.
        let hdr = encode_header("a SIZE: 9", 7);
        assert_eq!(parse_header(&hdr), Some(("a SIZE: 9", 7)));
    }

    #[test]
    fn test_header_rejects_malformed() {
        assert_eq!(parse_header("FILE: x"), None); // no size
        assert_eq!(parse_header("FILE: x SIZE: "), None); // empty digits
        assert_eq!(parse_header("FILE: x SIZE: 12a"), None); // non-decimal
        assert_eq!(parse_header("FILE: x SIZE: -1"), None);
        assert_eq!(parse_header("SIZE: 10"), None); // no prefix
        assert_eq!(parse_header("FILE END"), None);
    }

    #[test]
    fn test_status_markers_exact() {
        assert!(is_status("INVALID REQUEST"));
        assert!(is_status("FILE NOT FOUND"));
        assert!(is_status("SERVER FILE OPEN ERROR"));
        assert!(!is_status("FILE END"));
        assert!(!is_status("file not found"));
    }
}
