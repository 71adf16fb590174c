//! RESP2 reply parser and command encoder.
//!
//! Only the client half of the protocol is needed: commands go out as
//! arrays of bulk strings and replies come back as any RESP2 type.
//! - Simple Strings (+)
//! - Errors (-)
//! - Integers (:)
//! - Bulk Strings ($)
//! - Arrays (*)
//! - Null (represented as $-1 or *-1)

use bytes::Bytes;

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// A RESP2 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple string (+OK\r\n)
    SimpleString(String),
    /// Error reply (-ERR message\r\n), kept whole.
    Error(String),
    /// Integer (:1000\r\n)
    Integer(i64),
    /// Bulk string ($6\r\nfoobar\r\n)
    BulkString(Bytes),
    /// Array (*2\r\n...)
    Array(Vec<RespValue>),
    /// Null bulk string or null array.
    Null,
}

impl RespValue {
    /// Create a bulk string.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::BulkString(data.into())
    }

    /// Interpret as UTF-8 text, for simple and bulk strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::SimpleString(s) => Some(s.clone()),
            Self::BulkString(b) => std::str::from_utf8(b).ok().map(str::to_string),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SimpleString(_) => "simple string",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::BulkString(_) => "bulk string",
            Self::Array(_) => "array",
            Self::Null => "null",
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        self.encode_into(&mut buf);
        buf
    }

    /// Encode into a buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Self::Error(e) => {
                buf.push(b'-');
                buf.extend_from_slice(e.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Self::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Self::BulkString(data) => write_bulk(buf, data),
            Self::Array(elements) => {
                buf.push(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for elem in elements {
                    elem.encode_into(buf);
                }
            }
            Self::Null => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
}

/// Encode a command as an array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.push(b'*');
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for arg in args {
        write_bulk(&mut buf, arg);
    }
    buf
}

fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(b'$');
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}

/// Parse outcome.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseResult {
    /// A full value and the number of bytes it occupied.
    Complete(RespValue, usize),
    /// Need more data.
    Incomplete,
    /// Malformed input.
    Error(String),
}

/// RESP2 parser.
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one value from the front of `data`.
    pub fn parse(&mut self, data: &[u8]) -> ParseResult {
        self.depth = 0;
        self.parse_value(data)
    }

    fn parse_value(&mut self, data: &[u8]) -> ParseResult {
        let Some((&type_byte, body)) = data.split_first() else {
            return ParseResult::Incomplete;
        };

        if self.depth > MAX_NESTING_DEPTH {
            return ParseResult::Error("maximum nesting depth exceeded".to_string());
        }

        match type_byte {
            b'+' => line(body, |s| Ok(RespValue::SimpleString(s.to_string()))),
            b'-' => line(body, |s| Ok(RespValue::Error(s.to_string()))),
            b':' => line(body, |s| {
                s.parse::<i64>()
                    .map(RespValue::Integer)
                    .map_err(|_| "invalid integer".to_string())
            }),
            b'$' => self.parse_bulk_string(body),
            b'*' => self.parse_array(body),
            other => ParseResult::Error(format!("unexpected type byte 0x{other:02x}")),
        }
    }

    /// Parse a bulk string ($6\r\nfoobar\r\n).
    fn parse_bulk_string(&self, data: &[u8]) -> ParseResult {
        let Some(len_pos) = find_crlf(data) else {
            return ParseResult::Incomplete;
        };

        let len = match parse_length(&data[..len_pos]) {
            Some(-1) => return ParseResult::Complete(RespValue::Null, len_pos + 3),
            Some(len) if len >= 0 => len as usize,
            _ => return ParseResult::Error("invalid bulk string length".to_string()),
        };
        if len > MAX_BULK_SIZE {
            return ParseResult::Error(format!(
                "bulk string too large: {} > {}",
                len, MAX_BULK_SIZE
            ));
        }

        let data_start = len_pos + 2;
        let data_end = data_start + len;
        if data.len() < data_end + 2 {
            return ParseResult::Incomplete;
        }
        if &data[data_end..data_end + 2] != b"\r\n" {
            return ParseResult::Error("missing CRLF after bulk string".to_string());
        }

        let bytes = Bytes::copy_from_slice(&data[data_start..data_end]);
        // +1 for prefix, +2 for trailing CRLF
        ParseResult::Complete(RespValue::BulkString(bytes), data_end + 3)
    }

    /// Parse an array (*2\r\n...).
    fn parse_array(&mut self, data: &[u8]) -> ParseResult {
        let Some(len_pos) = find_crlf(data) else {
            return ParseResult::Incomplete;
        };

        let len = match parse_length(&data[..len_pos]) {
            Some(-1) => return ParseResult::Complete(RespValue::Null, len_pos + 3),
            Some(len) if len >= 0 => len as usize,
            _ => return ParseResult::Error("invalid array length".to_string()),
        };
        if len > MAX_ELEMENTS {
            return ParseResult::Error(format!("array too large: {} > {}", len, MAX_ELEMENTS));
        }

        self.depth += 1;
        let mut elements = Vec::with_capacity(len.min(1024));
        let mut offset = len_pos + 2;

        for _ in 0..len {
            match self.parse_value(&data[offset..]) {
                ParseResult::Complete(value, consumed) => {
                    elements.push(value);
                    offset += consumed;
                }
                other => {
                    self.depth -= 1;
                    return other;
                }
            }
        }

        self.depth -= 1;
        // +1 for prefix
        ParseResult::Complete(RespValue::Array(elements), offset + 1)
    }
}

/// Parse a CRLF-terminated line after the type byte.
fn line(data: &[u8], build: impl FnOnce(&str) -> Result<RespValue, String>) -> ParseResult {
    match find_crlf(data) {
        Some(pos) => {
            let s = String::from_utf8_lossy(&data[..pos]);
            match build(s.as_ref()) {
                Ok(value) => ParseResult::Complete(value, pos + 3),
                Err(e) => ParseResult::Error(e),
            }
        }
        None => ParseResult::Incomplete,
    }
}

fn parse_length(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

/// Find CRLF in data, returning position of first \r.
fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> ParseResult {
        RespParser::new().parse(data)
    }

    #[test]
    fn test_parse_simple_string() {
        assert_eq!(
            parse(b"+OK\r\n"),
            ParseResult::Complete(RespValue::SimpleString("OK".into()), 5)
        );
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            parse(b"-ERR unknown command\r\n"),
            ParseResult::Complete(RespValue::Error("ERR unknown command".into()), 22)
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(
            parse(b":1000\r\n"),
            ParseResult::Complete(RespValue::Integer(1000), 7)
        );
        assert!(matches!(parse(b":abc\r\n"), ParseResult::Error(_)));
    }

    #[test]
    fn test_parse_bulk_string() {
        assert_eq!(
            parse(b"$6\r\nfoobar\r\n"),
            ParseResult::Complete(RespValue::bulk("foobar"), 12)
        );
        assert_eq!(
            parse(b"$0\r\n\r\n"),
            ParseResult::Complete(RespValue::bulk(""), 6)
        );
        assert_eq!(parse(b"$-1\r\n"), ParseResult::Complete(RespValue::Null, 5));
    }

    #[test]
    fn test_parse_scan_reply() {
        let reply = b"*2\r\n$1\r\n0\r\n*2\r\n$5\r\n1_abc\r\n$5\r\n1_xyz\r\n";
        let expected = RespValue::Array(vec![
            RespValue::bulk("0"),
            RespValue::Array(vec![RespValue::bulk("1_abc"), RespValue::bulk("1_xyz")]),
        ]);
        assert_eq!(parse(reply), ParseResult::Complete(expected, reply.len()));
    }

    #[test]
    fn test_consumed_leaves_trailing_bytes() {
        match parse(b"+OK\r\n:1\r\n") {
            ParseResult::Complete(_, consumed) => assert_eq!(consumed, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(parse(b""), ParseResult::Incomplete);
        assert_eq!(parse(b"+OK"), ParseResult::Incomplete);
        assert_eq!(parse(b"$6\r\nfoo"), ParseResult::Incomplete);
        assert_eq!(parse(b"*2\r\n$3\r\nfoo\r\n"), ParseResult::Incomplete);
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(matches!(parse(b"%1\r\n"), ParseResult::Error(_)));
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(
            encode_command(&[b"GET", b"1_abc"]),
            b"*2\r\n$3\r\nGET\r\n$5\r\n1_abc\r\n"
        );
    }

    #[test]
    fn test_encode_reply() {
        let value = RespValue::Array(vec![RespValue::Integer(1), RespValue::Null]);
        assert_eq!(value.encode(), b"*2\r\n:1\r\n$-1\r\n");
        assert_eq!(RespValue::Error("ERR x".into()).encode(), b"-ERR x\r\n");
    }
}
