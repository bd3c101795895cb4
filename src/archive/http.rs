//! HTTP response blocks stored in `response` and `revisit` records.

use std::io::Read;

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

/// Status line, headers and body of a captured HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: Option<u16>,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Split a raw block into status line, headers and body.
    ///
    /// Returns `None` when the block has no `HTTP/` status line.
    pub fn parse(block: &[u8]) -> Option<Self> {
        if !block.starts_with(b"HTTP/") {
            return None;
        }
        let (head_len, sep_len) = find_header_end(block)?;
        let head = String::from_utf8_lossy(&block[..head_len]);
        let mut lines = head.lines();

        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok());

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in lines {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }

        Some(Self {
            status,
            headers,
            body: block[head_len + sep_len..].to_vec(),
        })
    }

    /// First value of a header (name compared case-insensitively).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body with transfer and content encodings removed.
    ///
    /// Decoding failures keep the bytes as captured.
    pub fn decoded_body(&self) -> Vec<u8> {
        let mut body = self.body.clone();
        if self
            .header("transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
        {
            match dechunk(&body) {
                Some(dechunked) => body = dechunked,
                None => log::debug!("Chunked body could not be decoded, keeping raw payload"),
            }
        }
        if let Some(encoding) = self.header("content-encoding") {
            match decompress(&encoding.to_ascii_lowercase(), &body) {
                Some(decoded) => body = decoded,
                None => log::debug!("Content-Encoding {encoding} not decoded, keeping raw payload"),
            }
        }
        body
    }
}

fn find_header_end(block: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = block.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((pos, 4));
    }
    // Some crawlers write bare LF line endings.
    block.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2))
}

fn dechunk(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut rest = body;
    loop {
        let line_end = rest.iter().position(|&b| b == b'\n')?;
        let size_line = std::str::from_utf8(&rest[..line_end]).ok()?;
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        rest = &rest[line_end + 1..];
        if size == 0 {
            return Some(out);
        }
        if rest.len() < size {
            return None;
        }
        out.extend_from_slice(&rest[..size]);
        rest = &rest[size..];
        rest = rest
            .strip_prefix(b"\r\n")
            .or_else(|| rest.strip_prefix(b"\n"))
            .unwrap_or(rest);
    }
}

fn decompress(encoding: &str, body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match encoding.trim() {
        "identity" | "" => return Some(body.to_vec()),
        "gzip" | "x-gzip" => MultiGzDecoder::new(body).read_to_end(&mut out).ok()?,
        "deflate" => {
            // Servers disagree on whether deflate means zlib-wrapped or raw.
            if ZlibDecoder::new(body).read_to_end(&mut out).is_err() {
                out.clear();
                DeflateDecoder::new(body).read_to_end(&mut out).ok()?;
            }
            out.len()
        }
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_parse_status_and_headers() {
        let block = b"HTTP/1.1 301 Moved Permanently\r\nLocation: https://example.com/\r\nX-Long: a\r\n b\r\n\r\nbody";
        let response = HttpResponse::parse(block).unwrap();
        assert_eq!(response.status, Some(301));
        assert_eq!(response.header("LOCATION"), Some("https://example.com/"));
        assert_eq!(response.header("x-long"), Some("a b"));
        assert_eq!(response.body, b"body");
    }

    #[test]
    fn test_not_http() {
        assert_eq!(HttpResponse::parse(b"plain bytes"), None);
    }

    #[test]
    fn test_chunked_body() {
        let block = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";
        let response = HttpResponse::parse(block).unwrap();
        assert_eq!(response.decoded_body(), b"hello world");
    }

    #[test]
    fn test_gzip_body() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html></html>").unwrap();
        let gz = encoder.finish().unwrap();
        let mut block = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
        block.extend_from_slice(&gz);
        let response = HttpResponse::parse(&block).unwrap();
        assert_eq!(response.decoded_body(), b"<html></html>");
    }

    #[test]
    fn test_bad_encoding_keeps_raw() {
        let block = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\nnot gzip";
        let response = HttpResponse::parse(block).unwrap();
        assert_eq!(response.decoded_body(), b"not gzip");
    }
}
