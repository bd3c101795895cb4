//! Streaming WARC 1.0/1.1 reader.
//!
//! Records are read one at a time; only the current record's block is held in
//! memory. Blocks of record types the converter never uses are skipped without
//! buffering.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use super::errors::{ArchiveError, ArchiveResult};
use super::http::HttpResponse;
use super::{CapturedRecord, RecordKind};
use crate::utils::mime_essence;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a `.warc` or `.warc.gz` file; compression is detected from the content.
pub fn open_archive(path: &Path) -> ArchiveResult<WarcReader<Box<dyn BufRead + Send>>> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    let reader: Box<dyn BufRead + Send> = if is_gzip {
        log::debug!("{} is gzip compressed", path.display());
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };
    Ok(WarcReader::new(reader))
}

/// Iterator over the records of one archive.
pub struct WarcReader<R> {
    reader: R,
    offset: u64,
    failed: bool,
    headers_only: bool,
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            failed: false,
            headers_only: false,
        }
    }

    /// Skip every record block: records carry only `url`, `kind` and
    /// `refers_to`.
    #[must_use]
    pub fn headers_only(mut self) -> Self {
        self.headers_only = true;
        self
    }

    /// Read the next record, or `None` at end of input.
    pub fn next_record(&mut self) -> ArchiveResult<Option<CapturedRecord>> {
        let record_offset;
        let mut line = Vec::new();
        // Skip the blank lines separating records.
        loop {
            line.clear();
            let start = self.offset;
            if self.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !trim_eol(&line).is_empty() {
                record_offset = start;
                break;
            }
        }

        let version = String::from_utf8_lossy(trim_eol(&line)).into_owned();
        if !version.starts_with("WARC/") {
            return Err(ArchiveError::InvalidVersion {
                offset: record_offset,
                line: version,
            });
        }

        let headers = self.read_headers(record_offset)?;
        let header = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };

        let length: u64 = header("content-length")
            .and_then(|v| v.parse().ok())
            .ok_or(ArchiveError::MissingHeader {
                offset: record_offset,
                name: "Content-Length",
            })?;
        let kind = RecordKind::from_warc_type(header("warc-type").unwrap_or_default());

        if !kind.is_eligible() || self.headers_only {
            let skipped = io::copy(&mut (&mut self.reader).take(length), &mut io::sink())?;
            self.offset += skipped;
            if skipped < length {
                return Err(truncated(record_offset, length, skipped));
            }
            return Ok(Some(CapturedRecord {
                url: target_uri(header("warc-target-uri")),
                kind,
                refers_to: header("warc-refers-to-target-uri").map(|v| target_uri(Some(v))),
                ..CapturedRecord::default()
            }));
        }

        let mut block = Vec::with_capacity(usize::try_from(length).unwrap_or(0).min(1 << 20));
        let read = (&mut self.reader).take(length).read_to_end(&mut block)? as u64;
        self.offset += read;
        if read < length {
            return Err(truncated(record_offset, length, read));
        }

        let mut record = CapturedRecord {
            url: target_uri(header("warc-target-uri")),
            kind: kind.clone(),
            refers_to: header("warc-refers-to-target-uri").map(|v| target_uri(Some(v))),
            ..CapturedRecord::default()
        };

        match kind {
            RecordKind::Response | RecordKind::Revisit => match HttpResponse::parse(&block) {
                Some(response) => {
                    record.http_status = response.status;
                    record.mime_type = mime_essence(response.header("content-type").unwrap_or_default());
                    record.location = response.header("location").map(str::to_string);
                    record.content = response.decoded_body();
                }
                None => {
                    record.mime_type = mime_essence(header("content-type").unwrap_or_default());
                    record.content = block;
                }
            },
            _ => {
                record.mime_type = mime_essence(header("content-type").unwrap_or_default());
                record.content = block;
            }
        }
        Ok(Some(record))
    }

    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let n = self.reader.read_until(b'\n', buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn read_headers(&mut self, record_offset: u64) -> ArchiveResult<Vec<(String, String)>> {
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.read_line(&mut line)? == 0 {
                return Err(truncated(record_offset, 0, 0));
            }
            let text = String::from_utf8_lossy(trim_eol(&line)).into_owned();
            if text.is_empty() {
                return Ok(headers);
            }
            if text.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(text.trim());
                }
                continue;
            }
            match text.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => {
                    return Err(ArchiveError::MalformedHeader {
                        offset: record_offset,
                        line: text,
                    });
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = ArchiveResult<CapturedRecord>;

    /// Stops after the first error: framing cannot be recovered once lost.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// WARC 1.0 allows the target URI wrapped in angle brackets.
fn target_uri(value: Option<&str>) -> String {
    let value = value.unwrap_or_default().trim();
    value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value)
        .to_string()
}

fn truncated(offset: u64, expected: u64, actual: u64) -> ArchiveError {
    ArchiveError::Truncated {
        offset,
        expected,
        actual,
    }
}
