//! Archive input: captured records streamed from WARC files.

pub mod errors;
pub mod http;
pub mod warc;

pub use errors::{ArchiveError, ArchiveResult};
pub use http::HttpResponse;
pub use warc::{WarcReader, open_archive};

/// WARC record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Response,
    Resource,
    Revisit,
    /// `request`, `warcinfo`, `metadata`, ...; never rewritten.
    Other(String),
    #[default]
    Unknown,
}

impl RecordKind {
    pub fn from_warc_type(warc_type: &str) -> Self {
        match warc_type.trim().to_ascii_lowercase().as_str() {
            "response" => Self::Response,
            "resource" => Self::Resource,
            "revisit" => Self::Revisit,
            "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only these record types carry a payload worth converting.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Response | Self::Resource | Self::Revisit)
    }
}

/// One captured transaction, as read from the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedRecord {
    /// `WARC-Target-URI`.
    pub url: String,
    pub kind: RecordKind,
    /// Media type essence (no parameters, lowercase).
    pub mime_type: String,
    pub http_status: Option<u16>,
    /// `Location` response header, for redirects.
    pub location: Option<String>,
    /// `WARC-Refers-To-Target-URI`, for revisits.
    pub refers_to: Option<String>,
    /// Payload with transfer and content encodings removed.
    pub content: Vec<u8>,
}

impl CapturedRecord {
    pub fn is_redirect(&self) -> bool {
        self.http_status
            .is_some_and(|status| (301..400).contains(&status))
    }
}
