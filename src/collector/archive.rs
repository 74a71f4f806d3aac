//! Reading documents out of compressed bundles
//!
//! A source's url may point at a bundle of reports instead of a single
//! report. The bundle's entries that match the configured glob are read
//! and handed to the adapter as separate documents.

use flate2::bufread::GzDecoder;
use glob::Pattern;
use std::io::Read;
use tracing::debug;

use super::adapter::Document;
use super::error::{CollectError, CollectResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One named entry of a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Extracts named entries from a compressed bundle
pub trait ArchiveReader: Send + Sync {
    /// Whether `body` is a bundle this reader understands
    fn is_archive(&self, body: &[u8]) -> bool;

    fn entries(&self, body: &[u8]) -> CollectResult<Vec<ArchiveEntry>>;
}

/// Gzip bundles: one gzip member per entry, named by the member's
/// original file name. A member without a name is called `entry-<n>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipBundleReader;

impl ArchiveReader for GzipBundleReader {
    fn is_archive(&self, body: &[u8]) -> bool {
        body.starts_with(&GZIP_MAGIC)
    }

    fn entries(&self, body: &[u8]) -> CollectResult<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        let mut remaining = body;

        while !remaining.is_empty() {
            let mut decoder = GzDecoder::new(remaining);
            let mut contents = Vec::new();
            decoder
                .read_to_end(&mut contents)
                .map_err(|e| CollectError::parse(format!("archive is corrupt: {e}")))?;

            let name = decoder
                .header()
                .and_then(|header| header.filename())
                .map(|raw| String::from_utf8_lossy(raw).into_owned())
                .unwrap_or_else(|| format!("entry-{}", entries.len() + 1));
            entries.push(ArchiveEntry { name, contents });

            remaining = decoder.into_inner();
        }

        Ok(entries)
    }
}

/// Turn one response body into documents: the body itself, or the bundle
/// entries matching `pattern` (all entries when no pattern is set)
pub fn extract_documents(
    reader: &dyn ArchiveReader,
    body: Vec<u8>,
    pattern: Option<&str>,
) -> CollectResult<Vec<Document>> {
    if !reader.is_archive(&body) {
        return Ok(vec![Document::new(None, body)]);
    }

    let glob = Pattern::new(pattern.unwrap_or("*")).map_err(|e| {
        CollectError::configuration(format!("'archive_entries' is not a valid glob: {e}"))
    })?;
    let entries = reader.entries(&body)?;
    let total = entries.len();

    let documents: Vec<Document> = entries
        .into_iter()
        .filter(|entry| glob.matches(&entry.name))
        .map(|entry| Document::new(Some(entry.name), entry.contents))
        .collect();
    debug!(
        "Archive: {} of {} entries match '{}'",
        documents.len(),
        total,
        glob.as_str()
    );

    if documents.is_empty() {
        return Err(CollectError::parse(format!(
            "archive has no entries matching '{}'",
            glob.as_str()
        )));
    }
    Ok(documents)
}
