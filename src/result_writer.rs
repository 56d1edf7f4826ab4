//! JSON output for crawl results
//!
//! Writes `{"wordCounts": {...}, "urlsVisited": [...]}` either to a file or to
//! any writer.
//!
//! Writing to a path appends when the file already exists. Two writes to the
//! same file therefore leave two concatenated JSON documents, which is not a
//! single valid document. Callers that want one document per file must pick a
//! fresh path.

use crate::crawl_result::CrawlResult;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing a crawl result
#[derive(Error, Debug)]
pub enum ResultWriteError {
    #[error("failed to write crawl result to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode crawl result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes one [`CrawlResult`] as JSON
#[derive(Debug)]
pub struct CrawlResultWriter {
    result: CrawlResult,
}

impl CrawlResultWriter {
    pub fn new(result: CrawlResult) -> Self {
        Self { result }
    }

    /// Append the JSON document to the file at `path`, creating it if needed
    pub fn write_to_path(&self, path: &Path) -> Result<(), ResultWriteError> {
        let io_err = |source: io::Error| ResultWriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer).map_err(|e| match e {
            ResultWriteError::Encode(inner) if inner.is_io() => io_err(inner.into()),
            other => other,
        })?;
        writer.flush().map_err(io_err)?;

        tracing::debug!(
            path = %path.display(),
            words = self.result.word_counts().len(),
            urls = self.result.urls_visited().len(),
            "wrote crawl result"
        );
        Ok(())
    }

    /// Encode the JSON document to `writer`, leaving it open
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), ResultWriteError> {
        serde_json::to_writer(&mut *writer, &self.result)?;
        Ok(())
    }

    /// Encode to a pretty-printed string
    pub fn to_json(&self) -> Result<String, ResultWriteError> {
        Ok(serde_json::to_string_pretty(&self.result)?)
    }
}
