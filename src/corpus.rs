//! Local word counting used by the `crawl-profiler` binary
//!
//! Pages are plain files on disk. Loading and parsing go through the
//! [`PageParser`] capability so the binary can wrap them with the profiler;
//! `load` is declared on the parent [`PageSource`] capability.

use crate::capability;
use crate::crawl_result::CrawlResult;
use crate::proxy::Profiled;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

capability! {
    pub static PAGE_SOURCE: PageSource {
        #[profiled] fn load(&Path);
    }
}

capability! {
    pub static PAGE_PARSER: PageParser extends [PAGE_SOURCE] {
        #[profiled] fn parse(&str);
        fn name();
    }
}

/// Something that can fetch a page's text
pub trait PageSource {
    fn load(&self, path: &Path) -> std::io::Result<String>;
}

/// Splits page text into words
pub trait PageParser: PageSource {
    fn parse(&self, text: &str) -> Vec<String>;
    fn name(&self) -> &str;
}

impl<T: PageSource> PageSource for Profiled<T> {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        self.intercept("load", &["&Path"], || self.target().load(path))
    }
}

impl<T: PageParser> PageParser for Profiled<T> {
    fn parse(&self, text: &str) -> Vec<String> {
        self.intercept("parse", &["&str"], || self.target().parse(text))
    }

    fn name(&self) -> &str {
        self.intercept("name", &[], || self.target().name())
    }
}

/// Reads pages from the local filesystem
///
/// Words are maximal runs of alphanumeric characters, lowercased. Words
/// shorter than `min_word_len` are dropped.
#[derive(Debug, Clone)]
pub struct FilePages {
    min_word_len: usize,
}

impl FilePages {
    pub fn new(min_word_len: usize) -> Self {
        Self { min_word_len }
    }
}

impl Default for FilePages {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PageSource for FilePages {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path)
    }
}

impl PageParser for FilePages {
    fn parse(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= self.min_word_len.max(1))
            .map(str::to_lowercase)
            .collect()
    }

    fn name(&self) -> &str {
        "local-files"
    }
}

/// Count words across `pages`, keeping the `popular` most frequent
///
/// Pages are split into contiguous chunks, one per worker thread, with at
/// most [`std::thread::available_parallelism`] workers all sharing `parser`.
/// Ties in count are broken alphabetically.
pub fn count_words<P>(parser: &P, pages: &[PathBuf], popular: usize) -> Result<CrawlResult>
where
    P: PageParser + Sync + ?Sized,
{
    tracing::debug!(parser = parser.name(), pages = pages.len(), "counting words");

    let chunk = pages.len().div_ceil(worker_count(pages.len())).max(1);
    let per_page: Vec<Result<(String, Vec<String>)>> = thread::scope(|scope| {
        let handles: Vec<_> = pages
            .chunks(chunk)
            .map(|part| {
                scope.spawn(move || {
                    part.iter()
                        .map(|path| visit(parser, path))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut urls = Vec::with_capacity(pages.len());
    for page in per_page {
        let (url, words) = page?;
        for word in words {
            *counts.entry(word).or_default() += 1;
        }
        urls.push(url);
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(popular);

    Ok(CrawlResult::builder()
        .word_counts(ranked)
        .urls_visited(urls)
        .build())
}

/// Worker threads for `pages` pages; never zero
fn worker_count(pages: usize) -> usize {
    let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    cpus.min(pages).max(1)
}

fn visit<P: PageParser + ?Sized>(parser: &P, path: &Path) -> Result<(String, Vec<String>)> {
    let text = parser
        .load(path)
        .with_context(|| format!("failed to read page {}", path.display()))?;
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("failed to resolve page {}", path.display()))?;
    Ok((format!("file://{}", absolute.display()), parser.parse(&text)))
}
