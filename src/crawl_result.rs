//! Crawl result data
//!
//! Produced upstream by a crawler; this crate only serializes it.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

/// Immutable outcome of a crawl
///
/// Word counts keep the order the crawler produced (typically most popular
/// first) and serialize as a JSON object in that order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    #[serde(serialize_with = "ordered_map")]
    word_counts: Vec<(String, u64)>,
    urls_visited: BTreeSet<String>,
}

impl CrawlResult {
    pub fn builder() -> CrawlResultBuilder {
        CrawlResultBuilder::default()
    }

    /// Word counts in crawler order
    pub fn word_counts(&self) -> &[(String, u64)] {
        &self.word_counts
    }

    /// Every URL the crawler visited
    pub fn urls_visited(&self) -> &BTreeSet<String> {
        &self.urls_visited
    }
}

/// Builder for [`CrawlResult`]
#[derive(Debug, Default)]
pub struct CrawlResultBuilder {
    word_counts: Vec<(String, u64)>,
    urls_visited: BTreeSet<String>,
}

impl CrawlResultBuilder {
    /// Set the word counts; later duplicates of a word replace earlier ones
    pub fn word_counts<I, S>(mut self, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        self.word_counts.clear();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (word, count) in counts {
            let word = word.into();
            match index.get(&word) {
                Some(&i) => self.word_counts[i].1 = count,
                None => {
                    index.insert(word.clone(), self.word_counts.len());
                    self.word_counts.push((word, count));
                }
            }
        }
        self
    }

    /// Set the visited URLs
    pub fn urls_visited<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls_visited = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> CrawlResult {
        CrawlResult {
            word_counts: self.word_counts,
            urls_visited: self.urls_visited,
        }
    }
}

fn ordered_map<S: Serializer>(entries: &[(String, u64)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (word, count) in entries {
        map.serialize_entry(word, count)?;
    }
    map.end()
}
