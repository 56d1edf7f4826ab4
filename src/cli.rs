//! CLI argument parsing for crawl-profiler

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crawl-profiler")]
#[command(version)]
#[command(about = "Count words in local pages and profile the work per method", long_about = None)]
pub struct Cli {
    /// Pages to read (plain text files)
    #[arg(value_name = "FILES", required = true)]
    pub pages: Vec<PathBuf>,

    /// Number of most popular words to keep
    #[arg(short = 'n', long = "popular-words", value_name = "N", default_value = "10")]
    pub popular_words: usize,

    /// Ignore words shorter than this many characters
    #[arg(long = "min-word-length", value_name = "LEN", default_value = "1")]
    pub min_word_length: usize,

    /// Append the crawl result JSON to this file instead of printing it
    #[arg(long = "result-output", value_name = "PATH")]
    pub result_output: Option<PathBuf>,

    /// Append the profiling report to this file instead of printing it
    #[arg(long = "profile-output", value_name = "PATH")]
    pub profile_output: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
