use anyhow::{Context, Result};
use clap::Parser;
use crawl_profiler::{
    cli::Cli,
    clock::SystemClock,
    corpus::{self, FilePages, PAGE_PARSER},
    profiler::ProfilerSession,
    result_writer::CrawlResultWriter,
};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let session = ProfilerSession::new(Arc::new(SystemClock));
    let parser = session
        .wrap(&PAGE_PARSER, FilePages::new(args.min_word_length))
        .context("failed to set up profiling")?;

    let result = corpus::count_words(&parser, &args.pages, args.popular_words)?;
    let writer = CrawlResultWriter::new(result);

    let stdout = std::io::stdout();
    match &args.result_output {
        Some(path) => writer.write_to_path(path)?,
        None => {
            let mut out = stdout.lock();
            writer.write(&mut out)?;
            writeln!(out)?;
        }
    }

    match &args.profile_output {
        Some(path) => session.write_report_to_path(path)?,
        None => session.write_report(&mut stdout.lock())?,
    }

    Ok(())
}
