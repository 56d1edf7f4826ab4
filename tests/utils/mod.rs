// Shared fixtures for profiler integration tests
//
// A small "web fetcher" capability with a profiled fetch, an unprofiled
// describe, and fake implementations whose simulated latency is driven by
// a FakeClock or by a per-thread fake time.

#![allow(dead_code)] // Not every test binary uses every helper

use chrono::{DateTime, Utc};
use crawl_profiler::capability;
use crawl_profiler::clock::{Clock, FakeClock};
use crawl_profiler::proxy::Profiled;
use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

capability! {
    pub static RESOURCE: Resource {
        fn describe();
    }
}

capability! {
    pub static WEB_FETCHER: WebFetcher extends [RESOURCE] {
        #[profiled] fn fetch(&str);
        #[profiled] fn fetch(&str, usize);
    }
}

/// Error returned by the fake fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub url: String,
    pub status: u16,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} returned {}", self.url, self.status)
    }
}

impl std::error::Error for FetchError {}

pub trait Resource {
    fn describe(&self) -> Result<String, FetchError>;
}

pub trait WebFetcher: Resource {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
    fn fetch_limited(&self, url: &str, max_bytes: usize) -> Result<String, FetchError>;
}

impl<T: Resource> Resource for Profiled<T> {
    fn describe(&self) -> Result<String, FetchError> {
        self.intercept("describe", &[], || self.target().describe())
    }
}

impl<T: WebFetcher> WebFetcher for Profiled<T> {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.intercept("fetch", &["&str"], || self.target().fetch(url))
    }

    fn fetch_limited(&self, url: &str, max_bytes: usize) -> Result<String, FetchError> {
        self.intercept("fetch", &["&str", "usize"], || {
            self.target().fetch_limited(url, max_bytes)
        })
    }
}

/// Fake fetcher; every call advances the clock by the next scripted delay
///
/// URLs starting with `bad:` fail with status 404 after the delay.
pub struct FakeFetcher {
    clock: Arc<FakeClock>,
    delays: Mutex<Vec<Duration>>,
    fallback: Duration,
}

impl FakeFetcher {
    pub fn new(clock: &Arc<FakeClock>, delays_ms: &[u64]) -> Self {
        Self {
            clock: Arc::clone(clock),
            delays: Mutex::new(delays_ms.iter().rev().map(|ms| Duration::from_millis(*ms)).collect()),
            fallback: Duration::from_millis(1),
        }
    }

    /// Every call takes the same time
    pub fn constant(clock: &Arc<FakeClock>, delay: Duration) -> Self {
        Self {
            clock: Arc::clone(clock),
            delays: Mutex::new(Vec::new()),
            fallback: delay,
        }
    }

    fn simulate(&self) {
        let delay = self.delays.lock().unwrap().pop().unwrap_or(self.fallback);
        self.clock.advance(delay);
    }
}

impl Resource for FakeFetcher {
    fn describe(&self) -> Result<String, FetchError> {
        self.simulate();
        Ok("fake fetcher".to_string())
    }
}

impl WebFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.simulate();
        if url.starts_with("bad:") {
            return Err(FetchError {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(format!("<html>{url}</html>"))
    }

    fn fetch_limited(&self, url: &str, max_bytes: usize) -> Result<String, FetchError> {
        let mut body = self.fetch(url)?;
        body.truncate(max_bytes);
        Ok(body)
    }
}

/// Report text without its `Run at` header line
pub fn report_body(report: &str) -> &str {
    report.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
}

thread_local! {
    static THREAD_NOW_MS: Cell<i64> = const { Cell::new(0) };
}

/// Clock whose reading is private to the calling thread
///
/// Threads advance their own time only, so concurrent callers sharing one
/// wrapper each observe exactly the latency their own calls simulate.
pub struct ThreadLocalClock;

impl ThreadLocalClock {
    pub fn advance(delay: Duration) {
        let ms = i64::try_from(delay.as_millis()).unwrap();
        THREAD_NOW_MS.with(|now| now.set(now.get() + ms));
    }
}

impl Clock for ThreadLocalClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = THREAD_NOW_MS.with(Cell::get);
        DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::milliseconds(ms)
    }
}

/// Fetcher taking as many milliseconds as the URL's last path segment
///
/// `http://site/40` advances the calling thread's [`ThreadLocalClock`] by 40ms.
pub struct SegmentDelayFetcher;

impl Resource for SegmentDelayFetcher {
    fn describe(&self) -> Result<String, FetchError> {
        Ok("segment delay fetcher".to_string())
    }
}

impl WebFetcher for SegmentDelayFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let ms = url
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
            .unwrap_or(0);
        ThreadLocalClock::advance(Duration::from_millis(ms));
        Ok(url.to_string())
    }

    fn fetch_limited(&self, url: &str, max_bytes: usize) -> Result<String, FetchError> {
        let mut body = self.fetch(url)?;
        body.truncate(max_bytes);
        Ok(body)
    }
}
