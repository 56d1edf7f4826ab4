//! Property-based tests for timing aggregation and report output
//!
//! Covers:
//! 1. Totals equal the sum of simulated call latencies
//! 2. Concurrent recording yields the same totals as sequential recording,
//!    both directly and through one shared wrapper
//! 3. Reports over identical data differ only in the header line

mod utils;

use crawl_profiler::capability::MethodKey;
use crawl_profiler::clock::FakeClock;
use crawl_profiler::profiler::ProfilerSession;
use crawl_profiler::profiling_state::ProfilingState;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use utils::{FakeFetcher, SegmentDelayFetcher, ThreadLocalClock, WebFetcher, WEB_FETCHER};

const METHODS: [&str; 4] = ["fetch", "parse", "index", "store"];

fn key(method: &'static str) -> MethodKey {
    MethodKey {
        declaring_type: "Crawler",
        method,
        params: &[],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_total_is_sum_of_deltas(delays in prop::collection::vec(0u64..10_000, 1..40)) {
        let clock = Arc::new(FakeClock::at_epoch());
        let session = ProfilerSession::new(clock.clone());
        let wrapped = session
            .wrap(&WEB_FETCHER, FakeFetcher::new(&clock, &delays))
            .unwrap();

        for i in 0..delays.len() {
            let _ = wrapped.fetch(&format!("http://site/{i}"));
        }

        let expected: u64 = delays.iter().sum();
        let key = MethodKey { declaring_type: WEB_FETCHER.path(), method: "fetch", params: &["&str"] };
        prop_assert_eq!(session.state().total(&key), Some(Duration::from_millis(expected)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_concurrent_equals_sequential(
        calls in prop::collection::vec((0usize..METHODS.len(), 0u64..5_000), 1..200),
        threads in 1usize..6,
    ) {
        let sequential = ProfilingState::new();
        for (m, micros) in &calls {
            sequential.record(&key(METHODS[*m]), Duration::from_micros(*micros));
        }

        let concurrent = Arc::new(ProfilingState::new());
        let chunk = calls.len().div_ceil(threads);
        thread::scope(|scope| {
            for part in calls.chunks(chunk) {
                let concurrent = Arc::clone(&concurrent);
                scope.spawn(move || {
                    for (m, micros) in part {
                        concurrent.record(&key(METHODS[*m]), Duration::from_micros(*micros));
                    }
                });
            }
        });

        prop_assert_eq!(sequential.snapshot(), concurrent.snapshot());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_concurrent_wrapped_calls_equal_sequential(
        delays in prop::collection::vec(0u64..1_000, 1..120),
        threads in 1usize..6,
    ) {
        let key = MethodKey { declaring_type: WEB_FETCHER.path(), method: "fetch", params: &["&str"] };

        let sequential = ProfilerSession::new(Arc::new(ThreadLocalClock));
        let wrapped = sequential.wrap(&WEB_FETCHER, SegmentDelayFetcher).unwrap();
        for delay in &delays {
            wrapped.fetch(&format!("http://site/{delay}")).unwrap();
        }

        let concurrent = ProfilerSession::new(Arc::new(ThreadLocalClock));
        let shared = concurrent.wrap(&WEB_FETCHER, SegmentDelayFetcher).unwrap();
        let chunk = delays.len().div_ceil(threads);
        thread::scope(|scope| {
            for part in delays.chunks(chunk) {
                let shared = &shared;
                scope.spawn(move || {
                    for delay in part {
                        shared.fetch(&format!("http://site/{delay}")).unwrap();
                    }
                });
            }
        });

        let expected = Duration::from_millis(delays.iter().sum());
        prop_assert_eq!(sequential.state().total(&key), Some(expected));
        prop_assert_eq!(concurrent.state().snapshot(), sequential.state().snapshot());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_report_body_independent_of_start_time(
        delays in prop::collection::vec(0u64..100_000, 1..20),
        start_a in 0i64..4_000_000_000,
        start_b in 0i64..4_000_000_000,
    ) {
        let report = |start: i64| {
            let clock = Arc::new(FakeClock::new(chrono::DateTime::<chrono::Utc>::from_timestamp(start, 0).unwrap()));
            let session = ProfilerSession::new(clock.clone());
            let wrapped = session
                .wrap(&WEB_FETCHER, FakeFetcher::new(&clock, &delays))
                .unwrap();
            for (i, _) in delays.iter().enumerate() {
                if i % 3 == 0 {
                    let _ = wrapped.fetch_limited("http://site/", i);
                } else {
                    let _ = wrapped.fetch("http://site/");
                }
            }
            let mut out = Vec::new();
            session.write_report(&mut out).unwrap();
            String::from_utf8(out).unwrap()
        };

        let a = report(start_a);
        let b = report(start_b);
        prop_assert!(a.starts_with("Run at "));
        prop_assert_eq!(utils::report_body(&a), utils::report_body(&b));
    }
}
