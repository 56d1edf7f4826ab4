//! Profiling decorator for capability implementations
//!
//! [`Profiled<T>`] owns a target and implements the same capability trait by
//! forwarding every method through [`Profiled::intercept`]. Whether a call is
//! timed is decided by the [`EligibilityTable`] built when the wrapper was
//! created, so the target itself needs no changes. A forwarded signature that
//! the capability never declares is passed through and logged as a warning,
//! once per wrapper and signature.
//!
//! # Example
//!
//! ```
//! use crawl_profiler::capability;
//! use crawl_profiler::clock::SystemClock;
//! use crawl_profiler::profiler::ProfilerSession;
//! use crawl_profiler::proxy::Profiled;
//! use std::sync::Arc;
//!
//! pub trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! capability! {
//!     pub static GREETER: Greeter {
//!         #[profiled] fn greet(&str);
//!     }
//! }
//!
//! impl<T: Greeter> Greeter for Profiled<T> {
//!     fn greet(&self, name: &str) -> String {
//!         self.intercept("greet", &["&str"], || self.target().greet(name))
//!     }
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("hello {name}")
//!     }
//! }
//!
//! let session = ProfilerSession::new(Arc::new(SystemClock));
//! let greeter = session.wrap(&GREETER, English).unwrap();
//! assert_eq!(greeter.greet("crawler"), "hello crawler");
//! assert_eq!(session.state().len(), 1);
//! ```

use crate::capability::{CapabilityType, Eligibility, EligibilityTable, MethodKey};
use crate::clock::{self, Clock};
use crate::profiling_state::ProfilingState;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Transparent timing wrapper around a capability implementation
pub struct Profiled<T> {
    target: T,
    capability: &'static CapabilityType,
    eligible: EligibilityTable,
    clock: Arc<dyn Clock>,
    state: Arc<ProfilingState>,
    undeclared: Mutex<HashSet<(&'static str, &'static [&'static str])>>,
}

impl<T> Profiled<T> {
    /// Assemble a wrapper; eligibility must already have been checked
    pub(crate) fn new(
        target: T,
        capability: &'static CapabilityType,
        eligible: EligibilityTable,
        clock: Arc<dyn Clock>,
        state: Arc<ProfilingState>,
    ) -> Self {
        Self {
            target,
            capability,
            eligible,
            clock,
            state,
            undeclared: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped object
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Unwrap, dropping the profiling hooks
    pub fn into_inner(self) -> T {
        self.target
    }

    /// The capability this wrapper was created for
    pub fn capability(&self) -> &'static CapabilityType {
        self.capability
    }

    /// Run one forwarded call
    ///
    /// `method` and `params` name the declaration being invoked, exactly as
    /// written in the capability's descriptor. Profiled methods are timed with
    /// the session clock and recorded once, whether `call` returns normally or
    /// unwinds. Everything else runs `call` directly; a signature missing from
    /// the descriptor is warned about first. The return value, including any
    /// `Err`, is handed back untouched.
    pub fn intercept<R>(
        &self,
        method: &'static str,
        params: &'static [&'static str],
        call: impl FnOnce() -> R,
    ) -> R {
        match self.eligible.lookup(method, params) {
            Eligibility::Profiled(key) => {
                let _timer = CallTimer::start(key, self.clock.as_ref(), &self.state);
                call()
            }
            Eligibility::Plain => call(),
            Eligibility::Undeclared => {
                self.warn_undeclared(method, params);
                call()
            }
        }
    }

    fn warn_undeclared(&self, method: &'static str, params: &'static [&'static str]) {
        let first = self
            .undeclared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((method, params));
        if first {
            tracing::warn!(
                capability = self.capability.path(),
                method,
                ?params,
                "forwarded call matches no declared method; not profiled"
            );
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Profiled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiled")
            .field("capability", &self.capability.path())
            .field("profiled_methods", &self.eligible.len())
            .field("target", &self.target)
            .finish()
    }
}

/// Records the elapsed time of one call when dropped
struct CallTimer<'a> {
    key: &'a MethodKey,
    clock: &'a dyn Clock,
    state: &'a ProfilingState,
    start: DateTime<Utc>,
}

impl<'a> CallTimer<'a> {
    fn start(key: &'a MethodKey, clock: &'a dyn Clock, state: &'a ProfilingState) -> Self {
        Self {
            key,
            clock,
            state,
            start: clock.now(),
        }
    }
}

impl Drop for CallTimer<'_> {
    fn drop(&mut self) {
        let end = self.clock.now();
        let elapsed = clock::elapsed_between(self.start, end).unwrap_or_else(|| {
            tracing::warn!(
                method = %self.key,
                start = %self.start,
                end = %end,
                "clock went backwards during profiled call; recording zero"
            );
            Default::default()
        });
        self.state.record(self.key, elapsed);
    }
}
