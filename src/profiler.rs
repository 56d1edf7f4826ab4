//! Process-wide profiler session
//!
//! A [`ProfilerSession`] is created once at startup. It fixes the start
//! timestamp printed in report headers, owns the [`ProfilingState`] that all
//! of its wrappers record into, and hands out [`Profiled`] decorators.

use crate::capability::{CapabilityType, EligibilityTable};
use crate::clock::Clock;
use crate::profiling_state::ProfilingState;
use crate::proxy::Profiled;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the profiler
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// Neither the capability nor any ancestor declares a profiled method
    #[error("{type_name} doesn't have profiled methods")]
    IneligibleType { type_name: String },

    #[error("failed to write profiling data to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write profiling data: {0}")]
    Write(#[from] io::Error),
}

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Owner of the shared profiling state and start time
pub struct ProfilerSession {
    clock: Arc<dyn Clock>,
    state: Arc<ProfilingState>,
    start_time: DateTime<Utc>,
}

impl ProfilerSession {
    /// Start a session; the start time is read from `clock` once, here
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start_time = clock.now();
        tracing::debug!(%start_time, "profiler session started");
        Self {
            clock,
            state: Arc::new(ProfilingState::new()),
            start_time,
        }
    }

    /// Wrap `target` as an implementation of `capability`
    ///
    /// Fails with [`ProfilerError::IneligibleType`] when no method in the
    /// capability's hierarchy is marked profiled. No wrapper is built in that
    /// case.
    pub fn wrap<T>(&self, capability: &'static CapabilityType, target: T) -> Result<Profiled<T>> {
        if !capability.has_profiled_methods() {
            return Err(ProfilerError::IneligibleType {
                type_name: capability.path().to_string(),
            });
        }

        let eligible = EligibilityTable::build(capability);
        tracing::debug!(
            capability = capability.path(),
            profiled_methods = eligible.len(),
            "wrapping target for profiling"
        );

        Ok(Profiled::new(
            target,
            capability,
            eligible,
            Arc::clone(&self.clock),
            Arc::clone(&self.state),
        ))
    }

    /// When this session started
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// The state shared by every wrapper of this session
    pub fn state(&self) -> &ProfilingState {
        &self.state
    }

    /// Write the report to `writer`
    ///
    /// A `Run at` header with the start time in RFC 1123 form, one line per
    /// profiled method, then an empty line. The writer is left open.
    pub fn write_report<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "Run at {}", rfc1123(self.start_time))?;
        self.state.write(writer)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Append the report to the file at `path`, creating it if needed
    pub fn write_report_to_path(&self, path: &Path) -> Result<()> {
        let io_err = |source: io::Error| ProfilerError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_report(&mut writer).map_err(|e| match e {
            ProfilerError::Write(source) => io_err(source),
            other => other,
        })?;
        writer.flush().map_err(io_err)?;

        tracing::debug!(path = %path.display(), methods = self.state.len(), "wrote profiling report");
        Ok(())
    }
}

impl std::fmt::Debug for ProfilerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilerSession")
            .field("start_time", &self.start_time)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// RFC 1123 date-time in GMT, e.g. `Tue, 3 Jun 2008 11:05:30 GMT`
fn rfc1123(time: DateTime<Utc>) -> String {
    time.format("%a, %-d %b %Y %H:%M:%S GMT").to_string()
}
