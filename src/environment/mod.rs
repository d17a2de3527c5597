//! Process role and accelerator backend lookup
//!
//! The recorder never asks the distributed runtime directly; it is handed a
//! `JobEnvironment` so coordinator gating stays deterministic under test.

use crate::config::RecorderFlags;

/// Environment variable holding this process's index in the job.
pub const PROCESS_INDEX_VAR: &str = "PROCESS_INDEX";

/// Environment variable holding the accelerator backend kind.
pub const BACKEND_KIND_VAR: &str = "ACCELERATOR_BACKEND";

/// Index reported when the configured index cannot be parsed.
///
/// Never the coordinator, so a misconfigured process does not upload.
pub const UNKNOWN_PROCESS_INDEX: usize = usize::MAX;

/// Process-role and backend-kind oracle.
pub trait JobEnvironment: Send + Sync {
    /// Index of this process in the distributed job
    fn process_index(&self) -> usize;

    /// Accelerator backend identifier, if known
    fn backend_kind(&self) -> Option<String>;

    /// Process 0 owns singleton duties such as metric upload
    fn is_coordinator(&self) -> bool {
        self.process_index() == 0
    }
}

/// Fixed process index and backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEnvironment {
    pub process_index: usize,
    pub backend_kind: Option<String>,
}

impl StaticEnvironment {
    pub fn new(process_index: usize, backend_kind: Option<String>) -> Self {
        Self {
            process_index,
            backend_kind,
        }
    }

    pub fn coordinator(backend_kind: impl Into<String>) -> Self {
        Self::new(0, Some(backend_kind.into()))
    }

    /// Take the backend from `--jax_backend`.
    pub fn from_flags(flags: &RecorderFlags, process_index: usize) -> Self {
        Self::new(process_index, flags.jax_backend.clone())
    }
}

impl JobEnvironment for StaticEnvironment {
    fn process_index(&self) -> usize {
        self.process_index
    }

    fn backend_kind(&self) -> Option<String> {
        self.backend_kind.clone()
    }
}

/// Reads role and backend from environment variables on every call.
#[derive(Debug, Clone)]
pub struct EnvironmentVariables {
    index_var: String,
    backend_var: String,
}

impl Default for EnvironmentVariables {
    fn default() -> Self {
        Self::new(PROCESS_INDEX_VAR, BACKEND_KIND_VAR)
    }
}

impl EnvironmentVariables {
    pub fn new(index_var: impl Into<String>, backend_var: impl Into<String>) -> Self {
        Self {
            index_var: index_var.into(),
            backend_var: backend_var.into(),
        }
    }
}

impl JobEnvironment for EnvironmentVariables {
    fn process_index(&self) -> usize {
        match std::env::var(&self.index_var) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(
                    "Ignoring unparseable {}={:?} ({}); treating this process as a worker",
                    self.index_var,
                    raw,
                    e
                );
                UNKNOWN_PROCESS_INDEX
            }),
            // Single-process jobs do not set an index
            Err(_) => 0,
        }
    }

    fn backend_kind(&self) -> Option<String> {
        std::env::var(&self.backend_var)
            .ok()
            .filter(|v| !v.is_empty())
    }
}
