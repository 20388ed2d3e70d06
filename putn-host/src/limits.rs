//! Store resource limits and linear-memory tracking.

use tracing::{debug, warn};
use wasmtime::ResourceLimiter;

/// Resource limits applied to the module's store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Ceiling on the total linear-memory bytes of the store. `None` leaves
    /// the engine's own limit.
    pub max_memory_bytes: Option<usize>,
    /// Maximum elements any single table may grow to.
    pub max_table_elements: usize,
    /// Maximum instances created in the store.
    pub max_instances: usize,
    /// Maximum tables created in the store.
    pub max_tables: usize,
    /// Maximum linear memories created in the store.
    pub max_memories: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            max_table_elements: 20_000,
            max_instances: 10,
            max_tables: 100,
            max_memories: 10,
        }
    }
}

impl ResourceLimits {
    pub fn with_max_memory(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }
}

/// Growth approved by the limiter but not yet known to have succeeded.
#[derive(Debug, Clone, Copy)]
struct PendingGrowth {
    delta: usize,
    peak_before: usize,
}

/// A resource limiter that tracks linear-memory size as it grows.
///
/// Sizes are summed across all memories in the store. A growth that the
/// engine rejects after the limiter approved it is rolled back in
/// `memory_grow_failed`.
pub struct TrackingLimiter {
    limits: ResourceLimits,
    current_memory: usize,
    peak_memory: usize,
    pending: Option<PendingGrowth>,
}

impl TrackingLimiter {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            current_memory: 0,
            peak_memory: 0,
            pending: None,
        }
    }

    pub fn current_memory_bytes(&self) -> usize {
        self.current_memory
    }

    pub fn peak_memory_bytes(&self) -> usize {
        self.peak_memory
    }
}

impl ResourceLimiter for TrackingLimiter {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        self.pending = None;

        if let Some(max) = maximum {
            if desired > max {
                debug!(
                    current = current,
                    desired = desired,
                    max = max,
                    "Memory growth denied - exceeds declared maximum"
                );
                return Ok(false);
            }
        }

        let delta = desired.saturating_sub(current);
        if let Some(max) = self.limits.max_memory_bytes {
            if self.current_memory + delta > max {
                warn!(
                    current = current,
                    desired = desired,
                    max = max,
                    "Memory growth denied - would exceed limit"
                );
                return Ok(false);
            }
        }

        debug!(current = current, desired = desired, "Memory growing");
        self.pending = Some(PendingGrowth {
            delta,
            peak_before: self.peak_memory,
        });
        self.current_memory += delta;
        self.peak_memory = self.peak_memory.max(self.current_memory);
        Ok(true)
    }

    fn memory_grow_failed(&mut self, error: anyhow::Error) -> anyhow::Result<()> {
        if let Some(pending) = self.pending.take() {
            self.current_memory -= pending.delta;
            self.peak_memory = pending.peak_before;
        }
        debug!(error = %error, "Memory growth failed after approval");
        Ok(())
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> anyhow::Result<bool> {
        Ok(desired <= self.limits.max_table_elements)
    }

    fn instances(&self) -> usize {
        self.limits.max_instances
    }

    fn tables(&self) -> usize {
        self.limits.max_tables
    }

    fn memories(&self) -> usize {
        self.limits.max_memories
    }
}
