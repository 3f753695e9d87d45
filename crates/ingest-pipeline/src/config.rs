//! Pipeline configuration.

use std::time::Duration;

/// Maximum serialized message size the transport accepts.
pub const MAX_MESSAGE_SIZE: u64 = 1 << 22;

/// Worker-pool sizing for the two pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concurrency {
    /// When disabled, each stage runs a single worker.
    pub enabled: bool,
    /// Workers per stage when enabled.
    pub thread_count: usize,
    /// Reserved; not consulted by the pipeline.
    pub pivot_size: usize,
}

impl Default for Concurrency {
    fn default() -> Self {
        Self {
            enabled: true,
            thread_count: 4,
            pivot_size: 0,
        }
    }
}

/// Frame decomposition settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecomposition {
    /// When disabled, raw frames pass through unchanged.
    pub enabled: bool,
    /// Allocation budget per bin; must not exceed [`MAX_MESSAGE_SIZE`].
    pub max_bin_size: u64,
}

impl Default for FrameDecomposition {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bin_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Producer back-pressure settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackPressure {
    /// When disabled, producers never block on capacity.
    pub enabled: bool,
    /// Processed-queue occupancy at which producers park.
    pub queue_capacity: usize,
}

impl Default for BackPressure {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 1_024,
        }
    }
}

/// Configuration for the ingestion frame processor. Fixed once activated,
/// except for the decomposition enable/disable toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub concurrency: Concurrency,
    pub decomposition: FrameDecomposition,
    pub back_pressure: BackPressure,
    /// Worker queue poll interval. Small values reduce shutdown latency at
    /// the cost of idle wakeups.
    pub poll_interval: Duration,
    /// Join timeout for soft shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::default(),
            decomposition: FrameDecomposition::default(),
            back_pressure: BackPressure::default(),
            poll_interval: Duration::from_millis(15),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ProcessorConfig {
    /// Single worker per stage, short poll interval, small buffer.
    pub fn low_latency() -> Self {
        Self {
            concurrency: Concurrency {
                enabled: false,
                thread_count: 1,
                pivot_size: 0,
            },
            back_pressure: BackPressure {
                enabled: true,
                queue_capacity: 64,
            },
            poll_interval: Duration::from_millis(1),
            ..Self::default()
        }
    }

    /// Wide worker pools and a deep buffer for bulk ingestion.
    pub fn high_throughput() -> Self {
        Self {
            concurrency: Concurrency {
                enabled: true,
                thread_count: 8,
                pivot_size: 0,
            },
            back_pressure: BackPressure {
                enabled: true,
                queue_capacity: 4_096,
            },
            ..Self::default()
        }
    }

    /// Number of workers each stage spawns.
    pub(crate) fn workers_per_stage(&self) -> usize {
        if self.concurrency.enabled {
            self.concurrency.thread_count.max(1)
        } else {
            1
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.concurrency.enabled = true;
        self.concurrency.thread_count = thread_count;
        self
    }

    pub fn with_max_bin_size(mut self, max_bin_size: u64) -> Self {
        self.decomposition.enabled = true;
        self.decomposition.max_bin_size = max_bin_size;
        self
    }

    pub fn without_decomposition(mut self) -> Self {
        self.decomposition.enabled = false;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.back_pressure.enabled = true;
        self.back_pressure.queue_capacity = queue_capacity;
        self
    }

    pub fn without_back_pressure(mut self) -> Self {
        self.back_pressure.enabled = false;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }
}
