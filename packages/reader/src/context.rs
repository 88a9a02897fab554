//! Per-read context handed to every customizer call.

use std::time::Duration;

use uuid::Uuid;

/// Context of one `read_subtree` invocation.
///
/// Created fresh for every read and never shared between reads.
#[derive(Debug, Clone)]
pub struct ReadContext {
    read_id: Uuid,
    call_timeout: Duration,
}

impl ReadContext {
    /// Create a context for a new read.
    #[must_use]
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            read_id: Uuid::new_v4(),
            call_timeout,
        }
    }

    /// Unique id of this read, for correlating log lines.
    pub fn read_id(&self) -> Uuid {
        self.read_id
    }

    /// Timeout applied to each backend call of this read.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}
