/// Default number of resends after a stream closes before `[DONE]`.
pub const MAX_RESENDS: u32 = 3;

/// Bound on re-issuing a request whose stream closed cleanly before the
/// terminal sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendPolicy {
    pub max_resends: u32,
}

impl Default for ResendPolicy {
    fn default() -> Self {
        Self {
            max_resends: MAX_RESENDS,
        }
    }
}

impl ResendPolicy {
    pub fn new(max_resends: u32) -> Self {
        Self { max_resends }
    }

    /// Total attempts including the first send.
    pub fn max_attempts(&self) -> u32 {
        self.max_resends.saturating_add(1)
    }

    /// Whether another attempt may follow attempt number `attempt` (0-based).
    pub fn allows_resend(&self, attempt: u32) -> bool {
        attempt < self.max_resends
    }
}
