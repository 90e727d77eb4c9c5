/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub retracted: usize,
    pub claimed: usize,
    pub notified: usize,
    pub notify_failed: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.retracted > 0 || self.claimed > 0
    }
}
