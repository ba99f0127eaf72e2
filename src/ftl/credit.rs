/// Write-flow credit scheduler: admission control that triggers foreground
/// GC when the credit pool is depleted.
pub struct WriteFlowController {
    credits: i64,
    credits_to_refill: u32,
}

impl WriteFlowController {
    pub fn new(pgs_per_line: u32) -> Self {
        WriteFlowController { credits: pgs_per_line as i64, credits_to_refill: pgs_per_line }
    }

    pub fn credits(&self) -> i64 {
        self.credits
    }

    pub fn is_depleted(&self) -> bool {
        self.credits <= 0
    }

    /// Refill by the amount set by the last GC pass (or `pgs_per_line` if
    /// no GC has run since init).
    pub fn refill(&mut self) {
        self.credits += self.credits_to_refill as i64;
    }

    /// Recorded by the GC as `victim.ipc` right after victim selection
    /// (§4.6 step 2), consumed by the next `refill()`.
    pub fn set_refill_amount(&mut self, amount: u32) {
        self.credits_to_refill = amount;
    }

    pub fn consume_one(&mut self) {
        self.credits -= 1;
    }
}
