/// Counter for re-prompts after invalid input. `None` means no limit.
#[derive(Debug, Clone, Copy)]
pub struct Attempts {
    limit: Option<u32>,
    used: u32,
}

impl Attempts {
    pub fn new(limit: Option<u32>) -> Self {
        Self { limit, used: 0 }
    }

    /// Record a rejected answer; `false` once the limit is reached
    pub fn record_failure(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        match self.limit {
            Some(limit) => self.used < limit,
            None => true,
        }
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}
