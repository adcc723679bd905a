/// Scales a byte count to an integer percentage in `0..=100`.
///
/// A zero `total` counts as done.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total);
    ((sent as u128 * 100) / total as u128) as u8
}

/// Accumulates bytes handed to the transport and reports percentage
/// changes only when the integer value moves forward.
#[derive(Debug, Clone)]
pub struct ByteProgress {
    total: u64,
    sent: u64,
    last_pct: Option<u8>,
}

impl ByteProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            last_pct: None,
        }
    }

    /// Adds `bytes` and returns the new percentage if it increased.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let pct = percent_of(self.sent, self.total);
        match self.last_pct {
            Some(last) if pct <= last => None,
            _ => {
                self.last_pct = Some(pct);
                Some(pct)
            }
        }
    }

    /// Returns the bytes counted so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Returns the expected body size.
    pub fn total(&self) -> u64 {
        self.total
    }
}
