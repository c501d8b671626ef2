use serde::Serialize;

/// Session-lifetime detection counters. Never decremented; `target <= total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    total: u64,
    target: u64,
}

impl SessionStats {
    /// Adds one tick's counts. `target` is clamped to `total` so a caller can
    /// never break the ordering invariant.
    pub fn record(&mut self, total: usize, target: usize) {
        let total = total as u64;
        let target = (target as u64).min(total);
        self.total = self.total.saturating_add(total);
        self.target = self.target.saturating_add(target);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn target(&self) -> u64 {
        self.target
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "total={} target={}", self.total, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotonic_and_ordered() {
        let mut stats = SessionStats::default();
        let mut prev = stats;
        for (total, target) in [(2, 1), (0, 0), (3, 3), (1, 5)] {
            stats.record(total, target);
            assert!(stats.total() >= prev.total());
            assert!(stats.target() >= prev.target());
            assert!(stats.target() <= stats.total());
            prev = stats;
        }
        assert_eq!(stats.total(), 6);
        assert_eq!(stats.target(), 5);
        assert_eq!(stats.to_string(), "total=6 target=5");
    }
}
