#![forbid(unsafe_code)]

use std::collections::BTreeMap;

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Greatest common divisor of all intervals; `None` for an empty set or all zeros.
pub fn gcd_all(values: impl IntoIterator<Item = u64>) -> Option<u64> {
    let out = values.into_iter().fold(0, gcd);
    (out > 0).then_some(out)
}

/// Shared tick length in milliseconds for a set of per-group intervals (seconds).
pub fn poll_delay_ms(intervals_s: impl IntoIterator<Item = u64>) -> Option<u64> {
    gcd_all(intervals_s).map(|secs| secs.saturating_mul(1000))
}

/// Per-group "next eligible" epochs (seconds).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshSchedule {
    next_eligible: BTreeMap<String, u64>,
}

impl RefreshSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_eligible(&self, group: &str) -> Option<u64> {
        self.next_eligible.get(group).copied()
    }

    /// Groups due at `now`, in the order given by `intervals`.
    ///
    /// A group without an entry is due immediately. Every due group's next
    /// eligible epoch becomes `now + interval`.
    pub fn take_due<'a>(
        &mut self,
        now: u64,
        intervals: impl IntoIterator<Item = (&'a str, u64)>,
    ) -> Vec<String> {
        let mut due = Vec::new();
        for (group, interval) in intervals {
            let eligible = *self.next_eligible.entry(group.to_string()).or_insert(now);
            if now >= eligible {
                self.next_eligible
                    .insert(group.to_string(), now.saturating_add(interval));
                due.push(group.to_string());
            }
        }
        due
    }

    /// Makes `group` due on the next tick.
    pub fn forget(&mut self, group: &str) {
        self.next_eligible.remove(group);
    }

    pub fn clear(&mut self) {
        self.next_eligible.clear();
    }
}
