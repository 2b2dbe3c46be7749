#![forbid(unsafe_code)]

/// Latch that opens the first time the dashboard becomes visible and stays open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityGate {
    drawn_once: bool,
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this call opened the gate.
    pub fn observe(&mut self, visible: bool) -> bool {
        if visible && !self.drawn_once {
            self.drawn_once = true;
            return true;
        }
        false
    }

    pub fn is_open(&self) -> bool {
        self.drawn_once
    }
}
