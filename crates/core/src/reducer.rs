#![forbid(unsafe_code)]

use crate::groups::{GroupWindows, RawSample};

/// State transition applied to one group's windows.
#[derive(Clone, Debug, PartialEq)]
pub enum SeriesEvent<'a> {
    /// Replace every window with `defaults`, discarding history.
    Reset(&'a GroupWindows),
    /// No incoming data for this group.
    Ignore,
    Merge {
        incoming: &'a RawSample,
        counter: bool,
        baseline: Option<&'a RawSample>,
    },
}

impl<'a> SeriesEvent<'a> {
    /// `Merge` when the group has data in this poll, `Ignore` otherwise.
    pub fn from_incoming(
        incoming: Option<&'a RawSample>,
        counter: bool,
        baseline: Option<&'a RawSample>,
    ) -> Self {
        match incoming {
            Some(incoming) => Self::Merge {
                incoming,
                counter,
                baseline,
            },
            None => Self::Ignore,
        }
    }
}

/// Pure reducer over one group's windows.
///
/// Counter groups emit `incoming - baseline` per label. Without a baseline (or
/// without a baseline entry for a label) the incoming value is its own
/// baseline, so the first sample of a counter series is always zero. Labels
/// absent from `incoming` keep their windows unchanged.
pub fn reduce(state: &GroupWindows, event: SeriesEvent<'_>) -> GroupWindows {
    match event {
        SeriesEvent::Reset(defaults) => defaults.clone(),
        SeriesEvent::Ignore => state.clone(),
        SeriesEvent::Merge {
            incoming,
            counter,
            baseline,
        } => {
            let mut next = state.clone();
            for (label, value) in incoming {
                let emitted = if counter {
                    let zero_point = baseline
                        .and_then(|base| base.get(label))
                        .copied()
                        .unwrap_or(*value);
                    value - zero_point
                } else {
                    *value
                };
                next.entry(label).push_front(emitted);
            }
            next
        }
    }
}
