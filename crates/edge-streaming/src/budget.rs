//! Cooperative yielding for long synchronous runs.

use std::task::{Context, Poll};

/// Counts consecutive synchronous render steps.
///
/// Once `max` steps have run without the task yielding, the next tick wakes
/// the task and returns `Pending`, deferring the walk by one scheduler turn.
#[derive(Debug)]
pub struct WriteBudget {
    max: usize,
    count: usize,
}

impl WriteBudget {
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            count: 0,
        }
    }

    /// Account for one synchronous step.
    pub fn tick(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.count += 1;
        if self.count >= self.max {
            self.count = 0;
            cx.waker().wake_by_ref();
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }

    /// Restart the count after the task yielded for another reason.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
