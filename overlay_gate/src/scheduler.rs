use std::time::Duration;

use crate::condition::{FatalReason, GateVerdict};

/// What one poll tick decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerStep {
    /// Not all conditions hold yet; poll again after the interval.
    Continue,
    /// Every condition passed; the continuation has run.
    Finished,
    /// A fatal hook fired; polling has stopped for good.
    Halted(FatalReason),
}

/// Fixed-interval poll driver.
///
/// The scheduler owns nothing but its interval and cancellation state; the
/// evaluation function is passed in per tick so there is no hidden captured
/// context. Cancellation flips before the continuation runs, so a reentrant
/// tick from inside the continuation is a no-op instead of a double fire.
pub struct PollScheduler {
    interval: Duration,
    outcome: Option<SchedulerStep>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        PollScheduler {
            interval,
            outcome: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Has the timer been cancelled, by success or by a fatal halt?
    pub fn is_cancelled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Drive one tick. After the scheduler has finished or halted, further
    /// ticks return the terminal step without evaluating anything.
    pub fn tick(
        &mut self,
        evaluate: &mut dyn FnMut() -> GateVerdict,
        on_all_pass: &mut dyn FnMut(),
    ) -> SchedulerStep {
        if let Some(terminal) = self.outcome.as_ref() {
            return terminal.clone();
        }

        match evaluate() {
            GateVerdict::Pending => SchedulerStep::Continue,
            GateVerdict::Passed => {
                // Cancel first; the continuation may re-enter.
                self.outcome = Some(SchedulerStep::Finished);
                on_all_pass();
                SchedulerStep::Finished
            }
            GateVerdict::Fatal(reason) => {
                let step = SchedulerStep::Halted(reason);
                self.outcome = Some(step.clone());
                step
            }
        }
    }
}
