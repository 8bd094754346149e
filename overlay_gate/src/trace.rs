use std::cell::RefCell;
use std::rc::Rc;

/// Shared log of everything the engine did, in order.
///
/// Hook messages, dependency loads, and failsafe transitions all land here so
/// the host can dump them and tests can assert on them. When verbose, each
/// line is mirrored to stderr under the crate tag.
#[derive(Clone, Default)]
pub struct EventTrace {
    inner: Rc<RefCell<TraceInner>>,
}

#[derive(Default)]
struct TraceInner {
    events: Vec<String>,
    verbose: bool,
}

impl EventTrace {
    pub fn new(verbose: bool) -> Self {
        EventTrace {
            inner: Rc::new(RefCell::new(TraceInner {
                events: Vec::new(),
                verbose,
            })),
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        let mut inner = self.inner.borrow_mut();
        if inner.verbose {
            eprintln!("[overlay_gate] {line}");
        }
        inner.events.push(line);
    }

    /// Log under a condition heading, matching the per-condition log format
    /// of the readiness loop.
    pub fn condition(&self, name: &str, message: &str) {
        self.log(format!("[condition: {name}] {message}"));
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.borrow().events.clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.inner
            .borrow()
            .events
            .iter()
            .any(|event| event.contains(needle))
    }

    /// How many trace lines contain the needle. Used by once-flag tests.
    pub fn count(&self, needle: &str) -> usize {
        self.inner
            .borrow()
            .events
            .iter()
            .filter(|event| event.contains(needle))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::EventTrace;

    #[test]
    fn trace_preserves_order_and_counts() {
        let trace = EventTrace::new(false);
        trace.log("first");
        trace.condition("Host version", "checking");
        trace.log("first again: first");

        assert_eq!(trace.events().len(), 3);
        assert!(trace.contains("[condition: Host version] checking"));
        assert_eq!(trace.count("first"), 2);
    }
}
