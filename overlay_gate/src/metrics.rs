use std::collections::BTreeMap;

use serde::Serialize;

use crate::boundary::HostProbe;

/// The fixed key set of the host's numeric tuning bag. The engine treats the
/// bag as opaque; these are the keys the overlay rebinds.
pub const METRIC_KEYS: [&str; 17] = [
    "accel",
    "topSpeed",
    "brake",
    "reverse",
    "aeroFactor",
    "dampening",
    "drag",
    "jerk",
    "rockFactor",
    "rollResistance",
    "slipBase",
    "slipMod",
    "maxSteer",
    "steerSpeed",
    "steerAccel",
    "steerInterval",
    "mass",
];

/// Snapshot of every metric taken right after the readiness chain passes,
/// so a later reset can restore the host's own defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricBaseline {
    values: BTreeMap<String, f64>,
}

impl MetricBaseline {
    /// Capture the current value of every known key. Keys the probe cannot
    /// reach are left out of the snapshot.
    pub fn capture(probe: &dyn HostProbe) -> Self {
        let mut values = BTreeMap::new();
        for key in METRIC_KEYS {
            if let Some(value) = probe.read_metric(key) {
                values.insert(key.to_string(), value);
            }
        }
        MetricBaseline { values }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Write the snapshot back through the probe. Returns how many keys
    /// were actually written.
    pub fn reset(&self, probe: &dyn HostProbe) -> usize {
        let mut written = 0;
        for (key, value) in &self.values {
            if probe.write_metric(key, *value) {
                written += 1;
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::{MetricBaseline, METRIC_KEYS};
    use crate::boundary::HostProbe;

    struct FakeBag {
        metrics: RefCell<BTreeMap<String, f64>>,
    }

    impl FakeBag {
        fn with(pairs: &[(&str, f64)]) -> Self {
            FakeBag {
                metrics: RefCell::new(
                    pairs
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect(),
                ),
            }
        }
    }

    impl HostProbe for FakeBag {
        fn notification_library_ready(&self) -> bool {
            true
        }
        fn modified_script_loaded(&self) -> bool {
            true
        }
        fn host_version(&self) -> Option<String> {
            None
        }
        fn host_started(&self) -> bool {
            true
        }
        fn vehicle_present(&self) -> bool {
            true
        }
        fn read_metric(&self, key: &str) -> Option<f64> {
            self.metrics.borrow().get(key).copied()
        }
        fn write_metric(&self, key: &str, value: f64) -> bool {
            self.metrics.borrow_mut().insert(key.to_string(), value);
            true
        }
    }

    #[test]
    fn capture_skips_unreachable_keys() {
        let bag = FakeBag::with(&[("accel", 10.0), ("mass", 1500.0)]);
        let baseline = MetricBaseline::capture(&bag);

        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline.get("accel"), Some(10.0));
        assert_eq!(baseline.get("drag"), None);
    }

    #[test]
    fn reset_restores_the_snapshot() {
        let bag = FakeBag::with(&[("accel", 10.0), ("topSpeed", 120.0)]);
        let baseline = MetricBaseline::capture(&bag);

        bag.write_metric("accel", 99.0);
        bag.write_metric("topSpeed", 260.0);

        let written = baseline.reset(&bag);
        assert_eq!(written, 2);
        assert_eq!(bag.read_metric("accel"), Some(10.0));
        assert_eq!(bag.read_metric("topSpeed"), Some(120.0));
    }

    #[test]
    fn key_set_is_stable() {
        assert_eq!(METRIC_KEYS.len(), 17);
        assert!(METRIC_KEYS.contains(&"rollResistance"));
    }
}
