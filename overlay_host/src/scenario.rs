use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use overlay_gate::{
    FailsafeState, HostProbe, Notifier, OverlaySession, PageDom, SchedulerStep, Settings,
    ToastRequest,
};
use serde::Serialize;

/// Scripted environments the harness can replay against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Everything comes up in stages; the overlay arms.
    Happy,
    /// The substitute script never loads; the failsafe reverts.
    Revert,
    /// The host runs an unsupported version; the loop halts with a toast.
    WrongVersion,
}

impl Scenario {
    pub fn parse(slug: &str) -> Result<Self> {
        match slug {
            "happy" => Ok(Scenario::Happy),
            "revert" => Ok(Scenario::Revert),
            "wrong-version" => Ok(Scenario::WrongVersion),
            other => bail!("unknown scenario '{other}' (expected happy, revert, wrong-version)"),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Scenario::Happy => "happy",
            Scenario::Revert => "revert",
            Scenario::WrongVersion => "wrong-version",
        }
    }
}

#[derive(Default)]
struct World {
    scripts: Vec<String>,
    styles: Vec<String>,
    toasts: Vec<ToastRequest>,
    notify_ready: bool,
    modified_loaded: bool,
    version: Option<String>,
    started: bool,
    vehicle: bool,
    metrics: BTreeMap<String, f64>,
}

/// Fake page/host the scenarios mutate between ticks.
#[derive(Clone, Default)]
struct ScriptedHost(Rc<RefCell<World>>);

impl ScriptedHost {
    fn seeded() -> Self {
        let host = ScriptedHost::default();
        {
            let mut world = host.0.borrow_mut();
            world.metrics = [
                ("accel".to_string(), 10.0),
                ("topSpeed".to_string(), 120.0),
                ("mass".to_string(), 1500.0),
            ]
            .into_iter()
            .collect();
        }
        host
    }

    /// Apply the scenario's staged external events for one tick.
    fn advance(&self, scenario: Scenario, tick: u64, supported_version: &str) {
        let mut world = self.0.borrow_mut();
        // The notification library's script tag executes shortly after the
        // loader appends it.
        if tick >= 2 && world.scripts.iter().any(|s| s.contains("toastify")) {
            world.notify_ready = true;
        }
        match scenario {
            Scenario::Happy => {
                if tick >= 3 {
                    world.modified_loaded = true;
                    world.version = Some(supported_version.to_string());
                }
                if tick >= 5 {
                    world.started = true;
                }
                if tick >= 8 {
                    world.vehicle = true;
                }
            }
            Scenario::Revert => {
                // The mirror request hangs forever; nothing else matters.
                world.version = Some(supported_version.to_string());
            }
            Scenario::WrongVersion => {
                if tick >= 3 {
                    world.modified_loaded = true;
                    world.version = Some("0.0.1".to_string());
                }
            }
        }
    }
}

impl PageDom for ScriptedHost {
    fn append_script(&self, url: &str) {
        self.0.borrow_mut().scripts.push(url.to_string());
    }

    fn append_style(&self, url: &str) {
        self.0.borrow_mut().styles.push(url.to_string());
    }
}

impl Notifier for ScriptedHost {
    fn show_toast(&self, request: &ToastRequest) {
        self.0.borrow_mut().toasts.push(request.clone());
    }
}

impl HostProbe for ScriptedHost {
    fn notification_library_ready(&self) -> bool {
        self.0.borrow().notify_ready
    }

    fn modified_script_loaded(&self) -> bool {
        self.0.borrow().modified_loaded
    }

    fn host_version(&self) -> Option<String> {
        self.0.borrow().version.clone()
    }

    fn host_started(&self) -> bool {
        self.0.borrow().started
    }

    fn vehicle_present(&self) -> bool {
        self.0.borrow().vehicle
    }

    fn read_metric(&self, key: &str) -> Option<f64> {
        let world = self.0.borrow();
        if !world.vehicle {
            return None;
        }
        world.metrics.get(key).copied()
    }

    fn write_metric(&self, key: &str, value: f64) -> bool {
        let mut world = self.0.borrow_mut();
        if !world.vehicle {
            return false;
        }
        world.metrics.insert(key.to_string(), value);
        true
    }
}

/// How a scenario run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Ready { ticks: u64 },
    Halted { condition: String, ticks: u64 },
    TimedOut { ticks: u64 },
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub scenario: &'static str,
    pub outcome: Outcome,
    pub failsafe: String,
    pub appended_scripts: Vec<String>,
    pub appended_styles: Vec<String>,
    pub toasts: Vec<ToastRequest>,
    pub events: Vec<String>,
}

impl ScenarioReport {
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("serializing scenario report to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing scenario report to {}", path.display()))?;
        Ok(())
    }
}

/// Replay one scenario against a fresh session, simulated time only.
pub fn run(scenario: Scenario, settings: Settings, max_ticks: u64, verbose: bool) -> Result<ScenarioReport> {
    let host = ScriptedHost::seeded();
    let supported = settings.supported_version.clone();
    let mut session = OverlaySession::new(
        settings,
        Rc::new(host.clone()),
        Rc::new(host.clone()),
        Rc::new(host.clone()),
        verbose,
    )?;

    // The page requests an unrelated chunk first, then its primary script.
    session.on_script_request("https://slowroads.io/static/js/vendor.chunk.js")?;
    session.on_script_request("https://slowroads.io/static/js/main.e7a33c55.chunk.js")?;

    let mut outcome = Outcome::TimedOut { ticks: max_ticks };
    for tick in 1..=max_ticks {
        host.advance(scenario, tick, &supported);
        match session.tick() {
            SchedulerStep::Continue => continue,
            SchedulerStep::Finished => {
                outcome = Outcome::Ready { ticks: tick };
                break;
            }
            SchedulerStep::Halted(reason) => {
                outcome = Outcome::Halted {
                    condition: reason.condition,
                    ticks: tick,
                };
                break;
            }
        }
    }

    let failsafe = match session.failsafe_state() {
        FailsafeState::WaitingForOriginal => "waiting_for_original",
        FailsafeState::Substituted => "substituted",
        FailsafeState::Reverted => "reverted",
    }
    .to_string();

    let world = host.0.borrow();
    Ok(ScenarioReport {
        scenario: scenario.slug(),
        outcome,
        failsafe,
        appended_scripts: world.scripts.clone(),
        appended_styles: world.styles.clone(),
        toasts: world.toasts.clone(),
        events: session.trace().events(),
    })
}

#[cfg(test)]
mod tests {
    use super::{run, Outcome, Scenario};
    use overlay_gate::Settings;

    #[test]
    fn happy_scenario_arms_the_overlay() {
        let report = run(Scenario::Happy, Settings::default(), 50, false).unwrap();
        assert!(matches!(report.outcome, Outcome::Ready { .. }));
        assert_eq!(report.failsafe, "substituted");
        // Substitute + notification script; no reissued original.
        assert!(!report.appended_scripts.iter().any(|s| s.ends_with("?ignore")));
        assert_eq!(report.toasts.len(), 2);
    }

    #[test]
    fn revert_scenario_restores_the_original_script() {
        let mut settings = Settings::default();
        settings.substitute_grace_ticks = 5;
        let report = run(Scenario::Revert, settings, 50, false).unwrap();

        assert!(matches!(
            report.outcome,
            Outcome::Halted { ref condition, .. } if condition == "Modified script"
        ));
        assert_eq!(report.failsafe, "reverted");
        assert!(report.appended_scripts.iter().any(|s| s.ends_with("?ignore")));
    }

    #[test]
    fn wrong_version_scenario_halts_with_a_warning() {
        let report = run(Scenario::WrongVersion, Settings::default(), 50, false).unwrap();

        assert!(matches!(
            report.outcome,
            Outcome::Halted { ref condition, .. } if condition == "Host version"
        ));
        assert_eq!(report.failsafe, "substituted");
        assert_eq!(report.toasts.len(), 1);
    }

    #[test]
    fn scenario_slugs_roundtrip() {
        for scenario in [Scenario::Happy, Scenario::Revert, Scenario::WrongVersion] {
            assert_eq!(Scenario::parse(scenario.slug()).unwrap(), scenario);
        }
        assert!(Scenario::parse("nope").is_err());
    }
}
