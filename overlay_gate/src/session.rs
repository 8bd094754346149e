use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;

use crate::boundary::{HostProbe, Notifier, PageDom, ToastRequest, ToastStyle};
use crate::condition::{Condition, ConditionGate, GateVerdict, HookSpec};
use crate::dependency::{Dependency, ResourceLoader};
use crate::error::GateError;
use crate::failsafe::{FailsafeState, InterceptDecision, ScriptInterceptionFailsafe};
use crate::metrics::{MetricBaseline, METRIC_KEYS};
use crate::resolve::{Resolution, Resolvable};
use crate::scheduler::{PollScheduler, SchedulerStep};
use crate::settings::Settings;
use crate::trace::EventTrace;

/// Name of the condition whose fatal failure triggers the revert.
const SUBSTITUTE_CONDITION: &str = "Modified script";

const MODIFIED_SCRIPT_DEP: &str = "modified-script";
const NOTIFY_DEP: &str = "notification-library";

/// One page lifetime of the overlay: interception, dependency loading, the
/// readiness loop, and the continuation that arms the tuning overlay.
pub struct OverlaySession {
    settings: Settings,
    trace: EventTrace,
    page: Rc<dyn PageDom>,
    notifier: Rc<dyn Notifier>,
    probe: Rc<dyn HostProbe>,
    failsafe: Rc<RefCell<ScriptInterceptionFailsafe>>,
    loader: ResourceLoader,
    gate: ConditionGate,
    scheduler: PollScheduler,
    polling: bool,
    ready: bool,
    baseline: Option<MetricBaseline>,
}

impl OverlaySession {
    pub fn new(
        settings: Settings,
        page: Rc<dyn PageDom>,
        notifier: Rc<dyn Notifier>,
        probe: Rc<dyn HostProbe>,
        verbose: bool,
    ) -> Result<Self, GateError> {
        let trace = EventTrace::new(verbose);
        let failsafe = Rc::new(RefCell::new(ScriptInterceptionFailsafe::new(
            &settings.script_pattern,
            settings.bypass_marker.clone(),
            settings.substitute_prefix.clone(),
            settings.substitute_suffix.clone(),
            trace.clone(),
        )?));

        let mut loader = ResourceLoader::new(page.clone(), trace.clone());
        let lazy_failsafe = failsafe.clone();
        let loaded_probe = probe.clone();
        loader.register(
            Dependency::new(MODIFIED_SCRIPT_DEP, move || {
                loaded_probe.modified_script_loaded()
            })
            .with_script(Resolvable::lazy(move || {
                match lazy_failsafe.borrow().substitute_url() {
                    Some(url) => Resolution::Ready(url.to_string()),
                    None => Resolution::NotYet,
                }
            })),
        )?;
        let notify_probe = probe.clone();
        loader.register(
            Dependency::new(NOTIFY_DEP, move || notify_probe.notification_library_ready())
                .with_script(Resolvable::literal(settings.notify_script_url.clone()))
                .with_style(Resolvable::literal(settings.notify_style_url.clone())),
        )?;

        let gate = ConditionGate::new(
            standard_conditions(&settings, probe.clone(), notifier.clone()),
            trace.clone(),
        )?;
        let scheduler = PollScheduler::from_millis(settings.poll_interval_ms);

        Ok(OverlaySession {
            settings,
            trace,
            page,
            notifier,
            probe,
            failsafe,
            loader,
            gate,
            scheduler,
            polling: false,
            ready: false,
            baseline: None,
        })
    }

    pub fn trace(&self) -> &EventTrace {
        &self.trace
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn failsafe_state(&self) -> FailsafeState {
        self.failsafe.borrow().state()
    }

    pub fn baseline(&self) -> Option<&MetricBaseline> {
        self.baseline.as_ref()
    }

    /// Feed one outgoing script load through the failsafe. On interception
    /// the session loads its dependencies (the substitute script among
    /// them) and starts the readiness loop; the caller only has to cancel
    /// the native load.
    pub fn on_script_request(&mut self, url: &str) -> Result<InterceptDecision, GateError> {
        let decision = self.failsafe.borrow_mut().on_script_request(url);
        if let InterceptDecision::CancelAndSubstitute { .. } = &decision {
            self.loader.load_all(None)?;
            self.polling = true;
            self.trace.log("readiness loop started");
        }
        Ok(decision)
    }

    /// Drive one poll tick. Before interception this is a no-op.
    pub fn tick(&mut self) -> SchedulerStep {
        if !self.polling {
            return SchedulerStep::Continue;
        }

        let gate = &mut self.gate;
        let finished = Cell::new(false);
        let step = self.scheduler.tick(&mut || gate.evaluate_all(), &mut || {
            finished.set(true)
        });

        if finished.get() {
            self.complete();
        }
        if let SchedulerStep::Halted(reason) = &step {
            if reason.condition == SUBSTITUTE_CONDITION {
                self.revert();
            }
        }
        step
    }

    /// Blocking variant for a live page: poll at the configured interval
    /// until the loop finishes or halts.
    pub fn run(&mut self) -> SchedulerStep {
        loop {
            match self.tick() {
                SchedulerStep::Continue => thread::sleep(self.scheduler.interval()),
                terminal => return terminal,
            }
        }
    }

    /// Write one tuning value. Refused for unknown keys or before the
    /// readiness chain has passed.
    pub fn write_metric(&self, key: &str, value: f64) -> bool {
        if !self.ready || !METRIC_KEYS.contains(&key) {
            return false;
        }
        self.probe.write_metric(key, value)
    }

    pub fn read_metric(&self, key: &str) -> Option<f64> {
        self.probe.read_metric(key)
    }

    /// Restore every captured default. Tells the user off when the
    /// defaults were never captured.
    pub fn reset_metrics(&mut self) {
        let Some(baseline) = self.baseline.as_ref() else {
            self.notifier.show_toast(&ToastRequest::new(
                "Can't reset the tuning values. Default values have not been initialized yet.",
                ToastStyle::Default,
                5_000,
            ));
            return;
        };
        let written = baseline.reset(self.probe.as_ref());
        self.trace
            .log(format!("reset {written} tuning values to their defaults"));
    }

    /// All conditions passed: snapshot the host's defaults and greet.
    fn complete(&mut self) {
        self.ready = true;
        self.baseline = Some(MetricBaseline::capture(self.probe.as_ref()));
        self.trace.log(format!(
            "passed all conditions, captured {} default tuning values",
            self.baseline.as_ref().map(MetricBaseline::len).unwrap_or(0)
        ));
        self.notifier.show_toast(&ToastRequest::new(
            "You can open the tuning overlay by pressing the cog in the top left corner.",
            ToastStyle::Default,
            25_000,
        ));
        self.notifier.show_toast(&ToastRequest::new(
            "Now driving with the tuning overlay. Have fun out there :)",
            ToastStyle::Info,
            12_000,
        ));
    }

    /// The substitute never proved itself: warn, reissue the original under
    /// the bypass marker, and leave the loop halted.
    fn revert(&mut self) {
        let Some(reissue) = self.failsafe.borrow_mut().revert() else {
            return;
        };
        self.notifier.show_toast(&ToastRequest::new(
            "The modified host script never became ready. Restored the original script; \
             the tuning overlay is disabled for this session.",
            ToastStyle::Error,
            0,
        ));
        self.page.append_script(&reissue);
    }
}

/// The standard readiness chain, in dependency order: the notification
/// library must be callable before any fatal hook can toast, the substitute
/// script must be in before the version element means anything, and the
/// vehicle only exists once the host has started.
fn standard_conditions(
    settings: &Settings,
    probe: Rc<dyn HostProbe>,
    notifier: Rc<dyn Notifier>,
) -> Vec<Condition> {
    let notify_probe = probe.clone();
    let notification_library = Condition::new("Notification library", move || {
        notify_probe.notification_library_ready()
    })
    .before_check(HookSpec::message(
        "Waiting for the notification library to finish loading...",
    ))
    .on_pass(HookSpec::message("Dependency successfully loaded."))
    .on_fail(HookSpec::repeating_message("Dependency has not loaded yet."));

    // Grace window for the substitute: passes once the script loads or the
    // tick budget runs out, so the strict check below stays unreachable
    // until the window closes.
    let grace_ticks = settings.substitute_grace_ticks;
    let attempts = Cell::new(0u32);
    let grace_probe = probe.clone();
    let grace = Condition::new("Modified script window", move || {
        if grace_probe.modified_script_loaded() {
            return true;
        }
        attempts.set(attempts.get() + 1);
        attempts.get() > grace_ticks
    })
    .before_check(HookSpec::message(
        "Waiting for the modified host script to load...",
    ))
    .on_fail(HookSpec::repeating_message(
        "Modified script has not loaded yet.",
    ));

    let strict_probe = probe.clone();
    let substitute = Condition::new(SUBSTITUTE_CONDITION, move || {
        strict_probe.modified_script_loaded()
    })
    .on_pass(HookSpec::message("Modified script is in place."))
    .on_fail(
        HookSpec::message("Modified script failed to load within the grace window.").fatal(),
    );

    let supported = settings.supported_version.clone();
    let version_probe = probe.clone();
    let version_notifier = notifier.clone();
    let host_version = Condition::new("Host version", move || {
        version_probe.host_version().as_deref() == Some(supported.as_str())
    })
    .before_check(HookSpec::message(format!(
        "Required host version: '{}'.",
        settings.supported_version
    )))
    .on_pass(HookSpec::message("The host version is supported."))
    .on_fail(
        HookSpec::message(
            "Host version is not supported. Please check for a newer release of the overlay.",
        )
        .with_run(move || {
            version_notifier.show_toast(&ToastRequest::new(
                "The host version is not supported. Please check for a newer release of the \
                 tuning overlay.",
                ToastStyle::Error,
                100_000,
            ));
        })
        .fatal(),
    );

    let start_probe = probe.clone();
    let host_start = Condition::new("Host start", move || start_probe.host_started())
        .before_check(HookSpec::message(
            "Waiting for the host to start (press 'begin')...",
        ))
        .on_pass(HookSpec::message("The host has started."));

    let vehicle_probe = probe;
    let vehicle = Condition::new("Vehicle spawn", move || vehicle_probe.vehicle_present())
        .before_check(HookSpec::message("Waiting for the vehicle to spawn..."))
        .on_pass(HookSpec::message("Found the vehicle controller."))
        .on_fail(HookSpec::repeating_message(
            "The vehicle controller is not available yet. This usually takes a few seconds.",
        ));

    vec![
        notification_library,
        grace,
        substitute,
        host_version,
        host_start,
        vehicle,
    ]
}
