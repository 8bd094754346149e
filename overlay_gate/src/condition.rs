use serde::Serialize;

use crate::error::GateError;
use crate::trace::EventTrace;

/// The three lifecycle hook sections of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    BeforeCheck,
    OnPass,
    OnFail,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::BeforeCheck => "before_check",
            SectionKind::OnPass => "on_pass",
            SectionKind::OnFail => "on_fail",
        }
    }
}

/// What one hook section does when its condition is evaluated.
///
/// Defaults: message and run fire at most once, and the section is not
/// fatal. A fatal section halts the whole readiness loop permanently, after
/// its own message/run have been processed.
pub struct HookSpec {
    pub message: Option<String>,
    pub message_once: bool,
    pub run: Option<Box<dyn FnMut()>>,
    pub run_once: bool,
    pub fatal: bool,
}

impl Default for HookSpec {
    fn default() -> Self {
        HookSpec {
            message: None,
            message_once: true,
            run: None,
            run_once: true,
            fatal: false,
        }
    }
}

impl HookSpec {
    /// A section that logs once.
    pub fn message(text: impl Into<String>) -> Self {
        HookSpec {
            message: Some(text.into()),
            ..HookSpec::default()
        }
    }

    /// A section that logs on every qualifying tick.
    pub fn repeating_message(text: impl Into<String>) -> Self {
        HookSpec {
            message: Some(text.into()),
            message_once: false,
            ..HookSpec::default()
        }
    }

    pub fn with_run(mut self, run: impl FnMut() + 'static) -> Self {
        self.run = Some(Box::new(run));
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Per-condition bookkeeping, created lazily on first evaluation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConditionState {
    pub passed: bool,
    pub before_check_message: bool,
    pub before_check_run: bool,
    pub on_pass_message: bool,
    pub on_pass_run: bool,
    pub on_fail_message: bool,
    pub on_fail_run: bool,
}

/// A named boolean gate with lifecycle hooks, evaluated once per poll tick.
///
/// A condition that has passed once never fails a later check, even if its
/// predicate would now return false. The predicate often reads state that
/// disappears again (the version element is removed once the host starts),
/// so a pass has to stick.
pub struct Condition {
    name: String,
    passes: Box<dyn FnMut() -> bool>,
    before_check: HookSpec,
    on_pass: HookSpec,
    on_fail: HookSpec,
    state: Option<ConditionState>,
}

impl Condition {
    pub fn new(name: impl Into<String>, passes: impl FnMut() -> bool + 'static) -> Self {
        Condition {
            name: name.into(),
            passes: Box::new(passes),
            before_check: HookSpec::default(),
            on_pass: HookSpec::default(),
            on_fail: HookSpec::default(),
            state: None,
        }
    }

    pub fn before_check(mut self, spec: HookSpec) -> Self {
        self.before_check = spec;
        self
    }

    pub fn on_pass(mut self, spec: HookSpec) -> Self {
        self.on_pass = spec;
        self
    }

    pub fn on_fail(mut self, spec: HookSpec) -> Self {
        self.on_fail = spec;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_passed(&self) -> bool {
        self.state.as_ref().map(|s| s.passed).unwrap_or(false)
    }
}

/// Why the readiness loop stopped for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FatalReason {
    pub condition: String,
    pub section: SectionKind,
}

/// One full evaluation pass over the condition list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// Every condition passed this tick.
    Passed,
    /// A condition failed without being fatal; poll again later.
    Pending,
    /// A fatal hook section fired; stop polling permanently.
    Fatal(FatalReason),
}

enum CheckOutcome {
    Passed,
    Failed,
    Fatal(SectionKind),
}

/// Ordered condition list with short-circuit evaluation.
///
/// Order is a dependency chain: earlier conditions guard the reads later
/// ones perform, so evaluation stops at the first failure and later
/// predicates never run on a tick where an earlier one failed.
pub struct ConditionGate {
    conditions: Vec<Condition>,
    trace: EventTrace,
}

impl ConditionGate {
    pub fn new(conditions: Vec<Condition>, trace: EventTrace) -> Result<Self, GateError> {
        for (index, condition) in conditions.iter().enumerate() {
            if condition.name.is_empty() {
                return Err(GateError::EmptyConditionName);
            }
            if conditions[..index].iter().any(|c| c.name == condition.name) {
                return Err(GateError::DuplicateCondition(condition.name.clone()));
            }
        }
        Ok(ConditionGate { conditions, trace })
    }

    pub fn evaluate_all(&mut self) -> GateVerdict {
        for index in 0..self.conditions.len() {
            let outcome = Self::check_condition(&mut self.conditions[index], &self.trace);
            match outcome {
                CheckOutcome::Passed => continue,
                CheckOutcome::Failed => return GateVerdict::Pending,
                CheckOutcome::Fatal(section) => {
                    let condition = &self.conditions[index];
                    self.trace.condition(
                        &condition.name,
                        &format!(
                            "section '{}' is fatal, halting the readiness loop",
                            section.as_str()
                        ),
                    );
                    return GateVerdict::Fatal(FatalReason {
                        condition: condition.name.clone(),
                        section,
                    });
                }
            }
        }
        GateVerdict::Passed
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn check_condition(condition: &mut Condition, trace: &EventTrace) -> CheckOutcome {
        condition.state.get_or_insert_with(ConditionState::default);

        if Self::handle_section(condition, SectionKind::BeforeCheck, trace) {
            return CheckOutcome::Fatal(SectionKind::BeforeCheck);
        }

        let already_passed = condition.has_passed();
        if already_passed || (condition.passes)() {
            if let Some(state) = condition.state.as_mut() {
                state.passed = true;
            }
            if Self::handle_section(condition, SectionKind::OnPass, trace) {
                return CheckOutcome::Fatal(SectionKind::OnPass);
            }
            CheckOutcome::Passed
        } else {
            if Self::handle_section(condition, SectionKind::OnFail, trace) {
                return CheckOutcome::Fatal(SectionKind::OnFail);
            }
            CheckOutcome::Failed
        }
    }

    /// Apply one hook section: message first, then the side effect, each
    /// guarded by its own once-flag. The side effect runs whether or not
    /// the message fired this tick. Returns whether the section is fatal.
    fn handle_section(condition: &mut Condition, section: SectionKind, trace: &EventTrace) -> bool {
        let name = condition.name.clone();
        let state = condition
            .state
            .as_mut()
            .expect("state initialized before section handling");
        let (spec, message_emitted, run_executed) = match section {
            SectionKind::BeforeCheck => (
                &mut condition.before_check,
                &mut state.before_check_message,
                &mut state.before_check_run,
            ),
            SectionKind::OnPass => (
                &mut condition.on_pass,
                &mut state.on_pass_message,
                &mut state.on_pass_run,
            ),
            SectionKind::OnFail => (
                &mut condition.on_fail,
                &mut state.on_fail_message,
                &mut state.on_fail_run,
            ),
        };

        if let Some(text) = spec.message.as_deref() {
            let allowed = if *message_emitted {
                !spec.message_once
            } else {
                true
            };
            if allowed {
                trace.condition(&name, text);
                *message_emitted = true;
            }
        }

        if let Some(run) = spec.run.as_mut() {
            let allowed = if *run_executed { !spec.run_once } else { true };
            if allowed {
                run();
                *run_executed = true;
            }
        }

        spec.fatal
    }
}
