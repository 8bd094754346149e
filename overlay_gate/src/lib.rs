//! Readiness-gate engine for injecting a tuning overlay into a third-party
//! page.
//!
//! The page, the host application, and the substitute script all come up on
//! their own schedule. This crate sequences against that: it loads named
//! resource bundles exactly once, polls an ordered chain of conditions with
//! lifecycle hooks until they all hold, and runs a failsafe that swaps the
//! host's own script for a modified mirror, falling back to the original
//! when the mirror never becomes ready.

mod boundary;
mod condition;
mod dependency;
mod error;
mod failsafe;
mod metrics;
mod resolve;
mod scheduler;
mod session;
mod settings;
mod trace;

pub use boundary::{HostProbe, Notifier, PageDom, ToastRequest, ToastStyle};
pub use condition::{
    Condition, ConditionGate, ConditionState, FatalReason, GateVerdict, HookSpec, SectionKind,
};
pub use dependency::{Dependency, ResourceLoader};
pub use error::GateError;
pub use failsafe::{
    FailsafeState, InterceptDecision, InterceptionPattern, ScriptInterceptionFailsafe,
};
pub use metrics::{MetricBaseline, METRIC_KEYS};
pub use resolve::{Resolution, Resolvable};
pub use scheduler::{PollScheduler, SchedulerStep};
pub use session::OverlaySession;
pub use settings::Settings;
pub use trace::EventTrace;
