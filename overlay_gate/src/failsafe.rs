use regex::Regex;

use crate::error::GateError;
use crate::trace::EventTrace;

/// Pattern over the host's primary script URL. Exactly one capture group,
/// the build identifier that keys the mirrored substitute.
pub struct InterceptionPattern {
    regex: Regex,
}

impl InterceptionPattern {
    pub fn new(pattern: &str) -> Result<Self, GateError> {
        let regex = Regex::new(pattern)?;
        if regex.captures_len() != 2 {
            return Err(GateError::InvalidPattern(pattern.to_string()));
        }
        Ok(InterceptionPattern { regex })
    }

    /// The captured identifier, when the URL is the host's primary script.
    pub fn identifier(&self, url: &str) -> Option<String> {
        self.regex
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Lifecycle of the interception failsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailsafeState {
    /// Watching outgoing script loads for the host's primary script.
    WaitingForOriginal,
    /// The original was cancelled and the substitute requested.
    Substituted,
    /// The substitute never became ready; the original was reissued.
    /// Terminal for this page lifetime.
    Reverted,
}

/// Answer to one outgoing script-load event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Let the load proceed untouched.
    Allow,
    /// Cancel the native load and request the substitute instead.
    CancelAndSubstitute { substitute_url: String },
}

/// Intercepts the host's own script load, swaps in a mirrored substitute,
/// and falls back to the original if the substitute never proves itself.
pub struct ScriptInterceptionFailsafe {
    pattern: InterceptionPattern,
    bypass_marker: String,
    substitute_prefix: String,
    substitute_suffix: String,
    state: FailsafeState,
    original_url: Option<String>,
    identifier: Option<String>,
    substitute_url: Option<String>,
    trace: EventTrace,
}

impl ScriptInterceptionFailsafe {
    pub fn new(
        pattern: &str,
        bypass_marker: impl Into<String>,
        substitute_prefix: impl Into<String>,
        substitute_suffix: impl Into<String>,
        trace: EventTrace,
    ) -> Result<Self, GateError> {
        Ok(ScriptInterceptionFailsafe {
            pattern: InterceptionPattern::new(pattern)?,
            bypass_marker: bypass_marker.into(),
            substitute_prefix: substitute_prefix.into(),
            substitute_suffix: substitute_suffix.into(),
            state: FailsafeState::WaitingForOriginal,
            original_url: None,
            identifier: None,
            substitute_url: None,
            trace,
        })
    }

    pub fn state(&self) -> FailsafeState {
        self.state
    }

    pub fn original_url(&self) -> Option<&str> {
        self.original_url.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// The mirror URL, known once the original has been captured.
    pub fn substitute_url(&self) -> Option<&str> {
        self.substitute_url.as_deref()
    }

    /// Decide one outgoing script load.
    ///
    /// The bypass-marker check runs before the pattern so a reissued
    /// original can never be captured a second time.
    pub fn on_script_request(&mut self, url: &str) -> InterceptDecision {
        if url.ends_with(&self.bypass_marker) {
            self.trace
                .log(format!("bypass marker present, allowing {url}"));
            return InterceptDecision::Allow;
        }

        if self.state != FailsafeState::WaitingForOriginal {
            return InterceptDecision::Allow;
        }

        let Some(identifier) = self.pattern.identifier(url) else {
            return InterceptDecision::Allow;
        };

        let substitute_url = format!(
            "{}{identifier}{}",
            self.substitute_prefix, self.substitute_suffix
        );
        self.trace.log(format!(
            "intercepted host script {url} (build {identifier}), substituting {substitute_url}"
        ));

        self.original_url = Some(url.to_string());
        self.identifier = Some(identifier);
        self.substitute_url = Some(substitute_url.clone());
        self.state = FailsafeState::Substituted;

        InterceptDecision::CancelAndSubstitute { substitute_url }
    }

    /// Give up on the substitute: return the original URL with the bypass
    /// marker appended, to be re-requested. Only meaningful once, from the
    /// substituted state.
    pub fn revert(&mut self) -> Option<String> {
        if self.state != FailsafeState::Substituted {
            return None;
        }
        let original = self.original_url.as_deref()?;
        let reissue = format!("{original}{}", self.bypass_marker);
        self.trace.log(format!(
            "substitute never became ready, reverting to {reissue}"
        ));
        self.state = FailsafeState::Reverted;
        Some(reissue)
    }
}

#[cfg(test)]
mod tests {
    use super::{FailsafeState, InterceptDecision, ScriptInterceptionFailsafe};
    use crate::error::GateError;
    use crate::trace::EventTrace;

    const PATTERN: &str = r"static/js/main\.([0-9a-f]+)\.chunk\.js$";

    fn failsafe() -> ScriptInterceptionFailsafe {
        ScriptInterceptionFailsafe::new(
            PATTERN,
            "?ignore",
            "https://mirror.test/dist/main.modified.",
            ".chunk.js",
            EventTrace::new(false),
        )
        .unwrap()
    }

    #[test]
    fn matching_url_is_cancelled_and_substituted() {
        let mut failsafe = failsafe();
        let decision =
            failsafe.on_script_request("https://host.test/static/js/main.abc123.chunk.js");

        assert_eq!(
            decision,
            InterceptDecision::CancelAndSubstitute {
                substitute_url: "https://mirror.test/dist/main.modified.abc123.chunk.js"
                    .to_string()
            }
        );
        assert_eq!(failsafe.state(), FailsafeState::Substituted);
        assert_eq!(failsafe.identifier(), Some("abc123"));
        assert_eq!(
            failsafe.original_url(),
            Some("https://host.test/static/js/main.abc123.chunk.js")
        );
    }

    #[test]
    fn unrelated_urls_pass_through() {
        let mut failsafe = failsafe();
        assert_eq!(
            failsafe.on_script_request("https://cdn.test/toastify.js"),
            InterceptDecision::Allow
        );
        assert_eq!(failsafe.state(), FailsafeState::WaitingForOriginal);
    }

    #[test]
    fn revert_reissues_the_original_under_the_bypass_marker() {
        let mut failsafe = failsafe();
        failsafe.on_script_request("https://host.test/static/js/main.abc123.chunk.js");

        let reissue = failsafe.revert().expect("revert from substituted");
        assert_eq!(
            reissue,
            "https://host.test/static/js/main.abc123.chunk.js?ignore"
        );
        assert_eq!(failsafe.state(), FailsafeState::Reverted);

        // The reissued URL is let through untouched, not captured again.
        assert_eq!(
            failsafe.on_script_request(&reissue),
            InterceptDecision::Allow
        );
        // Reverting twice yields nothing.
        assert_eq!(failsafe.revert(), None);
    }

    #[test]
    fn bypass_marker_takes_precedence_over_the_pattern() {
        let mut failsafe = failsafe();
        // Even before any capture, a marked URL is never matched.
        assert_eq!(
            failsafe.on_script_request("https://host.test/static/js/main.abc123.chunk.js?ignore"),
            InterceptDecision::Allow
        );
        assert_eq!(failsafe.state(), FailsafeState::WaitingForOriginal);
        assert_eq!(failsafe.identifier(), None);
    }

    #[test]
    fn capture_happens_at_most_once() {
        let mut failsafe = failsafe();
        failsafe.on_script_request("https://host.test/static/js/main.abc123.chunk.js");

        // A second matching load is not re-captured once substituted.
        assert_eq!(
            failsafe.on_script_request("https://host.test/static/js/main.def456.chunk.js"),
            InterceptDecision::Allow
        );
        assert_eq!(failsafe.identifier(), Some("abc123"));
    }

    #[test]
    fn patterns_without_a_capture_group_are_rejected() {
        assert!(matches!(
            ScriptInterceptionFailsafe::new(
                r"static/js/main\.chunk\.js$",
                "?ignore",
                "p",
                "s",
                EventTrace::new(false)
            ),
            Err(GateError::InvalidPattern(_))
        ));
    }
}
