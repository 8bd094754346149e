//! Narrow interfaces to everything the engine does not own: the page
//! document, the notification widget, and the host application's runtime
//! object graph. The engine only ever holds `Rc<dyn ...>` handles to these.

use serde::Serialize;

/// Append-only access to the page document.
pub trait PageDom {
    fn append_script(&self, url: &str);
    fn append_style(&self, url: &str);
}

/// Preset visual themes for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastStyle {
    Default,
    Info,
    Error,
}

impl ToastStyle {
    /// Background gradient for the theme.
    pub fn background(&self) -> &'static str {
        match self {
            ToastStyle::Default => {
                "linear-gradient(to right bottom, rgb(158, 168, 170), rgb(124, 147, 155))"
            }
            ToastStyle::Info => {
                "linear-gradient(to bottom right, rgb(17, 130, 114), rgb(70, 110, 125))"
            }
            ToastStyle::Error => {
                "linear-gradient(to right bottom, rgb(162, 51, 56), rgb(130, 6, 12))"
            }
        }
    }
}

/// Fire-and-forget notification payload. The presentation widget is outside
/// the engine; this is the whole contract. A `duration_ms` of 0 keeps the
/// toast up until dismissed.
#[derive(Debug, Clone, Serialize)]
pub struct ToastRequest {
    pub text: String,
    pub style: ToastStyle,
    pub duration_ms: u64,
    pub dismissible: bool,
}

impl ToastRequest {
    pub fn new(text: impl Into<String>, style: ToastStyle, duration_ms: u64) -> Self {
        ToastRequest {
            text: text.into(),
            style,
            duration_ms,
            dismissible: true,
        }
    }
}

pub trait Notifier {
    fn show_toast(&self, request: &ToastRequest);
}

/// Non-blocking readiness reads over the externally-owned object graph.
///
/// Any intermediate path segment of the graph may be absent while the host
/// is still initializing; reads return `Option`/`false` rather than failing.
/// Once the readiness chain has passed, direct access is assumed safe.
pub trait HostProbe {
    /// Is the notification library callable yet?
    fn notification_library_ready(&self) -> bool;
    /// Has the substitute script announced itself?
    fn modified_script_loaded(&self) -> bool;
    /// Version string the host displays, when present.
    fn host_version(&self) -> Option<String>;
    /// Has the host rendered its first frame?
    fn host_started(&self) -> bool;
    /// Is the vehicle controller reachable?
    fn vehicle_present(&self) -> bool;
    /// Read one key of the numeric tuning bag, `None` while unreachable.
    fn read_metric(&self, key: &str) -> Option<f64>;
    /// Write one key of the numeric tuning bag; `false` while unreachable.
    fn write_metric(&self, key: &str, value: f64) -> bool;
}

#[cfg(test)]
mod tests {
    use super::{ToastRequest, ToastStyle};

    #[test]
    fn toast_styles_map_to_distinct_themes() {
        assert_ne!(ToastStyle::Default.background(), ToastStyle::Info.background());
        assert_ne!(ToastStyle::Info.background(), ToastStyle::Error.background());
    }

    #[test]
    fn toast_request_serializes_for_the_widget() {
        let request = ToastRequest::new("hello", ToastStyle::Info, 12_000);
        let json = serde_json::to_value(&request).expect("toast payload serializes");
        assert_eq!(json["style"], "info");
        assert_eq!(json["duration_ms"], 12_000);
        assert_eq!(json["dismissible"], true);
    }
}
