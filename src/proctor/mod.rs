pub mod camera;
pub mod monitor;

use serde::{Deserialize, Serialize};

pub use camera::{Camera, CameraGuard, CameraStatus, ClientCamera, MediaDevice, MediaStream};
pub use monitor::{ViolationMonitor, ViolationOutcome};

/// Environment signal reported by the client while a session is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProctorSignal {
    VisibilityHidden,
    VisibilityVisible,
    WindowBlur,
    WindowFocus,
    /// The client could not register its focus/visibility listeners.
    ListenerError,
}

impl ProctorSignal {
    /// Loss of tab visibility or window focus.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            ProctorSignal::VisibilityHidden | ProctorSignal::WindowBlur
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_focus_loss_counts() {
        assert!(ProctorSignal::VisibilityHidden.is_violation());
        assert!(ProctorSignal::WindowBlur.is_violation());
        assert!(!ProctorSignal::VisibilityVisible.is_violation());
        assert!(!ProctorSignal::WindowFocus.is_violation());
        assert!(!ProctorSignal::ListenerError.is_violation());
    }

    #[test]
    fn test_signal_wire_names() {
        let signal: ProctorSignal = serde_json::from_str("\"window-blur\"").unwrap();
        assert_eq!(signal, ProctorSignal::WindowBlur);
        let signal: ProctorSignal = serde_json::from_str("\"listener-error\"").unwrap();
        assert_eq!(signal, ProctorSignal::ListenerError);
    }
}
