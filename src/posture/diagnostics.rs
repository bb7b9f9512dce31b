//! Debug-mode diagnostics.
//!
//! With `debug_mode` on, the analyzer hands one [`DiagnosticsEvent`] per frame
//! to the sink it was given. Nothing here is global.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::posture::types::{AngleDeviations, PostureAngles, PostureViolation};

/// Full per-frame pipeline trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsEvent {
    pub timestamp: f64,
    /// Low-visibility frame short-circuited before extraction
    pub gated: bool,
    pub confidence: f64,
    pub raw: PostureAngles,
    pub compensated: PostureAngles,
    pub smoothed: PostureAngles,
    /// Baseline this frame's deviations were measured against
    pub baseline: PostureAngles,
    pub deviations: AngleDeviations,
    pub pitch_delta: f64,
    pub delta_secs: f64,
    /// Warm-up counter after this frame's baseline update
    pub good_posture_duration: f64,
    pub violations: Vec<PostureViolation>,
}

pub trait DiagnosticsSink: Send {
    fn emit(&mut self, event: &DiagnosticsEvent);
}

impl<F> DiagnosticsSink for F
where
    F: FnMut(&DiagnosticsEvent) + Send,
{
    fn emit(&mut self, event: &DiagnosticsEvent) {
        self(event)
    }
}

impl DiagnosticsSink for Sender<DiagnosticsEvent> {
    fn emit(&mut self, event: &DiagnosticsEvent) {
        // a dropped receiver just means nobody is listening any more
        if self.send(event.clone()).is_err() {
            tracing::trace!("diagnostics receiver dropped");
        }
    }
}
