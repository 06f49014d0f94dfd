//! Analysis cycle state machine.
//!
//! ```text
//! idle ──upload──▶ previewing ──encoded──▶ loading ──completed(Ok)──▶ success
//!                      │                       └────completed(Err)──▶ error
//!                      └──encode_failed──────────────────────────────▶ error
//! any ──reset──▶ idle
//! ```
//!
//! Every asynchronous completion names the cycle it belongs to. A completion
//! for anything other than the current cycle in the expected phase is
//! reported as [`Transition::Stale`] and leaves the state untouched.

use crate::analysis::AnalysisError;
use crate::types::{AnalysisResult, CycleId, Preview, SelectedImage};
use crate::upload::{self, UploadError};
use std::fmt;
use thiserror::Error;

/// Terminal failure of a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("이미지를 읽을 수 없습니다: {0}")]
    Encode(String),
    #[error("분석 중 오류가 발생했습니다: {0}")]
    Analysis(AnalysisError),
}

/// UI status as a single tagged variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Upload surface shown. Carries the last rejection notice, if any.
    Idle { rejection: Option<UploadError> },
    Previewing {
        cycle: CycleId,
        image: SelectedImage,
    },
    Loading {
        cycle: CycleId,
        image: SelectedImage,
        preview: Preview,
    },
    Success {
        cycle: CycleId,
        image: SelectedImage,
        preview: Preview,
        result: AnalysisResult,
    },
    Error {
        cycle: CycleId,
        image: SelectedImage,
        preview: Option<Preview>,
        error: CycleError,
    },
}

/// Discriminant of [`Status`], for display and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Previewing,
    Loading,
    Success,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Previewing => "previewing",
            Phase::Loading => "loading",
            Phase::Success => "success",
            Phase::Error => "error",
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Idle { rejection: None }
    }
}

impl Status {
    pub fn phase(&self) -> Phase {
        match self {
            Status::Idle { .. } => Phase::Idle,
            Status::Previewing { .. } => Phase::Previewing,
            Status::Loading { .. } => Phase::Loading,
            Status::Success { .. } => Phase::Success,
            Status::Error { .. } => Phase::Error,
        }
    }

    /// Cycle this status belongs to; `None` when idle.
    pub fn cycle(&self) -> Option<CycleId> {
        match self {
            Status::Idle { .. } => None,
            Status::Previewing { cycle, .. }
            | Status::Loading { cycle, .. }
            | Status::Success { cycle, .. }
            | Status::Error { cycle, .. } => Some(*cycle),
        }
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        match self {
            Status::Idle { .. } => None,
            Status::Previewing { image, .. }
            | Status::Loading { image, .. }
            | Status::Success { image, .. }
            | Status::Error { image, .. } => Some(image),
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Status::Loading { preview, .. } | Status::Success { preview, .. } => Some(preview),
            Status::Error { preview, .. } => preview.as_ref(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Status::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    /// User-facing error message, if the status carries one.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Status::Idle {
                rejection: Some(rejection),
            } => Some(rejection.to_string()),
            Status::Error { error, .. } => Some(error.to_string()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading { .. })
    }
}

/// Outcome of feeding an asynchronous completion into the session.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The completion belongs to an abandoned cycle and was discarded.
    Stale,
}

/// Owner of the [`Status`] and the cycle counter.
#[derive(Debug, Default)]
pub struct Session {
    status: Status,
    last_cycle: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Validate `image` and, if accepted, reset and start a new cycle.
    ///
    /// A rejection leaves everything but the rejection notice untouched; the
    /// notice is only recorded while idle, since an active cycle has no
    /// upload surface to attach it to.
    pub fn upload(&mut self, image: SelectedImage) -> Result<CycleId, UploadError> {
        if let Err(err) = upload::validate(&image) {
            tracing::info!(
                file = %image.file_name,
                mime_type = %image.mime_type,
                "upload rejected"
            );
            if let Status::Idle { rejection } = &mut self.status {
                *rejection = Some(err.clone());
            }
            return Err(err);
        }

        self.reset();
        self.last_cycle += 1;
        let cycle = CycleId(self.last_cycle);
        tracing::info!(
            %cycle,
            file = %image.file_name,
            mime_type = %image.mime_type,
            "analysis cycle started"
        );
        self.status = Status::Previewing { cycle, image };
        Ok(cycle)
    }

    /// Encoding finished: previewing → loading.
    pub fn encoded(&mut self, cycle: CycleId, preview: Preview) -> Transition {
        match std::mem::take(&mut self.status) {
            Status::Previewing { cycle: current, image } if current == cycle => {
                self.status = Status::Loading {
                    cycle,
                    image,
                    preview,
                };
                Transition::Applied
            }
            other => self.discard(other, cycle, "encoded"),
        }
    }

    /// Encoding failed: previewing → error.
    pub fn encode_failed(&mut self, cycle: CycleId, message: impl Into<String>) -> Transition {
        match std::mem::take(&mut self.status) {
            Status::Previewing { cycle: current, image } if current == cycle => {
                self.status = Status::Error {
                    cycle,
                    image,
                    preview: None,
                    error: CycleError::Encode(message.into()),
                };
                Transition::Applied
            }
            other => self.discard(other, cycle, "encode_failed"),
        }
    }

    /// Remote call resolved: loading → success | error.
    pub fn completed(
        &mut self,
        cycle: CycleId,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Transition {
        match std::mem::take(&mut self.status) {
            Status::Loading {
                cycle: current,
                image,
                preview,
            } if current == cycle => {
                self.status = match outcome {
                    Ok(result) => Status::Success {
                        cycle,
                        image,
                        preview,
                        result,
                    },
                    Err(err) => Status::Error {
                        cycle,
                        image,
                        preview: Some(preview),
                        error: CycleError::Analysis(err),
                    },
                };
                Transition::Applied
            }
            other => self.discard(other, cycle, "completed"),
        }
    }

    /// Return to idle from any state. In-flight completions become stale.
    pub fn reset(&mut self) {
        if let Some(cycle) = self.status.cycle() {
            tracing::debug!(%cycle, phase = %self.status.phase(), "session reset");
        }
        self.status = Status::default();
    }

    fn discard(&mut self, current: Status, cycle: CycleId, event: &str) -> Transition {
        tracing::debug!(
            %cycle,
            current = ?current.cycle(),
            phase = %current.phase(),
            event,
            "discarding stale completion"
        );
        self.status = current;
        Transition::Stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn png() -> SelectedImage {
        upload::select("photo.png", None)
    }

    fn preview() -> Preview {
        Preview {
            data_url: "data:image/png;base64,AAAA".into(),
            byte_len: 3,
            dimensions: Some((1, 1)),
        }
    }

    fn result(text: &str) -> AnalysisResult {
        AnalysisResult {
            text: text.into(),
            model: "test-model".into(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        assert_eq!(session.status().phase(), Phase::Previewing);

        assert_eq!(session.encoded(cycle, preview()), Transition::Applied);
        assert!(session.status().is_loading());
        assert_eq!(session.status().preview(), Some(&preview()));

        assert_eq!(session.completed(cycle, Ok(result("hello"))), Transition::Applied);
        assert_eq!(session.status().phase(), Phase::Success);
        assert_eq!(session.status().result().unwrap().text, "hello");
        assert_eq!(session.status().error_message(), None);
    }

    #[test]
    fn test_remote_failure_shows_only_error() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        let _ = session.encoded(cycle, preview());
        let _ = session.completed(cycle, Err(AnalysisError::Failed));

        let status = session.status();
        assert_eq!(status.phase(), Phase::Error);
        assert!(status.result().is_none());
        assert!(status.error_message().unwrap().contains("분석 중 오류가 발생했습니다"));
    }

    #[test]
    fn test_encode_failure() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        assert_eq!(session.encode_failed(cycle, "permission denied"), Transition::Applied);
        assert_eq!(session.status().phase(), Phase::Error);
        assert!(session.status().preview().is_none());
        assert!(session
            .status()
            .error_message()
            .unwrap()
            .contains("permission denied"));
    }

    #[test]
    fn test_rejection_only_sets_notice() {
        let mut session = Session::new();
        let err = session.upload(upload::select("document.pdf", None)).unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage { .. }));
        assert_eq!(
            session.status(),
            &Status::Idle {
                rejection: Some(err)
            }
        );
        assert!(session.status().image().is_none());
        assert!(session.status().preview().is_none());
    }

    #[test]
    fn test_rejection_during_cycle_leaves_cycle_untouched() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        let _ = session.encoded(cycle, preview());
        let before = session.status().clone();

        assert!(session.upload(upload::select("document.pdf", None)).is_err());
        assert_eq!(session.status(), &before);
    }

    #[test]
    fn test_accepted_upload_clears_rejection() {
        let mut session = Session::new();
        let _ = session.upload(upload::select("document.pdf", None));
        session.upload(png()).unwrap();
        assert_eq!(session.status().error_message(), None);
    }

    #[test]
    fn test_reset_from_every_phase() {
        for steps in 0..4 {
            let mut session = Session::new();
            let cycle = session.upload(png()).unwrap();
            if steps >= 1 {
                let _ = session.encoded(cycle, preview());
            }
            if steps == 2 {
                let _ = session.completed(cycle, Ok(result("x")));
            }
            if steps == 3 {
                let _ = session.completed(cycle, Err(AnalysisError::Failed));
            }
            session.reset();
            assert_eq!(session.status(), &Status::default());
        }
    }

    #[test]
    fn test_completion_after_reset_is_stale() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        let _ = session.encoded(cycle, preview());
        session.reset();

        assert_eq!(session.completed(cycle, Ok(result("late"))), Transition::Stale);
        assert_eq!(session.status(), &Status::default());
    }

    #[test]
    fn test_stale_completion_does_not_populate_new_cycle() {
        let mut session = Session::new();
        let old = session.upload(png()).unwrap();
        let _ = session.encoded(old, preview());

        let new = session.upload(png()).unwrap();
        assert!(new > old);
        let _ = session.encoded(new, preview());

        assert_eq!(session.completed(old, Ok(result("late"))), Transition::Stale);
        assert!(session.status().is_loading());
        assert_eq!(session.status().cycle(), Some(new));

        assert_eq!(session.completed(new, Ok(result("fresh"))), Transition::Applied);
        assert_eq!(session.status().result().unwrap().text, "fresh");
    }

    #[test]
    fn test_out_of_order_events_are_stale() {
        let mut session = Session::new();
        let cycle = session.upload(png()).unwrap();
        // Completion before encoding finished.
        assert_eq!(session.completed(cycle, Ok(result("x"))), Transition::Stale);
        assert_eq!(session.status().phase(), Phase::Previewing);

        let _ = session.encoded(cycle, preview());
        assert_eq!(session.encoded(cycle, preview()), Transition::Stale);
        assert_eq!(session.encode_failed(cycle, "late"), Transition::Stale);
        assert!(session.status().is_loading());
    }
}
