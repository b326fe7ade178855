//! Upload progress for post submissions.
//!
//! A submission moves `Idle -> Uploading -> Processing` and back to `Idle`
//! once the backend answers. `Processing` starts the moment every attachment
//! byte has been handed to the transport, while the server is still working
//! on the request.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Button label of an idle form.
pub const SUBMIT_LABEL: &str = "Submit";

/// Prefix of the label shown while bytes are being sent.
pub const UPLOADING_LABEL: &str = "Submitting";

/// Label shown once every byte is sent and the answer is pending.
pub const PROCESSING_LABEL: &str = "Processing";

/// Observable state of one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SubmissionState {
    #[default]
    Idle,
    Uploading {
        percent: u8,
    },
    Processing,
}

impl SubmissionState {
    /// Button label for this state ("Submit", "Submitting 42%", "Processing").
    pub fn label(&self) -> String {
        match self {
            SubmissionState::Idle => SUBMIT_LABEL.to_string(),
            SubmissionState::Uploading { percent } => format!("{} {}%", UPLOADING_LABEL, percent),
            SubmissionState::Processing => PROCESSING_LABEL.to_string(),
        }
    }
}

/// State plus its button label, as served to the polling compose page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    #[serde(flatten)]
    pub state: SubmissionState,
    pub label: String,
}

impl From<SubmissionState> for ProgressReport {
    fn from(state: SubmissionState) -> Self {
        Self {
            label: state.label(),
            state,
        }
    }
}

/// Counts bytes sent for one submission and publishes the derived state.
#[derive(Debug)]
pub struct UploadProgress {
    total: u64,
    sent: AtomicU64,
    state: watch::Sender<SubmissionState>,
}

/// Shared handle used by the transport and by observers.
pub type SharedUploadProgress = Arc<UploadProgress>;

impl UploadProgress {
    /// Creates a tracker for `total` attachment bytes, starting idle.
    pub fn new(total: u64) -> SharedUploadProgress {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Arc::new(Self {
            total,
            sent: AtomicU64::new(0),
            state,
        })
    }

    /// Marks the submission as started. With nothing to upload it goes
    /// straight to processing.
    pub fn begin(&self) {
        self.sent.store(0, Ordering::Relaxed);
        let next = if self.total == 0 {
            SubmissionState::Processing
        } else {
            SubmissionState::Uploading { percent: 0 }
        };
        self.state.send_replace(next);
    }

    /// Records `bytes` more handed to the transport.
    pub fn record(&self, bytes: u64) {
        if self.total == 0 {
            return;
        }
        let sent = self.sent.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let next = if sent >= self.total {
            SubmissionState::Processing
        } else {
            SubmissionState::Uploading {
                percent: percent_of(sent, self.total),
            }
        };
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                debug!(sent, total = self.total, state = ?next, "upload progress");
                *current = next;
                true
            }
        });
    }

    /// Marks the submission as answered, successfully or not.
    pub fn finish(&self) {
        self.state.send_replace(SubmissionState::Idle);
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    /// Attachment bytes handed to the transport so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed).min(self.total)
    }
}

/// Rounded percentage, capped at 100.
fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (sent.min(total) as f64 * 100.0 / total as f64).round();
    pct as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reaches_processing_when_all_bytes_sent() {
        let progress = UploadProgress::new(200);
        assert_eq!(progress.state(), SubmissionState::Idle);

        progress.begin();
        assert_eq!(progress.state(), SubmissionState::Uploading { percent: 0 });

        progress.record(50);
        assert_eq!(progress.state(), SubmissionState::Uploading { percent: 25 });

        progress.record(149);
        assert_eq!(progress.state(), SubmissionState::Uploading { percent: 100 });

        progress.record(1);
        assert_eq!(progress.state(), SubmissionState::Processing);
        assert_eq!(progress.sent(), 200);

        progress.finish();
        assert_eq!(progress.state(), SubmissionState::Idle);
    }

    #[test]
    fn test_empty_upload_goes_straight_to_processing() {
        let progress = UploadProgress::new(0);
        progress.begin();
        assert_eq!(progress.state(), SubmissionState::Processing);
        progress.record(10);
        assert_eq!(progress.state(), SubmissionState::Processing);
    }

    #[test]
    fn test_labels_and_json() {
        assert_eq!(SubmissionState::Idle.label(), "Submit");
        assert_eq!(SubmissionState::Uploading { percent: 42 }.label(), "Submitting 42%");
        assert_eq!(SubmissionState::Processing.label(), "Processing");
        assert_eq!(
            serde_json::to_string(&SubmissionState::Uploading { percent: 7 }).unwrap(),
            r#"{"state":"uploading","percent":7}"#
        );
    }

    #[test]
    fn test_progress_report_carries_label() {
        let report = ProgressReport::from(SubmissionState::Uploading { percent: 7 });
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"state":"uploading","percent":7,"label":"Submitting 7%"}"#
        );
        assert_eq!(
            serde_json::to_string(&ProgressReport::from(SubmissionState::Idle)).unwrap(),
            r#"{"state":"idle","label":"Submit"}"#
        );
    }
}
