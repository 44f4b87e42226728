//! Workflow events.
//!
//! The engine reports progress by sending [`DownloadEvent`]s over a channel
//! instead of calling back into the caller, so rendering never runs on a
//! download task. Callers that do not care pass [`EventSink::null`].

use tokio::sync::mpsc;

/// Coarse workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Fetching indices and selecting the image.
    Resolving,
    /// Fetching and verifying artifacts.
    Downloading,
    /// Writing the command file and building the push manifest.
    Staging,
    /// Push manifest ready.
    Finished,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Staging => "staging",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications emitted while a workflow runs.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// The workflow entered a new phase.
    Activity(Activity),

    /// Aggregate byte progress.
    ///
    /// `fraction` is below 1.0 for every sample except the single terminal
    /// event, which carries exactly `1.0` and a rate of `0.0`.
    Progress { fraction: f64, rate_mbps: f64 },

    /// One more artifact is present and verified.
    ArtifactDone { completed: usize, total: usize },
}

/// Sending half of the event channel.
///
/// Sends never fail: events are dropped once the receiver is gone.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<DownloadEvent>>);

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        Self(Some(tx))
    }

    /// A sink that discards every event.
    pub fn null() -> Self {
        Self(None)
    }

    /// Create a sink together with its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }

    pub fn activity(&self, activity: Activity) {
        self.emit(DownloadEvent::Activity(activity));
    }
}
