//! Download progress rendering
//!
//! The engine sends `DownloadEvent`s from many tasks; a single renderer task
//! owns the receiver and writes one line per event to stderr, so lines never
//! interleave and stdout stays clean for the manifest.

use sysimage_core::{Activity, DownloadEvent, EventSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Format a single event as one line of output.
pub fn format_event(event: &DownloadEvent) -> String {
    match event {
        DownloadEvent::Activity(activity) => format!("status: {}", describe(*activity)),
        DownloadEvent::Progress {
            fraction,
            rate_mbps,
        } => {
            let percent = (fraction * 100.0).floor();
            if *fraction >= 1.0 {
                format!("progress: {percent:.0}%")
            } else {
                format!("progress: {percent:.0}%  speed: {rate_mbps:.2} MB/s")
            }
        }
        DownloadEvent::ArtifactDone { completed, total } => format!("file {completed}/{total}"),
    }
}

fn describe(activity: Activity) -> &'static str {
    match activity {
        Activity::Resolving => "resolving latest version",
        Activity::Downloading => "downloading files",
        Activity::Staging => "writing command file",
        Activity::Finished => "done",
    }
}

/// Handle to the renderer task.
#[derive(Debug)]
pub struct EventRenderer {
    sink: EventSink,
    handle: JoinHandle<()>,
}

impl EventRenderer {
    /// Spawn a renderer writing to stderr.
    pub fn spawn() -> Self {
        let (sink, rx) = EventSink::channel();
        let handle = tokio::spawn(run_event_loop(rx));
        Self { sink, handle }
    }

    /// Sink to pass to the engine.
    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Close the channel and wait until every queued event is printed.
    pub async fn finish(self) {
        let Self { sink, handle } = self;
        drop(sink);
        let _ = handle.await;
    }
}

async fn run_event_loop(mut rx: mpsc::UnboundedReceiver<DownloadEvent>) {
    while let Some(event) = rx.recv().await {
        eprintln!("{}", format_event(&event));
    }
}
