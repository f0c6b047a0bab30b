//! Failure reporting.
//!
//! Stages never print. After each stage run, the driver (or the watch
//! dispatcher) hands the outcome to a `Reporter`, which fans it out to its
//! sinks:
//!
//! - `TerminalSink` - status block through the logger
//! - `BrowserSink` - error overlay over the live reload channel

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::actor::ReloadChannel;
use crate::core::{Failure, StageError, StageId, StageSummary};
use crate::log;
use crate::logger::{status_detach, status_error, status_success};

/// Receives stage outcomes. Implementations must not fail.
pub trait NotificationSink: Send + Sync {
    /// `failures` come from one run of `stage` and are never empty.
    fn failed(&self, stage: StageId, failures: &[Failure]);

    fn succeeded(&self, stage: StageId, summary: &StageSummary);
}

/// Fans stage outcomes out to every attached sink.
pub struct Reporter {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Reporter {
    /// Terminal only, for one-shot runs.
    pub fn terminal() -> Self {
        Self {
            sinks: vec![Box::new(TerminalSink { watching: false })],
        }
    }

    /// Terminal status block plus browser overlay, while serving.
    pub fn watching(channel: ReloadChannel) -> Self {
        Self {
            sinks: vec![
                Box::new(TerminalSink { watching: true }),
                Box::new(BrowserSink::new(channel)),
            ],
        }
    }

    #[cfg(test)]
    pub fn with_sinks(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    /// Report the outcome of one stage run.
    pub fn report(&self, stage: StageId, result: &Result<StageSummary, StageError>) {
        match result {
            Ok(summary) if summary.is_clean() => {
                self.sinks.iter().for_each(|s| s.succeeded(stage, summary));
            }
            Ok(summary) => {
                self.sinks.iter().for_each(|s| s.failed(stage, &summary.failures));
            }
            Err(e) => {
                let failures = [e.to_failure()];
                self.sinks.iter().for_each(|s| s.failed(stage, &failures));
            }
        }
    }
}

/// Join failure bodies into one notification detail.
fn detail(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(Failure::body)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Logger status block.
///
/// While watching, each outcome replaces the previous block; otherwise
/// error blocks stay on screen and successes are plain log lines.
pub struct TerminalSink {
    watching: bool,
}

impl NotificationSink for TerminalSink {
    fn failed(&self, _stage: StageId, failures: &[Failure]) {
        let Some(first) = failures.first() else {
            return;
        };
        status_error(&first.title(), &detail(failures));
        if !self.watching {
            status_detach();
        }
    }

    fn succeeded(&self, stage: StageId, summary: &StageSummary) {
        if self.watching {
            status_success(&format!("{stage}: {}", summary.describe()));
        } else {
            log!(stage.label(); "{}", summary.describe());
        }
    }
}

/// Error overlay in connected browsers.
///
/// Remembers which stages are failing: when one recovers the overlay is
/// cleared, then re-sent for any stage still failing.
pub struct BrowserSink {
    channel: ReloadChannel,
    failing: Mutex<BTreeMap<StageId, String>>,
}

impl BrowserSink {
    pub fn new(channel: ReloadChannel) -> Self {
        Self {
            channel,
            failing: Mutex::new(BTreeMap::new()),
        }
    }
}

impl NotificationSink for BrowserSink {
    fn failed(&self, stage: StageId, failures: &[Failure]) {
        let message = detail(failures);
        self.failing.lock().insert(stage, message.clone());
        self.channel.error(stage.name(), message);
    }

    fn succeeded(&self, stage: StageId, _summary: &StageSummary) {
        let mut failing = self.failing.lock();
        if failing.remove(&stage).is_none() {
            return;
        }
        self.channel.clear_error();
        if let Some((other, message)) = failing.iter().next() {
            self.channel.error(other.name(), message.clone());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::actor::messages::WsMsg;

    #[test]
    fn test_report_routes_outcomes() {
        let sink = RecordingSink::default();
        let reporter = Reporter::with_sinks(vec![Box::new(sink.clone())]);

        reporter.report(StageId::Assets, &Ok(StageSummary::new(StageId::Assets)));

        let mut partial = StageSummary::new(StageId::Images);
        partial.failures.push(Failure::at(StageId::Images, "a.png", "bad"));
        partial.failures.push(Failure::at(StageId::Images, "b.png", "bad"));
        reporter.report(StageId::Images, &Ok(partial));

        reporter.report(
            StageId::Styles,
            &Err(StageError::failed(StageId::Styles, "expected \"}\"")),
        );

        assert_eq!(*sink.succeeded.lock(), vec![StageId::Assets]);
        let failures = sink.failures.lock();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[2].title(), "error in compile-styles");
    }

    #[test]
    fn test_detail_joins_bodies() {
        let failures = [
            Failure::at(StageId::Markup, "src/html/a.html", "invalid utf-8"),
            Failure::new(StageId::Markup, "other"),
        ];
        assert_eq!(detail(&failures), "src/html/a.html: invalid utf-8\nother");
    }

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<WsMsg>) -> Vec<String> {
        let mut seen = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            seen.push(match msg {
                WsMsg::Error { stage, .. } => format!("error:{stage}"),
                WsMsg::ClearError => "clear".to_string(),
                _ => "other".to_string(),
            });
        }
        seen
    }

    #[test]
    fn test_browser_sink_clears_and_resends_remaining() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let sink = BrowserSink::new(ReloadChannel::new(tx));
        let ok = |stage| StageSummary::new(stage);

        sink.succeeded(StageId::Styles, &ok(StageId::Styles));
        assert!(drain(&mut rx).is_empty());

        sink.failed(StageId::Styles, &[Failure::new(StageId::Styles, "x")]);
        sink.failed(StageId::Scripts, &[Failure::new(StageId::Scripts, "y")]);
        assert_eq!(drain(&mut rx), ["error:compile-styles", "error:build-scripts"]);

        sink.succeeded(StageId::Styles, &ok(StageId::Styles));
        assert_eq!(drain(&mut rx), ["clear", "error:build-scripts"]);

        sink.succeeded(StageId::Scripts, &ok(StageId::Scripts));
        assert_eq!(drain(&mut rx), ["clear"]);
    }
}
