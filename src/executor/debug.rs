//! Debug handles
//!
//! A `DebugHandle` is how a runtime talks back to its host: pauses,
//! resumes, error reports and completion.

use tokio::sync::mpsc;
use tracing::{error, info, trace};

use super::errors::Report;

/// Host-side receiver of runtime notifications
pub trait DebugHandle: Send {
    fn handle_pause(&mut self, line: usize);
    fn handle_resume(&mut self);
    fn error(&mut self, report: &Report);
    fn exit(&mut self);
}

/// Handle that only logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandle;

impl DebugHandle for LogHandle {
    fn handle_pause(&mut self, line: usize) {
        info!(line, "execution paused");
    }

    fn handle_resume(&mut self) {
        info!("execution resumed");
    }

    fn error(&mut self, report: &Report) {
        error!(header = %report.header, body = %report.body, "execution failed");
    }

    fn exit(&mut self) {
        info!("execution finished");
    }
}

/// Notification forwarded by `ChannelHandle`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Paused { line: usize },
    Resumed,
    Error(Report),
    Exited,
}

/// Handle that forwards every notification over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::UnboundedSender<DebugEvent>,
}

impl ChannelHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DebugEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelHandle { tx }, rx)
    }

    fn send(&self, event: DebugEvent) {
        if let Err(err) = self.tx.send(event) {
            trace!(event = ?err.0, "debug event dropped, receiver closed");
        }
    }
}

impl DebugHandle for ChannelHandle {
    fn handle_pause(&mut self, line: usize) {
        self.send(DebugEvent::Paused { line });
    }

    fn handle_resume(&mut self) {
        self.send(DebugEvent::Resumed);
    }

    fn error(&mut self, report: &Report) {
        self.send(DebugEvent::Error(report.clone()));
    }

    fn exit(&mut self) {
        self.send(DebugEvent::Exited);
    }
}
