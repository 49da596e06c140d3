//! Cooperative scheduler
//!
//! Drives a `Runtime` on a tokio task: every interval tick it executes one
//! batch of steps, and between batches it serves host commands.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::errors::VmError;
use super::vm::{Outcome, Runtime, Variables};

/// Host command sent through a `SchedulerHandle`
#[derive(Debug)]
pub enum Command {
    Resume,
    Variables(oneshot::Sender<Variables>),
    Stop,
}

/// Cloneable control handle for a running scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Resume a paused execution. Returns false when the scheduler is gone.
    pub fn resume(&self) -> bool {
        self.tx.send(Command::Resume).is_ok()
    }

    /// Snapshot of the visible variables, taken between two batches
    pub async fn variables(&self) -> Option<Variables> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Variables(reply)).ok()?;
        rx.await.ok()
    }

    /// Stop the scheduler after the current batch
    pub fn stop(&self) -> bool {
        self.tx.send(Command::Stop).is_ok()
    }
}

/// Final state of a scheduler run
#[derive(Debug)]
pub struct SchedulerExit {
    pub outcome: Outcome,
    pub runtime: Runtime,
}

pub struct Scheduler {
    runtime: Runtime,
    steps_per_tick: usize,
    tick_interval: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Scheduler {
    pub fn new(
        runtime: Runtime,
        steps_per_tick: usize,
        tick_interval: Duration,
    ) -> (Self, SchedulerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let scheduler = Scheduler {
            runtime,
            steps_per_tick: steps_per_tick.max(1),
            tick_interval,
            commands,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Start `entry` and drive it until it finishes or halts
    ///
    /// A stop command ends the run early. So does a pause once every
    /// `SchedulerHandle` has been dropped, since nothing could resume it.
    ///
    /// Internal runtime failures are returned as `Err`.
    pub async fn run_main(mut self, entry: &str) -> Result<SchedulerExit, VmError> {
        self.runtime.start(entry)?;
        info!(
            entry,
            steps_per_tick = self.steps_per_tick,
            interval_ms = self.tick_interval.as_millis() as u64,
            "scheduler started"
        );

        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.runtime.tick(self.steps_per_tick)? {
                        done @ (Outcome::Finished | Outcome::Halted) => break done,
                        // Nobody is left to resume
                        Outcome::Paused if !commands_open => break Outcome::Paused,
                        _ => {}
                    }
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Resume) => self.runtime.resume(),
                    Some(Command::Variables(reply)) => {
                        // Receiver may have given up waiting
                        let _ = reply.send(self.runtime.variables());
                    }
                    Some(Command::Stop) => {
                        info!("scheduler stopped by host");
                        break Outcome::Stopped;
                    }
                    None => {
                        debug!("all scheduler handles dropped");
                        if self.runtime.is_paused() {
                            break Outcome::Paused;
                        }
                        commands_open = false;
                    }
                },
            }
        };

        debug!(?outcome, "scheduler exited");
        Ok(SchedulerExit {
            outcome,
            runtime: self.runtime,
        })
    }
}
