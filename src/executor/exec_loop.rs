//! Core execution loop
//!
//! `step()` executes one operation of the top frame. The drivers build on it:
//! 1. run_main() - start + run_to_completion
//! 2. run_to_completion() - tight loop, no yielding
//! 3. tick() - bounded batch of steps, used by the scheduler

use std::sync::Arc;

use tracing::{error, info, trace, warn};

use super::errors::{InternalError, VmError};
use super::types::Function;
use super::vm::{DebugState, Lifecycle, Outcome, Runtime, Step};

impl Runtime {
    /* ===================== Public API ===================== */

    /// Push the entry frame without executing anything. Its locals become
    /// the global variables. Any previous execution state is discarded.
    pub fn start(&mut self, entry: &str) -> Result<(), VmError> {
        let function = self.function(entry)?;
        if !matches!(*function, Function::Interpreted(_)) {
            return Err(InternalError::NativeEntry(entry.to_string()).into());
        }

        self.frames.clear();
        self.stack.clear();
        self.state = DebugState::Running;
        self.invoke(&function, Vec::new())?;
        self.lifecycle = Lifecycle::Running;
        info!(entry, "execution started");
        Ok(())
    }

    /// Start `entry` and run it to completion
    pub fn run_main(&mut self, entry: &str) -> Result<Outcome, VmError> {
        self.start(entry)?;
        self.run_to_completion()
    }

    /// Run without yielding until the program finishes, halts or pauses
    pub fn run_to_completion(&mut self) -> Result<Outcome, VmError> {
        self.drive(usize::MAX)
    }

    /// Run at most `quota` steps
    ///
    /// Stops early when execution pauses, finishes or fails. While paused,
    /// halted or finished this is a no-op.
    pub fn tick(&mut self, quota: usize) -> Result<Outcome, VmError> {
        self.drive(quota)
    }

    /// Execute one operation of the top frame
    ///
    /// The frame is detached while its operation runs, so the operation gets
    /// `&mut Runtime` and `&mut Frame` at the same time. A frame whose code
    /// is exhausted is popped instead.
    pub fn step(&mut self) -> Result<Step, VmError> {
        let Some(mut frame) = self.frames.pop() else {
            return Ok(Step::Done);
        };
        let depth = self.frames.len();

        if frame.is_exhausted() {
            trace!(function = %frame.function, depth, "pop frame");
            return Ok(self.progress());
        }

        frame.prev_pc = frame.pc;
        frame.pc += 1;
        let code = Arc::clone(&frame.code);
        let op = &code[frame.prev_pc];
        trace!(function = %frame.function, pc = frame.prev_pc, line = op.line(), "step");

        let result = op.execute(self, &mut frame);

        // Callees pushed by the operation sit above `depth`
        if result.is_err() || !frame.finished {
            self.frames.insert(depth, frame);
        } else {
            trace!(function = %frame.function, depth, "frame finished");
        }
        result.map(|()| self.progress())
    }

    /* ===================== Drivers ===================== */

    fn drive(&mut self, quota: usize) -> Result<Outcome, VmError> {
        match self.lifecycle {
            Lifecycle::Ready => return Err(InternalError::NoFrame.into()),
            Lifecycle::Finished => return Ok(Outcome::Finished),
            Lifecycle::Halted => return Ok(Outcome::Halted),
            Lifecycle::Running => {}
        }

        let mut steps = 0;
        while steps < quota {
            if self.state == DebugState::Paused {
                return Ok(Outcome::Paused);
            }
            match self.step() {
                Ok(Step::Continue) => steps += 1,
                Ok(Step::Done) => break,
                Err(err) => return self.fail(err),
            }
        }

        if self.frames.is_empty() {
            self.complete();
            return Ok(Outcome::Finished);
        }
        if self.state == DebugState::Paused {
            return Ok(Outcome::Paused);
        }
        Ok(Outcome::Yielded)
    }

    fn progress(&self) -> Step {
        if self.frames.is_empty() {
            Step::Done
        } else {
            Step::Continue
        }
    }

    fn complete(&mut self) {
        self.lifecycle = Lifecycle::Finished;
        self.handle.exit();
        info!("execution finished");
    }

    /// Report `err` and halt. User errors end the run normally; internal
    /// errors are escalated to the caller.
    fn fail(&mut self, err: VmError) -> Result<Outcome, VmError> {
        let report = self.report(&err);
        self.lifecycle = Lifecycle::Halted;
        self.handle.error(&report);

        match err {
            VmError::Runtime { .. } => {
                warn!(header = %report.header, body = %report.body, "execution halted");
                Ok(Outcome::Halted)
            }
            VmError::Internal(ref internal) => {
                let function = self.current_frame().map(|f| f.function().to_string());
                error!(error = %internal, ?function, "internal runtime failure");
                Err(err)
            }
        }
    }
}
