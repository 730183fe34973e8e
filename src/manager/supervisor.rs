use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};

use crate::app::console::ConsoleSink;
use crate::manager::{config::SupervisorConfig, registry::Registry};
use crate::models::{
    error::{describe_exit, ShutdownReason},
    message::{SupervisorEvent, TaskOutcome},
    state::SupervisorState,
    task::{DisplayColor, TaskSpec},
};
use crate::worker::worker::spawn_task_unit;

struct Lifecycle {
    state: SupervisorState,
    reason: Option<ShutdownReason>,
}

/// How a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task ended on its own without triggering a shutdown.
    Completed,
    /// A failure drove the shutdown sweep.
    Failed,
    /// The operator interrupted; units were not joined.
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Failed | RunOutcome::Interrupted => 1,
        }
    }
}

/// Cloneable trigger that asks a running supervisor to shut down, usable
/// from any thread.
#[derive(Clone)]
pub struct InterruptHandle {
    sender: Sender<SupervisorEvent>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        if self.sender.send(SupervisorEvent::Interrupted).is_err() {
            warn!("Interrupt received after the supervisor stopped listening.");
        }
    }
}

pub struct Supervisor {
    config: SupervisorConfig,
    console: ConsoleSink,
    registry: Registry,
    lifecycle: Mutex<Lifecycle>,
    terminated: Condvar,
    sweeps: AtomicUsize,
    sender: Sender<SupervisorEvent>,
    receiver: Receiver<SupervisorEvent>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, console: ConsoleSink) -> Self {
        let (sender, receiver) = unbounded();
        Supervisor {
            config,
            console,
            registry: Registry::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: SupervisorState::Running,
                reason: None,
            }),
            terminated: Condvar::new(),
            sweeps: AtomicUsize::new(0),
            sender,
            receiver,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> SupervisorState {
        self.lifecycle().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.lifecycle().reason.clone()
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            sender: self.sender.clone(),
        }
    }

    /// Launches one unit per task and blocks until they all finish or an
    /// interrupt arrives.
    pub fn run(self: &Arc<Self>, tasks: Vec<TaskSpec>) -> RunOutcome {
        let mut handles = Vec::with_capacity(tasks.len());
        for spec in tasks {
            let name = spec.name.clone();
            match spawn_task_unit(Arc::new(spec), Arc::clone(self), self.sender.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("Failed to start unit for '{}': {}", name, e);
                    self.initiate_shutdown(ShutdownReason::SpawnFailed {
                        task: name,
                        detail: e.to_string(),
                    });
                }
            }
        }

        let mut pending = handles.len();
        while pending > 0 {
            match self.receiver.recv() {
                Ok(SupervisorEvent::UnitFinished { name, outcome }) => {
                    pending -= 1;
                    if let TaskOutcome::Failed { code } = outcome {
                        info!("Unit '{}' ended with {}.", name, describe_exit(code));
                    }
                    info!("Unit '{}' done, {} remaining.", name, pending);
                }
                Ok(SupervisorEvent::Interrupted) => {
                    self.initiate_shutdown(ShutdownReason::UserInterrupt);
                    self.wait_terminated();
                    return RunOutcome::Interrupted;
                }
                Err(e) => {
                    error!("Event channel closed: {}", e);
                    break;
                }
            }
        }

        for handle in handles {
            if handle.join().is_err() {
                error!("A task unit panicked.");
            }
        }
        info!("{} task(s) were launched.", self.registry.len());

        if self.is_running() {
            RunOutcome::Completed
        } else {
            self.wait_terminated();
            RunOutcome::Failed
        }
    }

    /// Runs the shutdown sweep if nobody has yet. Returns `true` only for the
    /// single call that performed it.
    pub fn initiate_shutdown(&self, reason: ShutdownReason) -> bool {
        {
            let mut lifecycle = self.lifecycle();
            if !lifecycle.state.is_running() {
                return false;
            }
            lifecycle.state = SupervisorState::ShuttingDown;
            lifecycle.reason = Some(reason.clone());
        }
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        info!("Shutting down: {}", reason);

        // Terminated is recorded even if the sweep unwinds, so waiters never hang.
        let _terminated = TerminateOnDrop(self);
        self.console.alert(&format!("Shutdown initiated: {}", reason));
        self.sweep();

        info!("All processes stopped.");
        self.console.notice("All processes stopped.");
        true
    }

    /// Blocks until the shutdown sweep has completed.
    pub fn wait_terminated(&self) {
        let mut lifecycle = self.lifecycle();
        while lifecycle.state != SupervisorState::Terminated {
            lifecycle = self
                .terminated
                .wait(lifecycle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn sweep(&self) {
        let processes = self.registry.seal();

        for process in &processes {
            match process.terminate() {
                Ok(true) => self.console.task_line_in(process.name(), DisplayColor::Default, "Terminating..."),
                Ok(false) => {}
                Err(e) => {
                    warn!("Error terminating '{}': {}", process.name(), e);
                    self.console
                        .task_line_in(process.name(), DisplayColor::Default, &format!("Error terminating: {}", e));
                }
            }
        }

        // No representable deadline means waiting without one.
        let deadline = Instant::now().checked_add(self.config.grace_period);
        for process in &processes {
            let waited = match deadline {
                Some(deadline) => process.wait_until(deadline, self.config.poll_interval),
                None => process.wait_exit(self.config.poll_interval).map(Some),
            };
            match waited {
                Ok(Some(_)) => {}
                Ok(None) => {
                    self.console.task_line_in(process.name(), DisplayColor::Default, "Force killing...");
                    if let Err(e) = process.force_kill() {
                        warn!("Error killing '{}': {}", process.name(), e);
                        self.console
                            .task_line_in(process.name(), DisplayColor::Default, &format!("Error killing: {}", e));
                    }
                }
                Err(e) => warn!("Error waiting for '{}': {}", process.name(), e),
            }
        }

        let survivors = processes.iter().filter(|p| p.is_alive()).count();
        if survivors > 0 {
            warn!("{} process(es) still alive after the sweep.", survivors);
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn sweep_count(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

struct TerminateOnDrop<'a>(&'a Supervisor);

impl Drop for TerminateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lifecycle().state = SupervisorState::Terminated;
        self.0.terminated.notify_all();
    }
}
