use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;
use log::{error, info, warn};

use crate::manager::supervisor::Supervisor;
use crate::models::{
    error::{describe_exit, LaunchError, ShutdownReason},
    message::{SupervisorEvent, TaskOutcome},
    task::{DisplayColor, TaskSpec},
};
use crate::worker::{launcher, relay::relay};

/// Starts the unit that owns `spec` for its whole lifetime and reports the
/// outcome on `events` when done.
pub fn spawn_task_unit(
    spec: Arc<TaskSpec>,
    supervisor: Arc<Supervisor>,
    events: Sender<SupervisorEvent>,
) -> io::Result<JoinHandle<()>> {
    let name = spec.name.clone();
    spawn_unit(name, Arc::clone(&supervisor), events, move || run_task(spec, &supervisor))
}

/// Runs `work` on a named thread. The unit always reports back, even when
/// `work` panics; a panic counts as a failure and triggers the sweep.
fn spawn_unit(
    name: String,
    supervisor: Arc<Supervisor>,
    events: Sender<SupervisorEvent>,
    work: impl FnOnce() -> TaskOutcome + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("task-{}", name))
        .spawn(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("Task unit '{}' panicked.", name);
                    supervisor.initiate_shutdown(ShutdownReason::UnitPanicked { task: name.clone() });
                    TaskOutcome::Failed { code: None }
                }
            };
            info!("Task '{}' finished: {:?}", name, outcome);
            if events.send(SupervisorEvent::UnitFinished { name: name.clone(), outcome }).is_err() {
                warn!("Task '{}' finished after the supervisor stopped listening.", name);
            }
        })
}

pub fn run_task(spec: Arc<TaskSpec>, supervisor: &Supervisor) -> TaskOutcome {
    let console = supervisor.console();
    let starting = format!("Starting in {}...", spec.working_dir.display());
    if !console.task_line_if(&spec, &starting, || supervisor.is_running()) {
        return TaskOutcome::Cancelled;
    }

    let launched = match launcher::launch(Arc::clone(&spec), &supervisor.config().project_root, supervisor.registry()) {
        Ok(launched) => launched,
        Err(LaunchError::Cancelled) => return TaskOutcome::Cancelled,
        Err(e) => {
            console.task_line_in(&spec.name, DisplayColor::Red, &format!("ERROR: {}", e));
            if let Some(reason) = ShutdownReason::from_launch(&spec.name, &e) {
                supervisor.initiate_shutdown(reason);
            }
            return TaskOutcome::LaunchFailed;
        }
    };

    relay(&spec, launched.output, supervisor);

    let code = match launched.process.wait_exit(supervisor.config().poll_interval) {
        Ok(status) if status.success() => return TaskOutcome::Completed,
        Ok(status) => status.code(),
        Err(e) => {
            error!("Failed to wait for '{}': {}", spec.name, e);
            None
        }
    };

    // Exits caused by an ongoing sweep are expected, only the first failure reports.
    if supervisor.is_running() {
        console.task_line_in(
            &spec.name,
            DisplayColor::Red,
            &format!("Process exited with {}", describe_exit(code)),
        );
        supervisor.initiate_shutdown(ShutdownReason::AbnormalExit {
            task: spec.name.clone(),
            code,
        });
    }
    TaskOutcome::Failed { code }
}
