use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::debug;

use crate::app::console::ConsoleSink;
use crate::manager::supervisor::Supervisor;
use crate::models::task::TaskSpec;

/// Forwards a task's merged output to the console until the stream closes
/// or the supervisor leaves the running state. Returns the number of lines
/// written.
pub fn relay(spec: &TaskSpec, output: Receiver<String>, supervisor: &Supervisor) -> usize {
    relay_lines(spec, output, supervisor.console(), supervisor.config().poll_interval, || {
        supervisor.is_running()
    })
}

fn relay_lines(
    spec: &TaskSpec,
    output: Receiver<String>,
    console: &ConsoleSink,
    poll: Duration,
    running: impl Fn() -> bool,
) -> usize {
    let mut written = 0;
    loop {
        match output.recv_timeout(poll) {
            Ok(line) => {
                if !console.task_line_if(spec, &line, &running) {
                    break;
                }
                written += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Relay for '{}' finished after {} lines.", spec.name, written);
    written
}
