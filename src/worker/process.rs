use std::{
    io,
    process::{Child, ExitStatus},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::models::task::TaskSpec;

/// A launched child, shared between its task unit and the shutdown sweep.
///
/// The `Child` stays behind a mutex and is only ever polled with `try_wait`,
/// so a signal is never sent to a pid that has already been reaped.
#[derive(Debug)]
pub struct ManagedProcess {
    spec: Arc<TaskSpec>,
    pid: u32,
    child: Mutex<Child>,
}

impl ManagedProcess {
    pub fn new(spec: Arc<TaskSpec>, child: Child) -> Self {
        Self {
            spec,
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn poll_exit(&self) -> io::Result<Option<ExitStatus>> {
        self.lock().try_wait()
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.poll_exit(), Ok(None))
    }

    /// Requests a graceful stop. Returns `Ok(false)` if the child had
    /// already exited and nothing was sent.
    pub fn terminate(&self) -> io::Result<bool> {
        let mut child = self.lock();
        if child.try_wait()?.is_some() {
            return Ok(false);
        }
        send_terminate(&mut child, self.pid)?;
        debug!("Sent termination request to '{}' (pid {}).", self.spec.name, self.pid);
        Ok(true)
    }

    /// Kills the child (and its process group on unix) and reaps it.
    pub fn force_kill(&self) -> io::Result<ExitStatus> {
        let mut child = self.lock();
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        send_kill(&mut child, self.pid)?;
        debug!("Force killed '{}' (pid {}).", self.spec.name, self.pid);
        child.wait()
    }

    /// Polls until the child exits or `deadline` passes. `Ok(None)` means
    /// it was still running at the deadline.
    pub fn wait_until(&self, deadline: Instant, poll: Duration) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.poll_exit()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(poll.min(deadline - now));
        }
    }

    pub fn wait_exit(&self, poll: Duration) -> io::Result<ExitStatus> {
        loop {
            if let Some(status) = self.poll_exit()? {
                return Ok(status);
            }
            thread::sleep(poll);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Children are spawned as process-group leaders, so signalling the negated
// pid reaches everything they started (npm, watchexec and the like).
#[cfg(unix)]
fn send_terminate(_child: &mut Child, pid: u32) -> io::Result<()> {
    signal_group(pid, libc::SIGTERM)
}

#[cfg(unix)]
fn send_kill(_child: &mut Child, pid: u32) -> io::Result<()> {
    signal_group(pid, libc::SIGKILL)
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    // The group can be gone while the leader is still a zombie; fall back
    // to the leader itself.
    if err.raw_os_error() == Some(libc::ESRCH) {
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc == 0 {
            return Ok(());
        }
        return Err(io::Error::last_os_error());
    }
    Err(err)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.kill()
}

#[cfg(not(unix))]
fn send_kill(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.kill()
}
