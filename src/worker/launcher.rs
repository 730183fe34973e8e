use std::{
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
    thread,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::manager::registry::Registry;
use crate::models::{error::LaunchError, task::TaskSpec};
use crate::worker::process::ManagedProcess;

/// A started task: its registered handle and the merged stdout/stderr lines.
pub struct Launched {
    pub process: Arc<ManagedProcess>,
    pub output: Receiver<String>,
}

pub fn resolve_dir(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    }
}

pub fn launch(spec: Arc<TaskSpec>, root: &Path, registry: &Registry) -> Result<Launched, LaunchError> {
    let program = spec.program().ok_or_else(|| LaunchError::SpawnFailed {
        detail: "empty command".to_string(),
    })?;

    let cwd = resolve_dir(root, &spec.working_dir);
    if !cwd.is_dir() {
        return Err(LaunchError::SpawnFailed {
            detail: format!("working directory {} does not exist", cwd.display()),
        });
    }

    info!("Starting task '{}': {:?} in {}", spec.name, spec.command, cwd.display());

    let mut command = Command::new(program);
    command
        .args(&spec.command[1..])
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!("Task '{}': command not found: {}", spec.name, program);
            return Err(LaunchError::CommandNotFound { program: program.to_string() });
        }
        Err(e) => {
            error!("Task '{}': failed to spawn: {}", spec.name, e);
            return Err(LaunchError::spawn_failed(&e));
        }
    };

    let (sender, receiver) = unbounded();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let process = Arc::new(ManagedProcess::new(Arc::clone(&spec), child));
    if let Err(e) = registry.register(Arc::clone(&process)) {
        debug!("{}", e);
        if let Err(e) = process.force_kill() {
            error!("Failed to kill late-launched '{}': {}", spec.name, e);
        }
        return Err(LaunchError::Cancelled);
    }

    if let Some(stdout) = stdout {
        spawn_reader(&spec.name, "stdout", stdout, sender.clone());
    }
    if let Some(stderr) = stderr {
        spawn_reader(&spec.name, "stderr", stderr, sender);
    }

    Ok(Launched { process, output: receiver })
}

/// Feeds one pipe into the shared line channel until EOF, a read error, or
/// the relay hanging up.
fn spawn_reader(task: &str, stream: &'static str, pipe: impl Read + Send + 'static, sender: Sender<String>) {
    let task = task.to_string();
    let spawned = thread::Builder::new()
        .name(format!("{}-{}", task, stream))
        .spawn(move || {
            let reader = BufReader::new(pipe);
            for chunk in reader.split(b'\n') {
                let Ok(bytes) = chunk else { break };
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim_end_matches('\r').to_string();
                if sender.send(line).is_err() {
                    break;
                }
            }
            debug!("Task '{}' {} closed.", task, stream);
        });
    if let Err(e) = spawned {
        error!("Failed to start {} reader: {}", stream, e);
    }
}
