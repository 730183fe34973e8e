use std::{collections::HashSet, path::PathBuf, time::Duration};

use clap::Parser;

use crate::manager::config::{SupervisorConfig, DEFAULT_POLL_INTERVAL, MAX_GRACE_PERIOD};
use crate::models::{
    error::ConfigError,
    task::{DisplayColor, TaskSpec},
};

/// Runs the development processes side by side and stops all of them as
/// soon as one fails.
#[derive(Debug, Parser)]
#[command(name = "dev_supervisor", version, about)]
pub struct Cli {
    /// Task definition, NAME=COMMAND. Repeatable. Defaults to the api and
    /// frontend dev servers.
    #[arg(long = "task", value_name = "NAME=COMMAND")]
    pub tasks: Vec<String>,

    /// Working directory for a task, relative to the root.
    #[arg(long = "dir", value_name = "NAME=DIR")]
    pub dirs: Vec<String>,

    /// Prefix color for a task (blue, green, cyan, magenta, yellow, red, default).
    #[arg(long = "color", value_name = "NAME=COLOR")]
    pub colors: Vec<String>,

    /// Project root the task directories are resolved against.
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Seconds a terminated task gets before it is force-killed.
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub grace_secs: f64,

    /// Disable colored prefixes.
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn supervisor_config(&self) -> Result<SupervisorConfig, ConfigError> {
        let grace_period = Duration::try_from_secs_f64(self.grace_secs)
            .ok()
            .filter(|grace| *grace <= MAX_GRACE_PERIOD)
            .ok_or(ConfigError::InvalidGrace(self.grace_secs))?;
        Ok(SupervisorConfig {
            project_root: self.root.clone().unwrap_or_else(|| PathBuf::from(".")),
            grace_period,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn task_table(&self) -> Result<Vec<TaskSpec>, ConfigError> {
        let mut table = if self.tasks.is_empty() {
            default_tasks()
        } else {
            let mut table = Vec::with_capacity(self.tasks.len());
            let mut seen = HashSet::new();
            for (index, raw) in self.tasks.iter().enumerate() {
                let (name, command) = split_pair(raw)?;
                if !seen.insert(name.to_string()) {
                    return Err(ConfigError::DuplicateTask(name.to_string()));
                }
                let argv = shlex::split(command).ok_or_else(|| ConfigError::BadQuoting(name.to_string()))?;
                if argv.is_empty() {
                    return Err(ConfigError::EmptyCommand(name.to_string()));
                }
                table.push(TaskSpec::new(name, argv).with_color(DisplayColor::for_index(index)));
            }
            table
        };

        for raw in &self.dirs {
            let (name, dir) = split_pair(raw)?;
            find_task(&mut table, name)?.working_dir = PathBuf::from(dir);
        }
        for raw in &self.colors {
            let (name, color) = split_pair(raw)?;
            let color: DisplayColor = color.parse()?;
            find_task(&mut table, name)?.color = color;
        }
        Ok(table)
    }
}

/// The project's usual development session: API regeneration on backend
/// changes plus the frontend dev server.
pub fn default_tasks() -> Vec<TaskSpec> {
    let args = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        TaskSpec::new(
            "api",
            args(&["watchexec", "-e", "rs,toml", "-r", "--", "sh", "-c", "npm run api:generate"]),
        )
        .with_dir(".")
        .with_color(DisplayColor::Blue),
        TaskSpec::new("frontend", args(&["npm", "run", "dev"]))
            .with_dir(".")
            .with_color(DisplayColor::Green),
    ]
}

fn split_pair(raw: &str) -> Result<(&str, &str), ConfigError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(ConfigError::MalformedPair(raw.to_string())),
    }
}

fn find_task<'a>(table: &'a mut [TaskSpec], name: &str) -> Result<&'a mut TaskSpec, ConfigError> {
    table
        .iter_mut()
        .find(|spec| spec.name == name)
        .ok_or_else(|| ConfigError::UnknownTask(name.to_string()))
}
