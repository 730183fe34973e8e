mod app;
mod manager;
mod models;
mod worker;

use std::{
    io::{self, IsTerminal},
    process,
    sync::Arc,
};

use clap::Parser;
use log::{error, info};

use app::{cli::Cli, console::ConsoleSink, signals::install_interrupt_handler};
use manager::supervisor::Supervisor;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let (config, tasks) = match cli.supervisor_config().and_then(|config| Ok((config, cli.task_table()?))) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("dev_supervisor: {}", e);
            process::exit(2);
        }
    };

    let colored = !cli.no_color && io::stdout().is_terminal();
    let supervisor = Arc::new(Supervisor::new(config, ConsoleSink::stdout(colored)));

    if let Err(e) = install_interrupt_handler(supervisor.interrupt_handle()) {
        error!("Failed to install Ctrl+C handler: {}", e);
    }

    supervisor.console().notice("Starting development servers...");
    let outcome = supervisor.run(tasks);
    info!("Supervisor finished: {:?}", outcome);
    if let Some(reason) = supervisor.shutdown_reason() {
        info!("Shutdown reason: {}", reason);
    }

    process::exit(outcome.exit_code());
}
