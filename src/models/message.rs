/// Events delivered to the supervisor's main loop.
#[derive(Debug)]
pub enum SupervisorEvent {
    UnitFinished { name: String, outcome: TaskOutcome },
    Interrupted,
}

/// How a task unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed { code: Option<i32> },
    LaunchFailed,
    Cancelled,
}
