/// Lifecycle of the whole supervisor. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SupervisorState {
    Running,
    ShuttingDown,
    Terminated,
}

impl SupervisorState {
    pub fn is_running(self) -> bool {
        self == SupervisorState::Running
    }
}
