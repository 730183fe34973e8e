use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::info;

use crate::models::error::RegistryError;
use crate::worker::process::ManagedProcess;

#[derive(Default)]
struct Inner {
    processes: HashMap<String, Arc<ManagedProcess>>,
    sealed: bool,
}

/// Live processes by task name. Appendable while the supervisor runs,
/// frozen once the shutdown sweep seals it.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, process: Arc<ManagedProcess>) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.sealed {
            return Err(RegistryError::Sealed(process.name().to_string()));
        }
        info!("Registered '{}' (pid {}).", process.name(), process.pid());
        inner.processes.insert(process.name().to_string(), process);
        Ok(())
    }

    /// Freezes the registry and returns everything registered so far,
    /// ordered by name.
    pub fn seal(&self) -> Vec<Arc<ManagedProcess>> {
        let mut inner = self.lock();
        inner.sealed = true;
        let mut processes: Vec<_> = inner.processes.values().cloned().collect();
        processes.sort_by(|a, b| a.name().cmp(b.name()));
        processes
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<Arc<ManagedProcess>> {
        self.lock().processes.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().processes.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::task::TaskSpec;
    use std::process::{Command, Stdio};
    use std::thread;

    fn process(name: &str) -> Arc<ManagedProcess> {
        let child = Command::new("true").stdout(Stdio::null()).spawn().unwrap();
        Arc::new(ManagedProcess::new(
            Arc::new(TaskSpec::new(name, vec!["true".into()])),
            child,
        ))
    }

    #[test]
    fn concurrent_registrations_are_all_kept() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register(process(&format!("task-{}", i))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 8);
        assert!(registry.get("task-3").is_some());
    }

    #[test]
    fn sealed_registry_refuses_new_processes() {
        let registry = Registry::new();
        registry.register(process("b")).unwrap();
        registry.register(process("a")).unwrap();

        let sealed: Vec<_> = registry.seal().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(sealed, vec!["a", "b"]);

        assert_eq!(
            registry.register(process("late")),
            Err(RegistryError::Sealed("late".into()))
        );
        assert_eq!(registry.len(), 2);
    }
}
