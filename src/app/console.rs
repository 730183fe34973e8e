use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use crossterm::style::{Color, Stylize};
use log::warn;

use crate::models::task::{DisplayColor, TaskSpec};

/// Shared, line-serialized output target for relays and supervisor notices.
///
/// Every line is written and flushed while holding the lock, so lines from
/// concurrent writers never interleave mid-line.
#[derive(Clone)]
pub struct ConsoleSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
    colored: bool,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>, colored: bool) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            colored,
        }
    }

    pub fn stdout(colored: bool) -> Self {
        Self::new(Box::new(io::stdout()), colored)
    }

    /// Writes `line` under the task's colored prefix.
    pub fn task_line(&self, spec: &TaskSpec, line: &str) {
        self.task_line_in(&spec.name, spec.color, line);
    }

    pub fn task_line_in(&self, name: &str, color: DisplayColor, line: &str) {
        let rendered = self.render(name, color, line);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        write_line(&mut *out, &rendered);
    }

    /// Writes a task line only if `allowed` still holds once the sink is
    /// locked. Returns whether the line was written.
    ///
    /// Evaluating the guard under the lock means a line can never land after
    /// a notice that was written once the guard turned false.
    pub fn task_line_if(&self, spec: &TaskSpec, line: &str, allowed: impl FnOnce() -> bool) -> bool {
        let rendered = self.render(&spec.name, spec.color, line);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if !allowed() {
            return false;
        }
        write_line(&mut *out, &rendered);
        true
    }

    /// Bold supervisor message without a task prefix.
    pub fn notice(&self, message: &str) {
        self.unprefixed(message, None);
    }

    /// Bold red supervisor message.
    pub fn alert(&self, message: &str) {
        self.unprefixed(message, Some(Color::Red));
    }

    fn unprefixed(&self, message: &str, color: Option<Color>) {
        let rendered = if self.colored {
            match color {
                Some(color) => message.with(color).bold().to_string(),
                None => message.bold().to_string(),
            }
        } else {
            message.to_string()
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        write_line(&mut *out, &rendered);
    }

    fn render(&self, name: &str, color: DisplayColor, line: &str) -> String {
        let prefix = format!("[{}]", name);
        if self.colored {
            format!("{} {}", prefix.with(color.terminal_color()).bold(), line)
        } else {
            format!("{} {}", prefix, line)
        }
    }
}

fn write_line(out: &mut dyn Write, line: &str) {
    if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        warn!("Failed to write console line: {}", e);
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::CaptureBuffer, *};

    #[test]
    fn plain_lines_carry_task_prefix() {
        let buffer = CaptureBuffer::default();
        let sink = buffer.sink();
        let spec = TaskSpec::new("api", vec!["true".into()]);

        sink.task_line(&spec, "listening on :8080");
        sink.notice("All processes stopped.");

        assert_eq!(buffer.lines(), vec!["[api] listening on :8080", "All processes stopped."]);
    }

    #[test]
    fn guarded_line_is_dropped_when_guard_fails() {
        let buffer = CaptureBuffer::default();
        let sink = buffer.sink();
        let spec = TaskSpec::new("web", vec!["true".into()]);

        assert!(sink.task_line_if(&spec, "kept", || true));
        assert!(!sink.task_line_if(&spec, "dropped", || false));

        assert_eq!(buffer.lines(), vec!["[web] kept"]);
    }

    #[test]
    fn colored_prefix_wraps_name_in_escape_codes() {
        let buffer = CaptureBuffer::default();
        let sink = ConsoleSink::new(Box::new(buffer.clone()), true);
        let spec = TaskSpec::new("api", vec!["true".into()]).with_color(DisplayColor::Blue);

        sink.task_line(&spec, "tick");

        let out = buffer.contents();
        assert!(out.contains("[api]"));
        assert!(out.contains('\u{1b}'));
        assert!(out.trim_end().ends_with(" tick"));
    }
}
