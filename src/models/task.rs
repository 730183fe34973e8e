use std::{fmt, path::PathBuf, str::FromStr};

use crossterm::style::Color;

use super::error::ConfigError;

/// Immutable description of one supervised command.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    pub color: DisplayColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayColor {
    Blue,
    Green,
    Cyan,
    Magenta,
    Yellow,
    Red,
    Default,
}

impl DisplayColor {
    /// Colors handed out to tasks that don't pick one, in table order.
    pub const PALETTE: [DisplayColor; 5] = [
        DisplayColor::Blue,
        DisplayColor::Green,
        DisplayColor::Cyan,
        DisplayColor::Magenta,
        DisplayColor::Yellow,
    ];

    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn terminal_color(self) -> Color {
        match self {
            DisplayColor::Blue => Color::Blue,
            DisplayColor::Green => Color::Green,
            DisplayColor::Cyan => Color::Cyan,
            DisplayColor::Magenta => Color::Magenta,
            DisplayColor::Yellow => Color::Yellow,
            DisplayColor::Red => Color::Red,
            DisplayColor::Default => Color::Reset,
        }
    }
}

impl FromStr for DisplayColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(DisplayColor::Blue),
            "green" => Ok(DisplayColor::Green),
            "cyan" => Ok(DisplayColor::Cyan),
            "magenta" => Ok(DisplayColor::Magenta),
            "yellow" => Ok(DisplayColor::Yellow),
            "red" => Ok(DisplayColor::Red),
            "default" | "none" => Ok(DisplayColor::Default),
            other => Err(ConfigError::UnknownColor(other.to_string())),
        }
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayColor::Blue => "blue",
            DisplayColor::Green => "green",
            DisplayColor::Cyan => "cyan",
            DisplayColor::Magenta => "magenta",
            DisplayColor::Yellow => "yellow",
            DisplayColor::Red => "red",
            DisplayColor::Default => "default",
        };
        f.write_str(name)
    }
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: PathBuf::from("."),
            color: DisplayColor::Default,
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_color(mut self, color: DisplayColor) -> Self {
        self.color = color;
        self
    }

    /// The executable, i.e. the first element of the argument vector.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colors_case_insensitively() {
        assert_eq!("Blue".parse::<DisplayColor>().unwrap(), DisplayColor::Blue);
        assert_eq!(" green ".parse::<DisplayColor>().unwrap(), DisplayColor::Green);
        assert_eq!("none".parse::<DisplayColor>().unwrap(), DisplayColor::Default);
    }

    #[test]
    fn rejects_unknown_color() {
        let err = "chartreuse".parse::<DisplayColor>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColor(ref c) if c == "chartreuse"));
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(DisplayColor::for_index(0), DisplayColor::Blue);
        assert_eq!(DisplayColor::for_index(1), DisplayColor::Green);
        assert_eq!(DisplayColor::for_index(DisplayColor::PALETTE.len()), DisplayColor::Blue);
    }

    #[test]
    fn builder_sets_fields() {
        let spec = TaskSpec::new("web", vec!["npm".into(), "run".into(), "dev".into()])
            .with_dir("frontend/web")
            .with_color(DisplayColor::Green);

        assert_eq!(spec.program(), Some("npm"));
        assert_eq!(spec.working_dir, PathBuf::from("frontend/web"));
        assert_eq!(spec.color.to_string(), "green");
    }
}
