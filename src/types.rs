// src/types.rs

//! Small shared vocabulary types: task kinds, CLI targets and reload kinds.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The built-in units of work.
///
/// Each variant maps to exactly one [`crate::tasks::AssetTask`]
/// implementation in the task registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Clean,
    Html,
    Css,
    MinCss,
    Js,
    MinJs,
    CopyImages,
    MinImages,
    Copy,
}

impl TaskKind {
    pub const ALL: [TaskKind; 9] = [
        TaskKind::Clean,
        TaskKind::Html,
        TaskKind::Css,
        TaskKind::MinCss,
        TaskKind::Js,
        TaskKind::MinJs,
        TaskKind::CopyImages,
        TaskKind::MinImages,
        TaskKind::Copy,
    ];

    /// Name used on the command line, in logs and as the scheduler key.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Html => "html",
            TaskKind::Css => "css",
            TaskKind::MinCss => "mincss",
            TaskKind::Js => "js",
            TaskKind::MinJs => "minjs",
            TaskKind::CopyImages => "copyimages",
            TaskKind::MinImages => "minimages",
            TaskKind::Copy => "copy",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown task: {s}"))
    }
}

/// What the user asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Production pipeline.
    Build,
    /// Development pipeline, preview server and watch bindings.
    Serve,
    /// Development pipeline and watch bindings, no preview server.
    Watch,
    /// A single task, run without `clean`.
    Task(TaskKind),
}

impl Target {
    /// Whether this target keeps running and reacting to file changes.
    pub fn is_watching(self) -> bool {
        matches!(self, Target::Serve | Target::Watch)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Build => f.write_str("build"),
            Target::Serve => f.write_str("serve"),
            Target::Watch => f.write_str("watch"),
            Target::Task(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "build" => Ok(Target::Build),
            "serve" => Ok(Target::Serve),
            "watch" => Ok(Target::Watch),
            other => other.parse::<TaskKind>().map(Target::Task).map_err(|_| {
                format!(
                    "unknown task: {s} (expected build, serve, watch or one of: {})",
                    TaskKind::ALL.map(TaskKind::as_str).join(", ")
                )
            }),
        }
    }
}

/// Browser signal emitted after a watch-triggered task succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadKind {
    /// Do not notify connected browsers.
    None,
    /// Reload the whole page.
    FullReload,
    /// Swap matching stylesheets in place.
    InjectStyles,
    /// Re-insert matching scripts in place.
    InjectScripts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_names_round_trip_through_from_str() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>(), Ok(kind));
        }
    }

    #[test]
    fn targets_parse_case_insensitively() {
        assert_eq!("BUILD".parse::<Target>(), Ok(Target::Build));
        assert_eq!("serve".parse::<Target>(), Ok(Target::Serve));
        assert_eq!("MinCss".parse::<Target>(), Ok(Target::Task(TaskKind::MinCss)));
    }

    #[test]
    fn unknown_target_lists_valid_names() {
        let err = "deploy".parse::<Target>().unwrap_err();
        assert!(err.contains("deploy"));
        assert!(err.contains("copyimages"));
    }
}
