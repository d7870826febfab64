use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Sentinel assignee for tasks nobody has picked up yet
pub const UNASSIGNED: &str = "unassigned";

#[derive(Serialize, Deserialize, Clone)]
pub struct Task {
    /// Auto-incremental task id, issued by the store counter
    pub id: u64,
    /// Title of the task
    pub title: String,
    /// Hard deadline (day granularity)
    pub deadline: Date,
    /// Workflow status
    pub status: Status,
    /// Free-form categorical tag, display only
    pub domain: String,
    /// Optional free-text constraint note
    pub condition: Option<String>,
    /// Free-form duration estimate (e.g. "2d"), not a structured time value
    pub duration: String,
    /// Difficulty rating, 1-10
    pub difficulty: u8,
    /// Priority rating, 0-100
    pub priority: u8,
    /// Assignee name, or the "unassigned" sentinel
    pub assignee: String,
    /// When the task was created
    pub created_at: Timestamp,
    /// Completion percentage, 0-100; derived from subtasks when any exist
    pub progress: u8,
    /// Checklist items driving automatic progress computation
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// The specification this task is assigned to, if any
    #[serde(default)]
    pub specification_id: Option<String>,
}

impl Task {
    /// Checklist completion rounded to the nearest integer percentage.
    /// An empty checklist yields 0; callers decide on a status default.
    pub fn progress_from_subtasks(subtasks: &[Subtask]) -> u8 {
        if subtasks.is_empty() {
            return 0;
        }
        let completed = subtasks.iter().filter(|s| s.completed).count();
        ((completed as f64 / subtasks.len() as f64) * 100.0).round() as u8
    }

    /// Re-derive `progress` from the checklist. No-op when there are no
    /// subtasks, since a manual percentage is authoritative then.
    pub fn recompute_progress(&mut self) {
        if !self.subtasks.is_empty() {
            self.progress = Self::progress_from_subtasks(&self.subtasks);
        }
    }

    /// Next free subtask id within this task
    pub fn next_subtask_id(&self) -> u64 {
        self.subtasks.iter().map(|s| s.id).max().map_or(1, |id| id + 1)
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Subtask {
    /// Unique within the owning task
    pub id: u64,
    /// Checklist label
    pub text: String,
    /// Whether the item is done
    pub completed: bool,
    /// Indentation depth; the UI caps this at 2
    #[serde(default)]
    pub level: u8,
    /// When the item was added
    pub created_at: Timestamp,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Standby,
    Completed,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown status '{0}'. Expected one of: not-started, in-progress, standby, completed")]
pub struct StatusParseError(pub String);

impl Status {
    /// Default progress percentage for a task created without a checklist
    pub fn default_progress(self) -> u8 {
        match self {
            Status::NotStarted => 0,
            Status::InProgress => 25,
            Status::Standby => 50,
            Status::Completed => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not-started",
            Status::InProgress => "in-progress",
            Status::Standby => "standby",
            Status::Completed => "completed",
        }
    }

    /// Human-readable label for rendering
    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "Not started",
            Status::InProgress => "In progress",
            Status::Standby => "Stand by",
            Status::Completed => "Completed",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(Status::NotStarted),
            "in-progress" => Ok(Status::InProgress),
            "standby" => Ok(Status::Standby),
            "completed" => Ok(Status::Completed),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
