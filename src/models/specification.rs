use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use slug::slugify;

use crate::models::task::Status;

/// Ids of the fixed seed specifications installed on first run
pub const SEED_SPEC_IDS: [&str; 5] = [
    "interface-horror",
    "task-management",
    "dashboard-analytics",
    "performance-optim",
    "modular-architecture",
];

#[derive(Serialize, Deserialize, Clone)]
pub struct Specification {
    /// Fixed slug for seed entries, generated token otherwise
    pub id: String,
    /// Title of the specification
    pub title: String,
    /// What this specification covers
    pub description: String,
    /// Categorical tag (ui, features, performance, ...)
    pub category: String,
    /// Priority rating, 0-100
    pub priority: u8,
    /// Workflow status, same domain as Task
    pub status: Status,
    /// Ids of the tasks assigned to this specification
    #[serde(default)]
    pub task_ids: Vec<u64>,
    /// When the specification was created
    pub created_at: Timestamp,
}

impl Specification {
    /// Token for a user-created specification: the slugified title plus the
    /// creation instant in unix milliseconds, so two specs with the same
    /// title still get distinct ids.
    pub fn generate_id(title: &str, now: Timestamp) -> String {
        format!("{}-{}", slugify(title), now.as_millisecond())
    }
}

/// The fixed specification list a fresh store starts with
pub fn seed_specifications(now: Timestamp) -> Vec<Specification> {
    let seed = |id: &str, title: &str, category: &str, description: &str, priority: u8| {
        Specification {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            priority,
            status: Status::Completed,
            task_ids: vec![],
            created_at: now,
        }
    };

    vec![
        seed(
            "interface-horror",
            "Organic Horror Interface",
            "ui",
            "Dark interface with the full horror palette",
            95,
        ),
        seed(
            "task-management",
            "Task Management System",
            "features",
            "Complete CRUD with hierarchical subtasks",
            98,
        ),
        seed(
            "dashboard-analytics",
            "Analytics Dashboard",
            "features",
            "Live statistics and visualisations",
            85,
        ),
        seed(
            "performance-optim",
            "Performance Optimisations",
            "performance",
            "Application tuned for responsiveness",
            80,
        ),
        seed(
            "modular-architecture",
            "Modular Architecture",
            "architecture",
            "Code organised into reusable modules",
            90,
        ),
    ]
}
