use jiff::Timestamp;
use jiff::civil::Date;
use thiserror::Error;

use crate::{
    models::{
        store::Store,
        task::{Status, StatusParseError, Subtask, Task, UNASSIGNED},
    },
    services::assignment,
    storage::{Storage, StorageError},
    sync::event::{ChangeEvent, DeletedTask},
    sync::gateway::SyncGateway,
};

#[derive(Debug, Error)]
pub enum CreateTaskError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Invalid deadline date '{0}': {1}")]
    InvalidDeadline(String, String),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("Difficulty must be between 1 and 10, got {0}")]
    DifficultyOutOfRange(u8),

    #[error("Priority must be between 0 and 100, got {0}")]
    PriorityOutOfRange(u8),

    #[error("Specification '{0}' not found")]
    SpecificationNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct CreateTaskParameters {
    pub title: String,
    pub deadline: String,
    pub status: Option<String>,
    pub domain: Option<String>,
    pub condition: Option<String>,
    pub duration: Option<String>,
    pub difficulty: Option<u8>,
    pub priority: Option<u8>,
    pub assignee: Option<String>,
    /// Initial checklist labels, all starting incomplete
    pub subtasks: Vec<String>,
    /// Specification to assign the new task to
    pub specification: Option<String>,
}

pub fn create_task(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    parameters: CreateTaskParameters,
) -> Result<Task, CreateTaskError> {
    // 1. Validate everything before any mutation (all-or-nothing)
    let title = parameters.title.trim().to_string();
    if title.is_empty() {
        return Err(CreateTaskError::EmptyTitle);
    }

    let deadline = parameters
        .deadline
        .parse::<Date>()
        .map_err(|e| CreateTaskError::InvalidDeadline(parameters.deadline.clone(), e.to_string()))?;

    let status = match &parameters.status {
        Some(raw) => raw.parse::<Status>()?,
        None => Status::default(),
    };

    let difficulty = parameters.difficulty.unwrap_or(5);
    if !(1..=10).contains(&difficulty) {
        return Err(CreateTaskError::DifficultyOutOfRange(difficulty));
    }

    let priority = parameters.priority.unwrap_or(50);
    if priority > 100 {
        return Err(CreateTaskError::PriorityOutOfRange(priority));
    }

    if let Some(spec_id) = &parameters.specification {
        if store.get_specification(spec_id).is_none() {
            return Err(CreateTaskError::SpecificationNotFound(spec_id.clone()));
        }
    }

    // 2. Build the record
    let now = Timestamp::now();
    let subtasks: Vec<Subtask> = parameters
        .subtasks
        .iter()
        .enumerate()
        .map(|(index, text)| Subtask {
            id: index as u64 + 1,
            text: text.clone(),
            completed: false,
            level: 0,
            created_at: now,
        })
        .collect();

    let progress = if subtasks.is_empty() {
        status.default_progress()
    } else {
        Task::progress_from_subtasks(&subtasks)
    };

    let task = Task {
        id: store.next_task_id(),
        title,
        deadline,
        status,
        domain: parameters.domain.unwrap_or_else(|| "development".to_string()),
        condition: parameters.condition.filter(|c| !c.trim().is_empty()),
        duration: parameters.duration.unwrap_or_else(|| "1h".to_string()),
        difficulty,
        priority,
        assignee: parameters
            .assignee
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED.to_string()),
        created_at: now,
        progress,
        subtasks,
        specification_id: None,
    };

    let task_id = task.id;

    // 3. Insert, link, persist once, then notify the gateway
    store.tasks.push(task);

    if let Some(spec_id) = &parameters.specification {
        assignment::link(store, task_id, spec_id);
    }

    storage.save(store)?;

    let created = store.get_task(task_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::TaskCreated(created.clone()));

    Ok(created)
}

#[derive(Debug, Error)]
pub enum UpdateTaskError {
    #[error("Task #{0} not found")]
    TaskNotFound(u64),

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Invalid deadline date '{0}': {1}")]
    InvalidDeadline(String, String),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("Difficulty must be between 1 and 10, got {0}")]
    DifficultyOutOfRange(u8),

    #[error("Priority must be between 0 and 100, got {0}")]
    PriorityOutOfRange(u8),

    #[error("Progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),

    #[error("Progress is derived from the checklist; clear the subtasks before setting it manually")]
    ManualProgressWithSubtasks,

    #[error("Specification '{0}' not found")]
    SpecificationNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Partial update; absent fields stay untouched. The nested option on
/// `specification` distinguishes "leave alone" from "clear".
#[derive(Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    pub domain: Option<String>,
    pub condition: Option<String>,
    pub duration: Option<String>,
    pub difficulty: Option<u8>,
    pub priority: Option<u8>,
    pub assignee: Option<String>,
    pub progress: Option<u8>,
    pub subtasks: Option<Vec<Subtask>>,
    pub specification: Option<Option<String>>,
}

pub fn update_task(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    patch: TaskPatch,
) -> Result<Task, UpdateTaskError> {
    // 1. Validate the patch before touching the record
    let title = match &patch.title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(UpdateTaskError::EmptyTitle);
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let deadline = match &patch.deadline {
        Some(raw) => Some(
            raw.parse::<Date>()
                .map_err(|e| UpdateTaskError::InvalidDeadline(raw.clone(), e.to_string()))?,
        ),
        None => None,
    };

    let status = match &patch.status {
        Some(raw) => Some(raw.parse::<Status>()?),
        None => None,
    };

    if let Some(difficulty) = patch.difficulty {
        if !(1..=10).contains(&difficulty) {
            return Err(UpdateTaskError::DifficultyOutOfRange(difficulty));
        }
    }
    if let Some(priority) = patch.priority {
        if priority > 100 {
            return Err(UpdateTaskError::PriorityOutOfRange(priority));
        }
    }
    if let Some(progress) = patch.progress {
        if progress > 100 {
            return Err(UpdateTaskError::ProgressOutOfRange(progress));
        }
    }

    if let Some(Some(spec_id)) = &patch.specification {
        if store.get_specification(spec_id).is_none() {
            return Err(UpdateTaskError::SpecificationNotFound(spec_id.clone()));
        }
    }

    let task = store
        .get_task(task_id)
        .ok_or(UpdateTaskError::TaskNotFound(task_id))?;

    // Manual progress is only meaningful without a checklist
    let replacing_subtasks = patch.subtasks.is_some();
    let keeps_subtasks = !replacing_subtasks && !task.subtasks.is_empty();
    if patch.progress.is_some() && keeps_subtasks {
        return Err(UpdateTaskError::ManualProgressWithSubtasks);
    }

    let old_spec = task.specification_id.clone();
    let new_spec = match &patch.specification {
        Some(target) => target.clone(),
        None => old_spec.clone(),
    };

    // 2. Merge the patch
    let task = store.get_task_mut(task_id).unwrap();
    if let Some(title) = title {
        task.title = title;
    }
    if let Some(deadline) = deadline {
        task.deadline = deadline;
    }
    if let Some(status) = status {
        task.status = status;
    }
    if let Some(domain) = patch.domain {
        task.domain = domain;
    }
    if let Some(condition) = patch.condition {
        task.condition = if condition.trim().is_empty() {
            None
        } else {
            Some(condition)
        };
    }
    if let Some(duration) = patch.duration {
        task.duration = duration;
    }
    if let Some(difficulty) = patch.difficulty {
        task.difficulty = difficulty;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(assignee) = patch.assignee {
        task.assignee = if assignee.trim().is_empty() {
            UNASSIGNED.to_string()
        } else {
            assignee
        };
    }
    if let Some(subtasks) = patch.subtasks {
        task.subtasks = subtasks;
        task.recompute_progress();
    }
    if let Some(progress) = patch.progress {
        if task.subtasks.is_empty() {
            task.progress = progress;
        }
    }

    // 3. A changed specification reference goes through the coordinator so
    //    both sides of the association move in the same step
    if new_spec != old_spec {
        assignment::reassign(store, task_id, old_spec.as_deref(), new_spec.as_deref());
    }

    storage.save(store)?;

    let updated = store.get_task(task_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::TaskUpdated(updated.clone()));

    Ok(updated)
}

#[derive(Debug, Error)]
pub enum DeleteTaskError {
    #[error("Task #{0} not found")]
    TaskNotFound(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub fn delete_task(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
) -> Result<Task, DeleteTaskError> {
    let spec_id = store
        .get_task(task_id)
        .ok_or(DeleteTaskError::TaskNotFound(task_id))?
        .specification_id
        .clone();

    // Detach before removal so the specification never holds a dangling id
    if let Some(spec_id) = spec_id {
        assignment::unlink(store, task_id, &spec_id);
    }

    let removed = store.remove_task(task_id).unwrap();

    storage.save(store)?;

    gateway.on_local_change(&ChangeEvent::TaskDeleted(DeletedTask { id: task_id }));

    Ok(removed)
}

#[derive(Debug, Error)]
pub enum SubtaskError {
    #[error("Task #{0} not found")]
    TaskNotFound(u64),

    #[error("Subtask #{1} not found on task #{0}")]
    SubtaskNotFound(u64, u64),

    #[error("Subtask text must not be empty")]
    EmptyText,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub fn toggle_subtask(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    subtask_id: u64,
) -> Result<Task, SubtaskError> {
    let task = store
        .get_task_mut(task_id)
        .ok_or(SubtaskError::TaskNotFound(task_id))?;

    let subtask = task
        .subtasks
        .iter_mut()
        .find(|s| s.id == subtask_id)
        .ok_or(SubtaskError::SubtaskNotFound(task_id, subtask_id))?;

    subtask.completed = !subtask.completed;
    task.recompute_progress();

    storage.save(store)?;

    let updated = store.get_task(task_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::TaskUpdated(updated.clone()));

    Ok(updated)
}

pub fn add_subtask(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    text: String,
) -> Result<Task, SubtaskError> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(SubtaskError::EmptyText);
    }

    let task = store
        .get_task_mut(task_id)
        .ok_or(SubtaskError::TaskNotFound(task_id))?;

    let subtask = Subtask {
        id: task.next_subtask_id(),
        text,
        completed: false,
        level: 0,
        created_at: Timestamp::now(),
    };
    task.subtasks.push(subtask);
    task.recompute_progress();

    storage.save(store)?;

    let updated = store.get_task(task_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::TaskUpdated(updated.clone()));

    Ok(updated)
}

pub fn remove_subtask(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    subtask_id: u64,
) -> Result<Task, SubtaskError> {
    let task = store
        .get_task_mut(task_id)
        .ok_or(SubtaskError::TaskNotFound(task_id))?;

    let before = task.subtasks.len();
    task.subtasks.retain(|s| s.id != subtask_id);
    if task.subtasks.len() == before {
        return Err(SubtaskError::SubtaskNotFound(task_id, subtask_id));
    }
    task.recompute_progress();

    storage.save(store)?;

    let updated = store.get_task(task_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::TaskUpdated(updated.clone()));

    Ok(updated)
}

/// Status filter for task listings
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusFilter {
    All,
    Only(Status),
}

impl std::str::FromStr for StatusFilter {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(StatusFilter::All)
        } else {
            Ok(StatusFilter::Only(s.parse()?))
        }
    }
}

/// Tasks matching the filter, in insertion order. No sorting here; display
/// ordering is a separate concern.
pub fn list_filtered<'a>(store: &'a Store, filter: StatusFilter) -> Vec<&'a Task> {
    store
        .tasks
        .iter()
        .filter(|t| match filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => t.status == status,
        })
        .collect()
}

/// Stable display ordering: priority descending, earlier deadline breaking
/// ties. The input sequence is left untouched.
pub fn sorted_by_priority_then_deadline<'a>(tasks: &[&'a Task]) -> Vec<&'a Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.deadline.cmp(&b.deadline))
    });
    sorted
}

/// Whole days until the deadline; negative means overdue
pub fn days_remaining(deadline: Date, today: Date) -> i32 {
    (deadline - today).get_days()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Urgency {
    Overdue,
    Urgent,
    Warning,
    Normal,
}

impl Urgency {
    pub fn classify(days_remaining: i32) -> Self {
        if days_remaining < 0 {
            Urgency::Overdue
        } else if days_remaining <= 3 {
            Urgency::Urgent
        } else if days_remaining <= 7 {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// Dashboard counters over the whole task list
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completion_rate: u32,
    pub avg_priority: f64,
}

pub fn stats(store: &Store, today: Date) -> TaskStats {
    let total = store.tasks.len();
    let completed = store
        .tasks
        .iter()
        .filter(|t| t.status == Status::Completed)
        .count();
    let pending = store
        .tasks
        .iter()
        .filter(|t| matches!(t.status, Status::NotStarted | Status::InProgress))
        .count();
    let overdue = store
        .tasks
        .iter()
        .filter(|t| t.deadline < today && t.status != Status::Completed)
        .count();

    let completion_rate = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };

    let avg_priority = if total > 0 {
        store.tasks.iter().map(|t| t.priority as f64).sum::<f64>() / total as f64
    } else {
        0.0
    };

    TaskStats {
        total,
        completed,
        pending,
        overdue,
        completion_rate,
        avg_priority,
    }
}

/// Top-n open tasks by priority, for the dashboard panel
pub fn priority_tasks(store: &Store, n: usize) -> Vec<&Task> {
    let open: Vec<&Task> = store
        .tasks
        .iter()
        .filter(|t| t.status != Status::Completed)
        .collect();
    let mut sorted = open;
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    use crate::sync::gateway::LocalOnlyGateway;

    /// Keeps everything in memory; service tests only care about the model
    struct NoopStorage;

    impl Storage for NoopStorage {
        fn load(&self) -> Result<Store, StorageError> {
            Ok(Store::default())
        }

        fn save(&self, _store: &Store) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn params(title: &str, deadline: &str) -> CreateTaskParameters {
        CreateTaskParameters {
            title: title.to_string(),
            deadline: deadline.to_string(),
            status: None,
            domain: None,
            condition: None,
            duration: None,
            difficulty: None,
            priority: None,
            assignee: None,
            subtasks: vec![],
            specification: None,
        }
    }

    #[test]
    fn test_create_task_with_empty_title_fails_without_mutation() {
        let mut store = Store::default();
        let result = create_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            params("   ", "2026-09-01"),
        );

        assert!(matches!(result, Err(CreateTaskError::EmptyTitle)));
        assert!(store.tasks.is_empty());
        assert_eq!(store.task_id_counter, 0);
    }

    #[test]
    fn test_create_task_with_bad_deadline_fails() {
        let mut store = Store::default();
        let result = create_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            params("Storyboard the intro", "not-a-date"),
        );

        assert!(matches!(result, Err(CreateTaskError::InvalidDeadline(..))));
        assert!(store.tasks.is_empty());
    }

    #[test]
    fn test_create_task_ids_are_strictly_increasing() {
        let mut store = Store::default();
        let mut last = 0;
        for i in 0..5 {
            let task = create_task(
                &mut store,
                &NoopStorage,
                &LocalOnlyGateway,
                params(&format!("Task {i}"), "2026-09-01"),
            )
            .unwrap();
            assert!(task.id > last);
            last = task.id;
        }
        assert_eq!(store.task_id_counter, last);
    }

    #[test]
    fn test_create_task_progress_defaults_from_status() {
        let mut store = Store::default();
        let mut p = params("Ship it", "2026-09-01");
        p.status = Some("completed".to_string());
        let task = create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();
        assert_eq!(task.progress, 100);

        let mut p = params("Start it", "2026-09-01");
        p.status = Some("standby".to_string());
        let task = create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();
        assert_eq!(task.progress, 50);
    }

    #[test]
    fn test_create_task_progress_derives_from_checklist() {
        let mut store = Store::default();
        let mut p = params("Checklist task", "2026-09-01");
        p.status = Some("completed".to_string());
        p.subtasks = vec!["one".to_string(), "two".to_string()];
        let task = create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();
        // a fresh checklist is all-incomplete, overriding the status default
        assert_eq!(task.progress, 0);
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.subtasks[1].id, 2);
    }

    #[test]
    fn test_create_task_rejects_out_of_range_ratings() {
        let mut store = Store::default();
        let mut p = params("Rated", "2026-09-01");
        p.difficulty = Some(11);
        assert!(matches!(
            create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p),
            Err(CreateTaskError::DifficultyOutOfRange(11))
        ));

        let mut p = params("Rated", "2026-09-01");
        p.priority = Some(101);
        assert!(matches!(
            create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p),
            Err(CreateTaskError::PriorityOutOfRange(101))
        ));
    }

    #[test]
    fn test_update_unknown_task_reports_not_found() {
        let mut store = Store::default();
        let result = update_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            42,
            TaskPatch::default(),
        );
        assert!(matches!(result, Err(UpdateTaskError::TaskNotFound(42))));
    }

    #[test]
    fn test_update_merges_patch_fields() {
        let mut store = Store::default();
        let task = create_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            params("Original", "2026-09-01"),
        )
        .unwrap();

        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            priority: Some(90),
            status: Some("in-progress".to_string()),
            ..TaskPatch::default()
        };
        let updated =
            update_task(&mut store, &NoopStorage, &LocalOnlyGateway, task.id, patch).unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, 90);
        assert_eq!(updated.status, Status::InProgress);
        // untouched fields survive
        assert_eq!(updated.deadline, date(2026, 9, 1));
    }

    #[test]
    fn test_manual_progress_rejected_while_checklist_exists() {
        let mut store = Store::default();
        let mut p = params("Checklist", "2026-09-01");
        p.subtasks = vec!["a".to_string()];
        let task = create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();

        let patch = TaskPatch {
            progress: Some(75),
            ..TaskPatch::default()
        };
        let result = update_task(&mut store, &NoopStorage, &LocalOnlyGateway, task.id, patch);
        assert!(matches!(
            result,
            Err(UpdateTaskError::ManualProgressWithSubtasks)
        ));
    }

    #[test]
    fn test_replacing_subtasks_rederives_progress() {
        let mut store = Store::default();
        let task = create_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            params("Plain", "2026-09-01"),
        )
        .unwrap();

        let now = Timestamp::now();
        let patch = TaskPatch {
            subtasks: Some(vec![
                Subtask { id: 1, text: "done".into(), completed: true, level: 0, created_at: now },
                Subtask { id: 2, text: "done".into(), completed: true, level: 0, created_at: now },
                Subtask { id: 3, text: "open".into(), completed: false, level: 0, created_at: now },
                Subtask { id: 4, text: "open".into(), completed: false, level: 0, created_at: now },
            ]),
            ..TaskPatch::default()
        };
        let updated =
            update_task(&mut store, &NoopStorage, &LocalOnlyGateway, task.id, patch).unwrap();
        assert_eq!(updated.progress, 50);
    }

    #[test]
    fn test_toggle_subtask_recomputes_progress() {
        let mut store = Store::default();
        let mut p = params("Checklist", "2026-09-01");
        p.subtasks = vec!["a".to_string(), "b".to_string()];
        let task = create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();

        let updated =
            toggle_subtask(&mut store, &NoopStorage, &LocalOnlyGateway, task.id, 1).unwrap();
        assert_eq!(updated.progress, 50);
        assert!(updated.subtasks[0].completed);

        let updated =
            toggle_subtask(&mut store, &NoopStorage, &LocalOnlyGateway, task.id, 1).unwrap();
        assert_eq!(updated.progress, 0);
    }

    #[test]
    fn test_delete_task_removes_record() {
        let mut store = Store::default();
        let task = create_task(
            &mut store,
            &NoopStorage,
            &LocalOnlyGateway,
            params("Doomed", "2026-09-01"),
        )
        .unwrap();

        delete_task(&mut store, &NoopStorage, &LocalOnlyGateway, task.id).unwrap();
        assert!(store.tasks.is_empty());

        let result = delete_task(&mut store, &NoopStorage, &LocalOnlyGateway, task.id);
        assert!(matches!(result, Err(DeleteTaskError::TaskNotFound(_))));
    }

    #[test]
    fn test_list_filtered_preserves_insertion_order() {
        let mut store = Store::default();
        for (i, status) in ["completed", "in-progress", "completed", "standby"]
            .iter()
            .enumerate()
        {
            let mut p = params(&format!("Task {i}"), "2026-09-01");
            p.status = Some(status.to_string());
            create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();
        }

        let all = list_filtered(&store, StatusFilter::All);
        assert_eq!(all.len(), 4);

        let completed = list_filtered(&store, StatusFilter::Only(Status::Completed));
        let titles: Vec<&str> = completed.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Task 0", "Task 2"]);
    }

    #[test]
    fn test_sort_by_priority_with_deadline_tie_break() {
        let mut store = Store::default();
        let inputs = [
            (50u8, "2026-01-10"),
            (90, "2026-01-20"),
            (90, "2026-01-05"),
            (10, "2026-01-01"),
        ];
        for (priority, deadline) in inputs {
            let mut p = params(&format!("p{priority}-{deadline}"), deadline);
            p.priority = Some(priority);
            create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();
        }

        let refs: Vec<&Task> = store.tasks.iter().collect();
        let sorted = sorted_by_priority_then_deadline(&refs);

        let order: Vec<(u8, Date)> = sorted.iter().map(|t| (t.priority, t.deadline)).collect();
        assert_eq!(
            order,
            vec![
                (90, date(2026, 1, 5)),
                (90, date(2026, 1, 20)),
                (50, date(2026, 1, 10)),
                (10, date(2026, 1, 1)),
            ]
        );
        // input order untouched
        assert_eq!(store.tasks[0].priority, 50);
    }

    #[test]
    fn test_days_remaining_and_urgency_classes() {
        let today = date(2026, 6, 15);

        assert_eq!(days_remaining(date(2026, 6, 13), today), -2);
        assert_eq!(Urgency::classify(-2), Urgency::Overdue);

        assert_eq!(days_remaining(date(2026, 6, 17), today), 2);
        assert_eq!(Urgency::classify(2), Urgency::Urgent);

        assert_eq!(days_remaining(date(2026, 6, 21), today), 6);
        assert_eq!(Urgency::classify(6), Urgency::Warning);

        assert_eq!(days_remaining(date(2026, 7, 15), today), 30);
        assert_eq!(Urgency::classify(30), Urgency::Normal);
    }

    #[test]
    fn test_stats_counts_and_rates() {
        let mut store = Store::default();
        let today = date(2026, 6, 15);

        let mut p = params("Done", "2026-06-01");
        p.status = Some("completed".to_string());
        p.priority = Some(80);
        create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();

        let mut p = params("Late", "2026-06-10");
        p.status = Some("in-progress".to_string());
        p.priority = Some(60);
        create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();

        let mut p = params("Future", "2026-07-01");
        p.status = Some("not-started".to_string());
        p.priority = Some(40);
        create_task(&mut store, &NoopStorage, &LocalOnlyGateway, p).unwrap();

        let stats = stats(&store, today);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.completion_rate, 33);
        assert!((stats.avg_priority - 60.0).abs() < f64::EPSILON);
    }
}
