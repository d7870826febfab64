use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::{specification::Specification, store::Store, task::Task};

/// A repository mutation, in the shape it travels over the wire.
///
/// The tag/content pair serializes to `{"type": "task-created", "data": ...}`
/// so the variants double as the pub/sub event vocabulary.
#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ChangeEvent {
    TaskCreated(Task),
    TaskUpdated(Task),
    TaskDeleted(DeletedTask),
    SpecificationCreated(Specification),
    SpecificationUpdated(Specification),
    SpecificationDeleted(DeletedSpecification),
    TaskAssigned(Assignment),
    TaskUnassigned(Unassignment),
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DeletedTask {
    pub id: u64,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DeletedSpecification {
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub task_id: u64,
    pub specification_id: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Unassignment {
    pub task_id: u64,
}

/// The `data-update` payload broadcast to every connected client
#[derive(Serialize, Deserialize, Clone)]
pub struct DataUpdate {
    #[serde(flatten)]
    pub event: ChangeEvent,
    pub timestamp: Timestamp,
}

impl DataUpdate {
    pub fn new(event: ChangeEvent) -> Self {
        Self {
            event,
            timestamp: Timestamp::now(),
        }
    }
}

/// Everything the pub/sub channel carries: data updates plus presence.
/// `user-login` is the client hello; the rest flow server -> clients.
#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    DataUpdate(DataUpdate),
    UserLogin(PresenceUser),
    UserJoined(PresenceUser),
    UserLeft(PresenceUser),
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub user_id: String,
    pub username: String,
}

/// Apply an incoming event to the local repositories, last-write-wins: the
/// incoming record entirely replaces the local one by id, is appended if
/// absent, or removed if deleted. No field-level merging. Unknown ids make
/// the event a logged no-op.
pub fn apply_remote_change(store: &mut Store, event: &ChangeEvent) {
    match event {
        ChangeEvent::TaskCreated(task) | ChangeEvent::TaskUpdated(task) => {
            match store.get_task_mut(task.id) {
                Some(slot) => *slot = task.clone(),
                None => store.tasks.push(task.clone()),
            }
            reconcile_task_link(store, task.id);
        }
        ChangeEvent::TaskDeleted(deleted) => {
            for spec in &mut store.specifications {
                spec.task_ids.retain(|id| *id != deleted.id);
            }
            if store.remove_task(deleted.id).is_none() {
                log::debug!("Remote deleted unknown task {}", deleted.id);
            }
        }
        ChangeEvent::SpecificationCreated(spec) | ChangeEvent::SpecificationUpdated(spec) => {
            match store.get_specification_mut(&spec.id) {
                Some(slot) => *slot = spec.clone(),
                None => store.specifications.push(spec.clone()),
            }
        }
        ChangeEvent::SpecificationDeleted(deleted) => {
            for task in &mut store.tasks {
                if task.specification_id.as_deref() == Some(deleted.id.as_str()) {
                    task.specification_id = None;
                }
            }
            if store.remove_specification(&deleted.id).is_none() {
                log::debug!("Remote deleted unknown specification '{}'", deleted.id);
            }
        }
        ChangeEvent::TaskAssigned(assignment) => {
            if store.get_task(assignment.task_id).is_none()
                || store.get_specification(&assignment.specification_id).is_none()
            {
                log::debug!(
                    "Remote assignment references unknown task {} or specification '{}'",
                    assignment.task_id,
                    assignment.specification_id
                );
                return;
            }
            if let Some(task) = store.get_task_mut(assignment.task_id) {
                task.specification_id = Some(assignment.specification_id.clone());
            }
            reconcile_task_link(store, assignment.task_id);
        }
        ChangeEvent::TaskUnassigned(unassignment) => {
            if let Some(task) = store.get_task_mut(unassignment.task_id) {
                task.specification_id = None;
            }
            for spec in &mut store.specifications {
                spec.task_ids.retain(|id| *id != unassignment.task_id);
            }
        }
    }
}

/// Re-establish the bidirectional invariant for one task after its record
/// (and therefore its specification reference) has been replaced wholesale.
fn reconcile_task_link(store: &mut Store, task_id: u64) {
    let target = store
        .get_task(task_id)
        .and_then(|t| t.specification_id.clone());

    for spec in &mut store.specifications {
        if Some(spec.id.as_str()) == target.as_deref() {
            if !spec.task_ids.contains(&task_id) {
                spec.task_ids.push(task_id);
            }
        } else {
            spec.task_ids.retain(|id| *id != task_id);
        }
    }
}
