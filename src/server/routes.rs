use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::models::{
    specification::Specification,
    task::{Task, UNASSIGNED},
};
use crate::storage::Storage;
use crate::sync::event::{
    Assignment, ChangeEvent, DataUpdate, DeletedSpecification, DeletedTask, ServerMessage,
    Unassignment, apply_remote_change,
};

use super::state::ServerState;

#[derive(Serialize)]
pub(crate) struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
pub(crate) struct MessageBody {
    message: String,
}

#[derive(Serialize)]
pub(crate) struct UserEntry {
    username: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Apply a change to the authoritative store, persist, and fan it out.
/// A failed save is logged but does not fail the request: the in-memory
/// state stays authoritative for the session.
fn commit(state: &ServerState, event: ChangeEvent) {
    let mut store = state.store.lock().unwrap();
    apply_remote_change(&mut store, &event);

    if let Err(e) = state.storage.save(&store) {
        log::error!("Failed to persist store, keeping in-memory state: {e}");
    }
    drop(store);

    state
        .broadcaster
        .broadcast(ServerMessage::DataUpdate(DataUpdate::new(event)));
}

fn validate_task(task: &Task) -> Result<(), String> {
    if task.title.trim().is_empty() {
        return Err("Task title must not be empty".to_string());
    }
    if !(1..=10).contains(&task.difficulty) {
        return Err(format!(
            "Difficulty must be between 1 and 10, got {}",
            task.difficulty
        ));
    }
    if task.priority > 100 {
        return Err(format!("Priority must be between 0 and 100, got {}", task.priority));
    }
    if task.progress > 100 {
        return Err(format!("Progress must be between 0 and 100, got {}", task.progress));
    }
    Ok(())
}

fn validate_specification(spec: &Specification) -> Result<(), String> {
    if spec.title.trim().is_empty() {
        return Err("Specification title must not be empty".to_string());
    }
    if spec.description.trim().is_empty() {
        return Err("Specification description must not be empty".to_string());
    }
    if spec.priority > 100 {
        return Err(format!("Priority must be between 0 and 100, got {}", spec.priority));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub async fn list_tasks(State(state): State<ServerState>) -> Json<Vec<Task>> {
    let store = state.store.lock().unwrap();
    Json(store.tasks.clone())
}

pub async fn get_task(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, (StatusCode, Json<ErrorBody>)> {
    let store = state.store.lock().unwrap();
    store
        .get_task(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("Task #{id} not found")))
}

pub async fn create_task(
    State(state): State<ServerState>,
    Json(task): Json<Task>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    validate_task(&task).map_err(|m| error(StatusCode::UNPROCESSABLE_ENTITY, m))?;

    let created = task.clone();
    commit(&state, ChangeEvent::TaskCreated(task));

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_task(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(mut task): Json<Task>,
) -> Result<Json<Task>, (StatusCode, Json<ErrorBody>)> {
    validate_task(&task).map_err(|m| error(StatusCode::UNPROCESSABLE_ENTITY, m))?;

    // the path wins over whatever id the body carries
    task.id = id;
    let updated = task.clone();
    commit(&state, ChangeEvent::TaskUpdated(task));

    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> Json<MessageBody> {
    commit(&state, ChangeEvent::TaskDeleted(DeletedTask { id }));
    Json(MessageBody {
        message: "Task deleted successfully".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Specifications
// ---------------------------------------------------------------------------

pub async fn list_specifications(State(state): State<ServerState>) -> Json<Vec<Specification>> {
    let store = state.store.lock().unwrap();
    Json(store.specifications.clone())
}

pub async fn get_specification(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Specification>, (StatusCode, Json<ErrorBody>)> {
    let store = state.store.lock().unwrap();
    store
        .get_specification(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            error(
                StatusCode::NOT_FOUND,
                format!("Specification '{id}' not found"),
            )
        })
}

pub async fn create_specification(
    State(state): State<ServerState>,
    Json(spec): Json<Specification>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    validate_specification(&spec).map_err(|m| error(StatusCode::UNPROCESSABLE_ENTITY, m))?;

    let created = spec.clone();
    commit(&state, ChangeEvent::SpecificationCreated(spec));

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_specification(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut spec): Json<Specification>,
) -> Result<Json<Specification>, (StatusCode, Json<ErrorBody>)> {
    validate_specification(&spec).map_err(|m| error(StatusCode::UNPROCESSABLE_ENTITY, m))?;

    spec.id = id;
    let updated = spec.clone();
    commit(&state, ChangeEvent::SpecificationUpdated(spec));

    Ok(Json(updated))
}

pub async fn delete_specification(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Json<MessageBody> {
    commit(
        &state,
        ChangeEvent::SpecificationDeleted(DeletedSpecification { id }),
    );
    Json(MessageBody {
        message: "Specification deleted successfully".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

pub async fn assign_task(
    State(state): State<ServerState>,
    Json(assignment): Json<Assignment>,
) -> Result<Json<MessageBody>, (StatusCode, Json<ErrorBody>)> {
    {
        let store = state.store.lock().unwrap();
        if store.get_task(assignment.task_id).is_none() {
            return Err(error(
                StatusCode::NOT_FOUND,
                format!("Task #{} not found", assignment.task_id),
            ));
        }
        if store.get_specification(&assignment.specification_id).is_none() {
            return Err(error(
                StatusCode::NOT_FOUND,
                format!("Specification '{}' not found", assignment.specification_id),
            ));
        }
    }

    commit(&state, ChangeEvent::TaskAssigned(assignment));

    Ok(Json(MessageBody {
        message: "Task assigned successfully".to_string(),
    }))
}

pub async fn unassign_task(
    State(state): State<ServerState>,
    Json(unassignment): Json<Unassignment>,
) -> Result<Json<MessageBody>, (StatusCode, Json<ErrorBody>)> {
    {
        let store = state.store.lock().unwrap();
        if store.get_task(unassignment.task_id).is_none() {
            return Err(error(
                StatusCode::NOT_FOUND,
                format!("Task #{} not found", unassignment.task_id),
            ));
        }
    }

    commit(&state, ChangeEvent::TaskUnassigned(unassignment));

    Ok(Json(MessageBody {
        message: "Task unassigned successfully".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Every distinct assignee seen across the task list
pub async fn list_users(State(state): State<ServerState>) -> Json<Vec<UserEntry>> {
    let store = state.store.lock().unwrap();
    let mut names: Vec<String> = store
        .tasks
        .iter()
        .map(|t| t.assignee.clone())
        .filter(|a| a != UNASSIGNED)
        .collect();
    names.sort();
    names.dedup();

    Json(names.into_iter().map(|username| UserEntry { username }).collect())
}

pub async fn list_online_users(
    State(state): State<ServerState>,
) -> Json<Vec<crate::sync::event::PresenceUser>> {
    Json(state.online_users())
}
