use jiff::Timestamp;
use thiserror::Error;

use crate::{
    models::{
        specification::{Specification, seed_specifications},
        store::Store,
        task::{Status, StatusParseError},
    },
    services::assignment,
    storage::{Storage, StorageError},
    sync::event::{ChangeEvent, DeletedSpecification},
    sync::gateway::SyncGateway,
};

#[derive(Debug, Error)]
pub enum CreateSpecificationError {
    #[error("Specification title must not be empty")]
    EmptyTitle,

    #[error("Specification description must not be empty")]
    EmptyDescription,

    #[error("Specification '{0}' already exists")]
    AlreadyExists(String),

    #[error("Priority must be between 0 and 100, got {0}")]
    PriorityOutOfRange(u8),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct CreateSpecificationParameters {
    /// Fixed slug to use; a timestamp-based token is generated when absent
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub status: Option<String>,
}

pub fn create_specification(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    parameters: CreateSpecificationParameters,
) -> Result<Specification, CreateSpecificationError> {
    let title = parameters.title.trim().to_string();
    if title.is_empty() {
        return Err(CreateSpecificationError::EmptyTitle);
    }

    let description = parameters.description.trim().to_string();
    if description.is_empty() {
        return Err(CreateSpecificationError::EmptyDescription);
    }

    let priority = parameters.priority.unwrap_or(50);
    if priority > 100 {
        return Err(CreateSpecificationError::PriorityOutOfRange(priority));
    }

    let status = match &parameters.status {
        Some(raw) => raw.parse::<Status>()?,
        None => Status::default(),
    };

    let now = Timestamp::now();
    let id = match parameters.id {
        Some(id) => id,
        None => Specification::generate_id(&title, now),
    };
    if store.get_specification(&id).is_some() {
        return Err(CreateSpecificationError::AlreadyExists(id));
    }

    let spec = Specification {
        id: id.clone(),
        title,
        description,
        category: parameters.category.unwrap_or_else(|| "features".to_string()),
        priority,
        status,
        task_ids: vec![],
        created_at: now,
    };

    store.specifications.push(spec);

    storage.save(store)?;

    let created = store.get_specification(&id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::SpecificationCreated(created.clone()));

    Ok(created)
}

#[derive(Debug, Error)]
pub enum UpdateSpecificationError {
    #[error("Specification '{0}' not found")]
    SpecificationNotFound(String),

    #[error("Specification title must not be empty")]
    EmptyTitle,

    #[error("Specification description must not be empty")]
    EmptyDescription,

    #[error("Priority must be between 0 and 100, got {0}")]
    PriorityOutOfRange(u8),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Default)]
pub struct SpecificationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<u8>,
    pub status: Option<String>,
}

pub fn update_specification(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    spec_id: &str,
    patch: SpecificationPatch,
) -> Result<Specification, UpdateSpecificationError> {
    let title = match &patch.title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(UpdateSpecificationError::EmptyTitle);
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let description = match &patch.description {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(UpdateSpecificationError::EmptyDescription);
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    if let Some(priority) = patch.priority {
        if priority > 100 {
            return Err(UpdateSpecificationError::PriorityOutOfRange(priority));
        }
    }

    let status = match &patch.status {
        Some(raw) => Some(raw.parse::<Status>()?),
        None => None,
    };

    let spec = store
        .get_specification_mut(spec_id)
        .ok_or_else(|| UpdateSpecificationError::SpecificationNotFound(spec_id.to_string()))?;

    if let Some(title) = title {
        spec.title = title;
    }
    if let Some(description) = description {
        spec.description = description;
    }
    if let Some(category) = patch.category {
        spec.category = category;
    }
    if let Some(priority) = patch.priority {
        spec.priority = priority;
    }
    if let Some(status) = status {
        spec.status = status;
    }

    storage.save(store)?;

    let updated = store.get_specification(spec_id).unwrap().clone();
    gateway.on_local_change(&ChangeEvent::SpecificationUpdated(updated.clone()));

    Ok(updated)
}

#[derive(Debug, Error)]
pub enum DeleteSpecificationError {
    #[error("Specification '{0}' not found")]
    SpecificationNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct DeleteSpecificationResult {
    pub specification: Specification,
    pub detached_tasks_count: usize,
}

/// Deleting a specification never deletes tasks: every associated task is
/// detached first, then the specification itself goes.
pub fn delete_specification(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    spec_id: &str,
) -> Result<DeleteSpecificationResult, DeleteSpecificationError> {
    let detached = store
        .get_specification(spec_id)
        .ok_or_else(|| DeleteSpecificationError::SpecificationNotFound(spec_id.to_string()))?
        .task_ids
        .len();

    assignment::cascade_on_spec_delete(store, spec_id);
    let removed = store.remove_specification(spec_id).unwrap();

    storage.save(store)?;

    gateway.on_local_change(&ChangeEvent::SpecificationDeleted(DeletedSpecification {
        id: spec_id.to_string(),
    }));

    Ok(DeleteSpecificationResult {
        specification: removed,
        detached_tasks_count: detached,
    })
}

/// Listing order: priority descending, most recently created first on ties.
/// The recency tie-break keeps the ordering deterministic.
pub fn list_all(store: &Store) -> Vec<&Specification> {
    let mut specs: Vec<&Specification> = store.specifications.iter().collect();
    specs.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    specs
}

/// Install the fixed seed specifications into a store that has never held
/// any data. Returns whether seeding happened.
pub fn seed_if_new(store: &mut Store, storage: &impl Storage) -> Result<bool, StorageError> {
    let brand_new =
        store.task_id_counter == 0 && store.tasks.is_empty() && store.specifications.is_empty();
    if !brand_new {
        return Ok(false);
    }

    store.specifications = seed_specifications(Timestamp::now());
    storage.save(store)?;
    Ok(true)
}
