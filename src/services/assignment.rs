//! Keeps a task's specification reference and the specification's
//! associated-task list mutually consistent. Every entry point validates
//! before mutating, so a failed call leaves both repositories untouched, and
//! each mutation moves both sides of the association in one step.

use thiserror::Error;

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
    sync::event::{Assignment, ChangeEvent, Unassignment},
    sync::gateway::SyncGateway,
};

/// Attach a task to a specification: the task leaves every other
/// specification's set, joins the target set, and points back at it.
/// Idempotent. Callers have already resolved both ids.
pub(crate) fn link(store: &mut Store, task_id: u64, spec_id: &str) {
    for spec in &mut store.specifications {
        if spec.id != spec_id {
            spec.task_ids.retain(|id| *id != task_id);
        }
    }

    if let Some(spec) = store.get_specification_mut(spec_id) {
        if !spec.task_ids.contains(&task_id) {
            spec.task_ids.push(task_id);
        }
    }

    if let Some(task) = store.get_task_mut(task_id) {
        task.specification_id = Some(spec_id.to_string());
    }
}

/// Detach a task from a specification. The task's reference is only cleared
/// when it still points at `spec_id`, so a stale call after a reassignment
/// cannot strip the new association.
pub(crate) fn unlink(store: &mut Store, task_id: u64, spec_id: &str) {
    if let Some(spec) = store.get_specification_mut(spec_id) {
        spec.task_ids.retain(|id| *id != task_id);
    }

    if let Some(task) = store.get_task_mut(task_id) {
        if task.specification_id.as_deref() == Some(spec_id) {
            task.specification_id = None;
        }
    }
}

/// One logical step covering every reference transition a task edit can
/// produce. An observer never sees the task in both sets or in neither.
pub(crate) fn reassign(store: &mut Store, task_id: u64, old: Option<&str>, new: Option<&str>) {
    match new {
        Some(spec_id) => link(store, task_id, spec_id),
        None => {
            if let Some(spec_id) = old {
                unlink(store, task_id, spec_id);
            }
        }
    }
}

/// Clear the reference on every task attached to a specification. The caller
/// removes the specification itself afterwards.
pub(crate) fn cascade_on_spec_delete(store: &mut Store, spec_id: &str) {
    let task_ids = match store.get_specification(spec_id) {
        Some(spec) => spec.task_ids.clone(),
        None => return,
    };

    for task_id in &task_ids {
        if let Some(task) = store.get_task_mut(*task_id) {
            if task.specification_id.as_deref() == Some(spec_id) {
                task.specification_id = None;
            }
        }
    }

    if let Some(spec) = store.get_specification_mut(spec_id) {
        spec.task_ids.clear();
    }
}

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("Task #{0} not found")]
    TaskNotFound(u64),

    #[error("Specification '{0}' not found")]
    SpecificationNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub fn assign(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    spec_id: &str,
) -> Result<(), AssignError> {
    if store.get_task(task_id).is_none() {
        return Err(AssignError::TaskNotFound(task_id));
    }
    if store.get_specification(spec_id).is_none() {
        return Err(AssignError::SpecificationNotFound(spec_id.to_string()));
    }

    link(store, task_id, spec_id);

    storage.save(store)?;

    gateway.on_local_change(&ChangeEvent::TaskAssigned(Assignment {
        task_id,
        specification_id: spec_id.to_string(),
    }));

    Ok(())
}

pub fn unassign(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
    task_id: u64,
    spec_id: &str,
) -> Result<(), AssignError> {
    if store.get_task(task_id).is_none() {
        return Err(AssignError::TaskNotFound(task_id));
    }
    if store.get_specification(spec_id).is_none() {
        return Err(AssignError::SpecificationNotFound(spec_id.to_string()));
    }

    unlink(store, task_id, spec_id);

    storage.save(store)?;

    gateway.on_local_change(&ChangeEvent::TaskUnassigned(Unassignment { task_id }));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use jiff::civil::date;

    use crate::models::{
        specification::Specification,
        task::{Status, Task, UNASSIGNED},
    };
    use crate::sync::gateway::LocalOnlyGateway;

    struct NoopStorage;

    impl Storage for NoopStorage {
        fn load(&self) -> Result<Store, StorageError> {
            Ok(Store::default())
        }

        fn save(&self, _store: &Store) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn task(id: u64) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            deadline: date(2026, 5, 1),
            status: Status::NotStarted,
            domain: "development".to_string(),
            condition: None,
            duration: "1d".to_string(),
            difficulty: 5,
            priority: 50,
            assignee: UNASSIGNED.to_string(),
            created_at: Timestamp::now(),
            progress: 0,
            subtasks: vec![],
            specification_id: None,
        }
    }

    fn spec(id: &str) -> Specification {
        Specification {
            id: id.to_string(),
            title: id.to_string(),
            description: "spec".to_string(),
            category: "features".to_string(),
            priority: 50,
            status: Status::NotStarted,
            task_ids: vec![],
            created_at: Timestamp::now(),
        }
    }

    fn store_with(tasks: Vec<Task>, specs: Vec<Specification>) -> Store {
        let counter = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        Store {
            task_id_counter: counter,
            tasks,
            specifications: specs,
            ..Store::default()
        }
    }

    /// The bidirectional invariant from the data model: every reference has
    /// a matching set entry and every set entry has a matching reference.
    fn invariant_holds(store: &Store) -> bool {
        let refs_ok = store.tasks.iter().all(|t| match &t.specification_id {
            None => true,
            Some(spec_id) => store
                .get_specification(spec_id)
                .is_some_and(|s| s.task_ids.contains(&t.id)),
        });

        let sets_ok = store.specifications.iter().all(|s| {
            s.task_ids.iter().all(|id| {
                store
                    .get_task(*id)
                    .is_some_and(|t| t.specification_id.as_deref() == Some(s.id.as_str()))
            })
        });

        refs_ok && sets_ok
    }

    #[test]
    fn test_assign_links_both_sides() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha")]);

        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();

        assert_eq!(store.get_task(1).unwrap().specification_id.as_deref(), Some("alpha"));
        assert_eq!(store.get_specification("alpha").unwrap().task_ids, vec![1]);
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_assign_is_idempotent() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha")]);

        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();

        assert_eq!(store.get_specification("alpha").unwrap().task_ids, vec![1]);
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_assign_moves_task_from_previous_spec() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha"), spec("beta")]);

        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "beta").unwrap();

        assert!(store.get_specification("alpha").unwrap().task_ids.is_empty());
        assert_eq!(store.get_specification("beta").unwrap().task_ids, vec![1]);
        assert_eq!(store.get_task(1).unwrap().specification_id.as_deref(), Some("beta"));
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_assign_unknown_ids_leaves_repositories_untouched() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha")]);

        let result = assign(&mut store, &NoopStorage, &LocalOnlyGateway, 99, "alpha");
        assert!(matches!(result, Err(AssignError::TaskNotFound(99))));

        let result = assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "missing");
        assert!(matches!(result, Err(AssignError::SpecificationNotFound(_))));

        assert!(store.get_task(1).unwrap().specification_id.is_none());
        assert!(store.get_specification("alpha").unwrap().task_ids.is_empty());
    }

    #[test]
    fn test_unassign_clears_both_sides() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha")]);
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();

        unassign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();

        assert!(store.get_task(1).unwrap().specification_id.is_none());
        assert!(store.get_specification("alpha").unwrap().task_ids.is_empty());
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_stale_unassign_does_not_strip_new_association() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha"), spec("beta")]);
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "beta").unwrap();

        // stale call targeting the old spec
        unassign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();

        assert_eq!(store.get_task(1).unwrap().specification_id.as_deref(), Some("beta"));
        assert_eq!(store.get_specification("beta").unwrap().task_ids, vec![1]);
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_reassign_covers_every_transition() {
        let mut store = store_with(vec![task(1)], vec![spec("alpha"), spec("beta")]);

        // None -> Some
        reassign(&mut store, 1, None, Some("alpha"));
        assert!(invariant_holds(&store));
        assert_eq!(store.get_task(1).unwrap().specification_id.as_deref(), Some("alpha"));

        // Some -> Some
        reassign(&mut store, 1, Some("alpha"), Some("beta"));
        assert!(invariant_holds(&store));
        assert!(store.get_specification("alpha").unwrap().task_ids.is_empty());
        assert_eq!(store.get_specification("beta").unwrap().task_ids, vec![1]);

        // Some -> None
        reassign(&mut store, 1, Some("beta"), None);
        assert!(invariant_holds(&store));
        assert!(store.get_task(1).unwrap().specification_id.is_none());
    }

    #[test]
    fn test_cascade_on_spec_delete_clears_every_reference() {
        let mut store = store_with(
            vec![task(1), task(2), task(3)],
            vec![spec("alpha"), spec("beta")],
        );
        for id in [1, 2, 3] {
            assign(&mut store, &NoopStorage, &LocalOnlyGateway, id, "alpha").unwrap();
        }

        cascade_on_spec_delete(&mut store, "alpha");

        assert!(store.tasks.iter().all(|t| t.specification_id.is_none()));
        assert!(store.get_specification("alpha").unwrap().task_ids.is_empty());
        assert!(invariant_holds(&store));
    }

    #[test]
    fn test_invariant_survives_mixed_operation_sequences() {
        let mut store = store_with(
            vec![task(1), task(2), task(3)],
            vec![spec("alpha"), spec("beta"), spec("gamma")],
        );

        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "alpha").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 2, "alpha").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 3, "beta").unwrap();
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 1, "gamma").unwrap();
        unassign(&mut store, &NoopStorage, &LocalOnlyGateway, 2, "alpha").unwrap();
        cascade_on_spec_delete(&mut store, "beta");
        assign(&mut store, &NoopStorage, &LocalOnlyGateway, 2, "gamma").unwrap();

        assert!(invariant_holds(&store));
        let gamma = store.get_specification("gamma").unwrap();
        assert!(gamma.task_ids.contains(&1) && gamma.task_ids.contains(&2));
        assert!(store.get_task(3).unwrap().specification_id.is_none());
    }
}
