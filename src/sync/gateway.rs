use std::cell::Cell;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::models::{specification::Specification, task::Task};
use crate::sync::event::{Assignment, ChangeEvent, Unassignment};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The pluggable persistence/broadcast boundary the repositories talk to.
///
/// `on_local_change` runs after every successful mutation. The change is
/// already committed to the Local Store at that point, so an implementation
/// must absorb remote failures rather than surface them to the caller.
pub trait SyncGateway {
    fn on_local_change(&self, event: &ChangeEvent);

    fn is_online(&self) -> bool;
}

/// Default gateway: everything stays in the Local Store
pub struct LocalOnlyGateway;

impl SyncGateway for LocalOnlyGateway {
    fn on_local_change(&self, _event: &ChangeEvent) {}

    fn is_online(&self) -> bool {
        false
    }
}

/// Forwards every local mutation to the remote REST surface. The first
/// failed request flips the session to offline mode: later mutations stay
/// local-only and are not queued for replay.
pub struct RemoteGateway {
    base_url: String,
    client: Client,
    online: Cell<bool>,
}

impl RemoteGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            online: Cell::new(true),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn push(&self, event: &ChangeEvent) -> Result<(), RemoteError> {
        let response = match event {
            ChangeEvent::TaskCreated(task) => self
                .client
                .post(self.url("/api/tasks"))
                .json(task)
                .send()?,
            ChangeEvent::TaskUpdated(task) => self
                .client
                .put(self.url(&format!("/api/tasks/{}", task.id)))
                .json(task)
                .send()?,
            ChangeEvent::TaskDeleted(deleted) => self
                .client
                .delete(self.url(&format!("/api/tasks/{}", deleted.id)))
                .send()?,
            ChangeEvent::SpecificationCreated(spec) => self
                .client
                .post(self.url("/api/specifications"))
                .json(spec)
                .send()?,
            ChangeEvent::SpecificationUpdated(spec) => self
                .client
                .put(self.url(&format!("/api/specifications/{}", spec.id)))
                .json(spec)
                .send()?,
            ChangeEvent::SpecificationDeleted(deleted) => self
                .client
                .delete(self.url(&format!("/api/specifications/{}", deleted.id)))
                .send()?,
            ChangeEvent::TaskAssigned(assignment) => self
                .client
                .post(self.url("/api/assign-task"))
                .json::<Assignment>(assignment)
                .send()?,
            ChangeEvent::TaskUnassigned(unassignment) => self
                .client
                .post(self.url("/api/unassign-task"))
                .json::<Unassignment>(unassignment)
                .send()?,
        };

        response.error_for_status()?;
        Ok(())
    }

    /// Full task list as the remote sees it (for `sync pull`)
    pub fn fetch_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let tasks = self
            .client
            .get(self.url("/api/tasks"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(tasks)
    }

    /// Full specification list as the remote sees it (for `sync pull`)
    pub fn fetch_specifications(&self) -> Result<Vec<Specification>, RemoteError> {
        let specs = self
            .client
            .get(self.url("/api/specifications"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(specs)
    }
}

impl SyncGateway for RemoteGateway {
    fn on_local_change(&self, event: &ChangeEvent) {
        if !self.online.get() {
            return;
        }

        if let Err(e) = self.push(event) {
            // One warning per session; the store already holds the change.
            self.online.set(false);
            log::warn!("Sync gateway unreachable, session continues offline: {e}");
        }
    }

    fn is_online(&self) -> bool {
        self.online.get()
    }
}
