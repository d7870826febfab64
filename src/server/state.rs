use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::store::Store;
use crate::storage::json::JsonFileStorage;
use crate::sync::event::{PresenceUser, ServerMessage};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<Mutex<Store>>,
    pub storage: Arc<JsonFileStorage>,
    pub broadcaster: EventBroadcaster,
    /// Users currently holding a WebSocket connection, by connection id
    pub connected: Arc<Mutex<HashMap<Uuid, PresenceUser>>>,
}

impl ServerState {
    pub fn new(store: Store, storage: JsonFileStorage) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            storage: Arc::new(storage),
            broadcaster: EventBroadcaster::new(),
            connected: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn online_users(&self) -> Vec<PresenceUser> {
        self.connected.lock().unwrap().values().cloned().collect()
    }
}

/// Fans messages out to every connected WebSocket client
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerMessage>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx }
    }

    /// Send to all subscribers; a channel with no receivers is fine
    pub fn broadcast(&self, message: ServerMessage) {
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
