use sqlx::SqlitePool;

use crate::db::EventStore;

/// Shared by every request; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub events: EventStore,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            events: EventStore::new(pool),
        }
    }
}
