use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::models::{Event, EventCreate, EventFilter, EventUpdate};
use crate::utils::error::AppError;
use crate::validation::validate_time_range;

const EVENT_COLUMNS: &str =
    "id, title, description, start_time, end_time, color, created_at, updated_at";

const SELECT_BY_ID: &str = "SELECT id, title, description, start_time, end_time, color, \
     created_at, updated_at FROM events WHERE id = ?";

const INSERT: &str = "INSERT INTO events \
     (title, description, start_time, end_time, color, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?) \
     RETURNING id, title, description, start_time, end_time, color, created_at, updated_at";

const UPDATE: &str = "UPDATE events \
     SET title = ?, description = ?, start_time = ?, end_time = ?, color = ?, updated_at = ? \
     WHERE id = ? \
     RETURNING id, title, description, start_time, end_time, color, created_at, updated_at";

const TOUCH: &str = "UPDATE events SET updated_at = ? WHERE id = ?";

const DELETE: &str = "DELETE FROM events WHERE id = ?";

/// Owner of every persisted [`Event`]. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All events matching the filter, ascending by start time.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
        let mut separator = " WHERE ";

        if let Some(start_date) = filter.start_date {
            query.push(separator).push("start_time >= ").push_bind(start_date);
            separator = " AND ";
        }
        if let Some(end_date) = filter.end_date {
            query.push(separator).push("end_time <= ").push_bind(end_date);
        }
        query.push(" ORDER BY start_time ASC, id ASC");

        let events = query
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = events.len(), "Listed events");
        Ok(events)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(AppError::event_not_found)
    }

    /// Persists a validated payload; id and both timestamps are assigned here.
    #[tracing::instrument(skip(self, payload), fields(title = %payload.title))]
    pub async fn insert(&self, payload: EventCreate) -> Result<Event, AppError> {
        let now = Utc::now();
        let color = payload.color_or_default();

        let event = sqlx::query_as::<_, Event>(INSERT)
            .bind(payload.title)
            .bind(payload.description)
            .bind(payload.start_time)
            .bind(payload.end_time)
            .bind(color)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        info!(id = event.id, "Created event");
        Ok(event)
    }

    /// Applies a partial patch inside one transaction.
    ///
    /// Time ordering is checked against the effective values only when the
    /// patch carries a time field.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: EventUpdate) -> Result<Event, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // The first statement must write: a deferred transaction that reads
        // first cannot later upgrade its snapshot to the write lock under WAL.
        let touched = sqlx::query(TOUCH)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(AppError::event_not_found());
        }

        let mut event = sqlx::query_as::<_, Event>(SELECT_BY_ID)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let check_times = patch.touches_times();
        patch.apply(&mut event);
        if check_times {
            validate_time_range(event.start_time, event.end_time)?;
        }

        let event = sqlx::query_as::<_, Event>(UPDATE)
            .bind(event.title)
            .bind(event.description)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.color)
            .bind(now)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id, "Updated event");
        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(DELETE).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::event_not_found());
        }

        info!(id, "Deleted event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;
    use crate::models::DEFAULT_COLOR;
    use chrono::{DateTime, TimeZone};

    async fn store() -> EventStore {
        EventStore::new(connect("sqlite::memory:", 1).await.unwrap())
    }

    /// File-backed store with several pooled connections. Keep the returned
    /// directory alive for the duration of the test.
    async fn file_store() -> (tempfile::TempDir, EventStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("events.db").display());
        let store = EventStore::new(connect(&url, 8).await.unwrap());
        (dir, store)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn create(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventCreate {
        EventCreate {
            title: title.to_string(),
            description: None,
            start_time: start,
            end_time: end,
            color: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_server_fields() {
        let store = store().await;
        let first = store.insert(create("a", at(1, 9), at(1, 10))).await.unwrap();
        let second = store.insert(create("b", at(1, 9), at(1, 10))).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.color, DEFAULT_COLOR);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.get(first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = store().await;
        assert!(matches!(store.get(42).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_and_filters() {
        let store = store().await;
        let late = store.insert(create("late", at(3, 9), at(3, 10))).await.unwrap();
        let early = store.insert(create("early", at(1, 9), at(1, 10))).await.unwrap();
        let middle = store.insert(create("middle", at(2, 9), at(2, 10))).await.unwrap();

        let all = store.list(&EventFilter::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);

        let from_second = store
            .list(&EventFilter {
                start_date: Some(at(2, 0)),
                end_date: None,
            })
            .await
            .unwrap();
        let ids: Vec<i64> = from_second.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![middle.id, late.id]);

        let window = store
            .list(&EventFilter {
                start_date: Some(at(2, 0)),
                end_date: Some(at(2, 23)),
            })
            .await
            .unwrap();
        assert_eq!(window, vec![middle]);
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let store = store().await;
        let event = store.insert(create("Standup", at(1, 9), at(1, 10))).await.unwrap();

        let patch = EventUpdate {
            title: Some("Standup v2".to_string()),
            ..Default::default()
        };
        let updated = store.update(event.id, patch).await.unwrap();

        assert_eq!(updated.title, "Standup v2");
        assert_eq!(updated.start_time, event.start_time);
        assert_eq!(updated.end_time, event.end_time);
        assert_eq!(updated.created_at, event.created_at);
        assert!(updated.updated_at >= event.updated_at);
    }

    #[tokio::test]
    async fn test_update_checks_effective_times() {
        let store = store().await;
        let event = store.insert(create("a", at(1, 9), at(1, 10))).await.unwrap();

        // Only start patched; compared against the stored end time.
        let patch = EventUpdate {
            start_time: Some(at(1, 11)),
            ..Default::default()
        };
        let result = store.update(event.id, patch).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(store.get(event.id).await.unwrap(), event);

        let patch = EventUpdate {
            start_time: Some(at(1, 11)),
            end_time: Some(at(1, 12)),
            ..Default::default()
        };
        let moved = store.update(event.id, patch).await.unwrap();
        assert_eq!(moved.start_time, at(1, 11));
        assert_eq!(moved.end_time, at(1, 12));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = store().await;
        let result = store.update(7, EventUpdate::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let store = store().await;
        let event = store.insert(create("a", at(1, 9), at(1, 10))).await.unwrap();

        store.delete(event.id).await.unwrap();
        assert!(matches!(store.get(event.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.delete(event.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_to_one_row_all_succeed() {
        let (_dir, store) = file_store().await;
        let event = store.insert(create("shared", at(1, 9), at(1, 10))).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let patch = EventUpdate {
                    title: Some(format!("edit {n}")),
                    ..Default::default()
                };
                store.update(event.id, patch).await
            }));
        }

        for handle in handles {
            let updated = handle.await.unwrap().unwrap();
            assert_eq!(updated.start_time, event.start_time);
        }

        let stored = store.get(event.id).await.unwrap();
        assert!(stored.title.starts_with("edit "));
        assert!(stored.updated_at > event.updated_at);
    }

    #[tokio::test]
    async fn test_sub_second_times_order_and_filter() {
        let (_dir, store) = file_store().await;
        let base = at(1, 9);
        let half = base + chrono::Duration::milliseconds(500);
        let quarter = base + chrono::Duration::milliseconds(250);
        let end = at(1, 10);

        let late = store.insert(create("half", half, end)).await.unwrap();
        let early = store.insert(create("whole", base, end)).await.unwrap();
        let middle = store.insert(create("quarter", quarter, end)).await.unwrap();

        let all = store.list(&EventFilter::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);

        let from = store
            .list(&EventFilter {
                start_date: Some(base + chrono::Duration::milliseconds(300)),
                end_date: None,
            })
            .await
            .unwrap();
        assert_eq!(from, vec![late]);

        let from_whole = store
            .list(&EventFilter {
                start_date: Some(base),
                end_date: None,
            })
            .await
            .unwrap();
        assert_eq!(from_whole.len(), 3);
    }
}
