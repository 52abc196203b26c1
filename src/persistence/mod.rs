//! Session store seam and the throttled persistence gateway in front of it.

mod gateway;
mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use gateway::{
    PersistenceError, PersistenceGateway, SnapshotOutcome, StatsSnapshot, DEFAULT_PERSIST_EVERY,
};

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{SessionRecord, SessionUpdate};
use crate::models::FocusEvent;

/// Key-value style session storage addressed by `(owner_id, session_id)`.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn create_session(&self, session: &SessionRecord) -> Result<()>;

    async fn get_session(&self, owner_id: &str, session_id: &str) -> Result<Option<SessionRecord>>;

    async fn update_session(
        &self,
        owner_id: &str,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<()>;

    /// Id of the most recently created session with exactly this name.
    async fn find_session_by_name(&self, owner_id: &str, name: &str) -> Result<Option<String>>;

    async fn append_event(&self, owner_id: &str, event: &FocusEvent) -> Result<()>;

    async fn list_sessions(&self, owner_id: &str) -> Result<Vec<SessionRecord>>;
}
