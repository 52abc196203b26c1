use anyhow::Result;
use async_trait::async_trait;

use crate::db::{Database, SessionRecord, SessionUpdate};
use crate::models::FocusEvent;

use super::SessionStore;

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        self.insert_session(session).await
    }

    async fn get_session(&self, owner_id: &str, session_id: &str) -> Result<Option<SessionRecord>> {
        Database::get_session(self, owner_id, session_id).await
    }

    async fn update_session(
        &self,
        owner_id: &str,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<()> {
        Database::update_session(self, owner_id, session_id, update).await
    }

    async fn find_session_by_name(&self, owner_id: &str, name: &str) -> Result<Option<String>> {
        self.find_session_id_by_name(owner_id, name).await
    }

    async fn append_event(&self, owner_id: &str, event: &FocusEvent) -> Result<()> {
        self.insert_event(owner_id, event).await
    }

    async fn list_sessions(&self, owner_id: &str) -> Result<Vec<SessionRecord>> {
        Database::list_sessions(self, owner_id).await
    }
}
