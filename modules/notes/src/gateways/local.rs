use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::NotesApi,
    error::NotesError,
    model::{DeletedUser, NewNote, NewUser, Note, NotePatch, User},
};
use crate::domain::service::Service;

/// Local implementation of the NotesApi trait that delegates to the domain service
pub struct NotesLocalClient {
    service: Arc<Service>,
}

impl NotesLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }

    async fn requester(&self, requester_id: i32) -> Result<User, NotesError> {
        Ok(self.service.get_user(requester_id).await?)
    }
}

#[async_trait]
impl NotesApi for NotesLocalClient {
    async fn register_user(&self, new_user: NewUser) -> Result<User, NotesError> {
        Ok(self.service.register(new_user).await?)
    }

    async fn get_user(&self, id: i32) -> Result<User, NotesError> {
        Ok(self.service.get_user(id).await?)
    }

    async fn delete_user(&self, username: &str) -> Result<DeletedUser, NotesError> {
        Ok(self.service.delete_user(username).await?)
    }

    async fn list_notes(&self, requester_id: i32) -> Result<Vec<Note>, NotesError> {
        let requester = self.requester(requester_id).await?;
        Ok(self.service.list_notes(&requester).await?)
    }

    async fn create_note(&self, requester_id: i32, new_note: NewNote) -> Result<Note, NotesError> {
        let requester = self.requester(requester_id).await?;
        Ok(self.service.create_note(&requester, new_note).await?)
    }

    async fn get_note(&self, requester_id: i32, id: i32) -> Result<Note, NotesError> {
        let requester = self.requester(requester_id).await?;
        Ok(self.service.get_note(&requester, id).await?)
    }

    async fn update_note(
        &self,
        requester_id: i32,
        id: i32,
        patch: NotePatch,
    ) -> Result<Note, NotesError> {
        let requester = self.requester(requester_id).await?;
        Ok(self.service.update_note(&requester, id, patch).await?)
    }

    async fn delete_note(&self, requester_id: i32, id: i32) -> Result<(), NotesError> {
        let requester = self.requester(requester_id).await?;
        Ok(self.service.delete_note(&requester, id).await?)
    }
}
