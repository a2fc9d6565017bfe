use async_trait::async_trait;

use crate::contract::{
    error::NotesError,
    model::{DeletedUser, NewNote, NewUser, Note, NotePatch, User},
};

/// Public API trait for the notes module that other modules (and admin tooling) can use.
///
/// Note operations act on behalf of `requester_id` and apply the same ownership rules
/// as the REST API.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn register_user(&self, new_user: NewUser) -> Result<User, NotesError>;

    async fn get_user(&self, id: i32) -> Result<User, NotesError>;

    /// Delete a user with their notes and tokens in one transaction.
    async fn delete_user(&self, username: &str) -> Result<DeletedUser, NotesError>;

    async fn list_notes(&self, requester_id: i32) -> Result<Vec<Note>, NotesError>;

    async fn create_note(&self, requester_id: i32, new_note: NewNote) -> Result<Note, NotesError>;

    async fn get_note(&self, requester_id: i32, id: i32) -> Result<Note, NotesError>;

    async fn update_note(
        &self,
        requester_id: i32,
        id: i32,
        patch: NotePatch,
    ) -> Result<Note, NotesError>;

    async fn delete_note(&self, requester_id: i32, id: i32) -> Result<(), NotesError>;
}
