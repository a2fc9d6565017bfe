pub mod client;
pub mod error;
pub mod model;

pub use client::NotesApi;
pub use error::NotesError;
pub use model::{DeletedUser, NewNote, NewUser, Note, NotePatch, User};
