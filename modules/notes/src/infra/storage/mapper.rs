use crate::contract::model::{Note, User};
use crate::infra::storage::entity::{note, user};

/// Convert a database entity to a contract model; the password hash stays behind.
impl From<user::Model> for User {
    fn from(entity: user::Model) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            date_joined: entity.date_joined,
        }
    }
}

/// Join a note row with its owner row.
pub fn note_to_contract(entity: note::Model, owner: User) -> Note {
    Note {
        id: entity.id,
        text: entity.text,
        date_created: entity.date_created,
        date_edited: entity.date_edited,
        user: owner,
    }
}
