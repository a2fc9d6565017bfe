pub mod auth_token;
pub mod note;
pub mod user;
