//! Typed wrappers over the backend endpoints.

pub mod auth;
pub mod notes;
pub mod types;

pub use auth::AuthApi;
pub use notes::NotesApi;
pub use types::{
    Credentials, Note, NoteDraft, NoteQuery, NotesPage, PasswordChange, Registration,
    TokenResponse, User,
};
