//! Convenience re-exports for common use.

pub use crate::api::{
    AuthApi, Credentials, Note, NoteDraft, NoteQuery, NotesApi, NotesPage, PasswordChange,
    Registration, User,
};
pub use crate::auth::{SessionListener, TerminationReason, TokenStore};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, Result};
pub use crate::http::{ApiResponse, HttpClient, RequestOptions};
