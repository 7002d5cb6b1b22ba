//! Notes client: authenticated HTTP access to the notes backend.
//!
//! Every request goes through one [`http::HttpClient`], which attaches the
//! shared bearer token, translates keys between camelCase and the backend's
//! snake_case, and transparently recovers from an expired token with a
//! single-flight refresh.
//!
//! # Quick Start
//!
//! ```no_run
//! use notes_client::prelude::*;
//!
//! # async fn example() -> notes_client::error::Result<()> {
//! let client = HttpClient::new(ClientConfig::from_env()?)?;
//! client.on_session_terminated(|reason: &TerminationReason| {
//!     eprintln!("session ended: {reason}");
//! });
//!
//! let auth = AuthApi::new(client.clone());
//! auth.login(&Credentials {
//!     email: "ada@example.com".into(),
//!     password: "hunter2".into(),
//! })
//! .await?;
//! let me = auth.who_am_i().await?;
//!
//! let notes = NotesApi::new(client).fetch_notes(me.id, &NoteQuery::default()).await?;
//! println!("{} notes", notes.data.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod transform;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
