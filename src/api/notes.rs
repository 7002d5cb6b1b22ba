use reqwest::Method;

use super::types::{Note, NoteDraft, NoteQuery, NotesPage};
use crate::error::Result;
use crate::http::{HttpClient, RequestOptions};

/// Note CRUD for a single user.
#[derive(Debug, Clone)]
pub struct NotesApi {
    http: HttpClient,
}

impl NotesApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn fetch_notes(&self, user_id: i64, query: &NoteQuery) -> Result<NotesPage> {
        let options = query
            .to_pairs()
            .into_iter()
            .fold(RequestOptions::new(), |options, (key, value)| {
                options.with_query(key, value)
            });
        self.http
            .request(Method::GET, &collection(user_id), None, options)
            .await?
            .into_json()
    }

    /// Follow the `next` path of a previous page.
    pub async fn fetch_next(&self, next: &str) -> Result<NotesPage> {
        self.http.get(next).await?.into_json()
    }

    /// Every page, starting from the first one matching `query`.
    pub async fn fetch_all(&self, user_id: i64, query: &NoteQuery) -> Result<Vec<Note>> {
        let mut page = self.fetch_notes(user_id, query).await?;
        let mut notes = std::mem::take(&mut page.data);
        while let Some(next) = page.next.take() {
            page = self.fetch_next(&next).await?;
            notes.append(&mut page.data);
        }
        Ok(notes)
    }

    pub async fn create_note(&self, user_id: i64, draft: &NoteDraft) -> Result<Note> {
        self.http
            .post(&collection(user_id), draft)
            .await?
            .into_json()
    }

    pub async fn update_note(&self, user_id: i64, note_id: i64, draft: &NoteDraft) -> Result<Note> {
        self.http
            .put(&member(user_id, note_id), draft)
            .await?
            .into_json()
    }

    pub async fn delete_note(&self, user_id: i64, note_id: i64) -> Result<()> {
        self.http.delete(&member(user_id, note_id)).await?;
        Ok(())
    }
}

fn collection(user_id: i64) -> String {
    format!("/users/{user_id}/notes/")
}

fn member(user_id: i64, note_id: i64) -> String {
    format!("/users/{user_id}/notes/{note_id}")
}
