//! CLI handlers for note commands.

use crate::api::{AuthApi, Note, NoteDraft, NoteQuery, NotesApi};
use crate::http::HttpClient;

use super::{ListArgs, NoteArgs};

/// Handle `notes list`.
pub async fn handle_list(
    client: &HttpClient,
    args: ListArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = current_user_id(client).await?;
    let query = NoteQuery {
        title: args.title,
        start_date: args.start_date,
        end_date: args.end_date,
        limit: args.limit,
    };
    let notes = NotesApi::new(client.clone());

    let (items, next) = if args.all {
        (notes.fetch_all(user_id, &query).await?, None)
    } else {
        let page = notes.fetch_notes(user_id, &query).await?;
        (page.data, page.next)
    };

    if items.is_empty() {
        println!("No notes.");
    }
    for note in &items {
        print_note(note);
    }
    if next.is_some() {
        println!("… more notes available (use --all)");
    }
    Ok(())
}

/// Handle `notes create`.
pub async fn handle_create(
    client: &HttpClient,
    args: NoteArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = current_user_id(client).await?;
    let note = NotesApi::new(client.clone())
        .create_note(user_id, &draft(args))
        .await?;
    println!("✅ Created note {}", note.id);
    Ok(())
}

/// Handle `notes update <id>`.
pub async fn handle_update(
    client: &HttpClient,
    id: i64,
    args: NoteArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = current_user_id(client).await?;
    let note = NotesApi::new(client.clone())
        .update_note(user_id, id, &draft(args))
        .await?;
    println!("✅ Updated note {}", note.id);
    Ok(())
}

/// Handle `notes delete <id>`.
pub async fn handle_delete(client: &HttpClient, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = current_user_id(client).await?;
    NotesApi::new(client.clone()).delete_note(user_id, id).await?;
    println!("🗑️  Deleted note {id}");
    Ok(())
}

async fn current_user_id(client: &HttpClient) -> Result<i64, Box<dyn std::error::Error>> {
    if !client.access_token().is_present() {
        return Err("Not logged in. Run `notes auth login`.".into());
    }
    Ok(AuthApi::new(client.clone()).who_am_i().await?.id)
}

fn draft(args: NoteArgs) -> NoteDraft {
    NoteDraft {
        title: args.title,
        content: args.content,
        category_id: args.category,
    }
}

fn print_note(note: &Note) {
    let when = note
        .updated_at
        .as_deref()
        .or(note.created_at.as_deref())
        .unwrap_or("");
    println!("[{}] {} {}", note.id, note.title, when);
    if !note.content.is_empty() {
        println!("    {}", note.content.replace('\n', "\n    "));
    }
}
