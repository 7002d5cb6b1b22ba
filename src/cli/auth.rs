//! CLI handlers for `notes auth` and `notes account`.

use crate::api::{AuthApi, Credentials, PasswordChange, Registration};
use crate::error::ClientError;
use crate::http::HttpClient;

use super::{LoginArgs, PasswordArgs, RegisterArgs};

/// Handle `notes auth register`.
pub async fn handle_register(
    client: &HttpClient,
    args: RegisterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    AuthApi::new(client.clone())
        .register(&Registration {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email.clone(),
            password: args.password,
        })
        .await
        .map_err(|err| describe(err, "Registration failed."))?;
    println!("✅ Registered {}. Run `notes auth login` to sign in.", args.email);
    Ok(())
}

/// Handle `notes auth login`.
pub async fn handle_login(
    client: &HttpClient,
    args: LoginArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let auth = AuthApi::new(client.clone());
    auth.login(&Credentials {
        email: args.email,
        password: args.password,
    })
    .await
    .map_err(|err| describe(err, "Login failed."))?;

    let user = auth.who_am_i().await?;
    println!("✅ Logged in as {} <{}>", user.display_name(), user.email);
    Ok(())
}

/// Handle `notes auth logout`.
pub async fn handle_logout(client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    match AuthApi::new(client.clone()).logout().await {
        Ok(()) => println!("✅ Logged out"),
        Err(err) => println!("⚠️  Backend logout failed ({err}); local session cleared"),
    }
    Ok(())
}

/// Handle `notes auth whoami`.
pub async fn handle_whoami(client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    if !client.access_token().is_present() {
        println!("Not logged in. Run `notes auth login`.");
        return Ok(());
    }
    let user = AuthApi::new(client.clone()).who_am_i().await?;
    println!("{} <{}> (id {})", user.display_name(), user.email, user.id);
    Ok(())
}

/// Handle `notes auth status`. Reads local state only.
pub fn handle_status(client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    println!("Backend: {}", client.config().base_url);
    println!("Token store: {}", client.config().token_dir().display());
    if client.access_token().is_present() {
        println!("✅ Access token stored");
    } else {
        println!("❌ No access token stored");
    }
    Ok(())
}

/// Handle `notes account password`.
pub async fn handle_password(
    client: &HttpClient,
    args: PasswordArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = AuthApi::new(client.clone())
        .update_password(&PasswordChange {
            current_password: args.current,
            new_password: args.new,
        })
        .await;
    match result {
        Ok(()) => {
            println!("✅ Password updated");
            Ok(())
        }
        Err(err) if err.is_authentication() => Err("Current password is incorrect.".into()),
        Err(err) => Err(describe(err, "Failed to update password.").into()),
    }
}

/// The backend's own message when it sent one, otherwise `fallback`.
fn describe(err: ClientError, fallback: &str) -> String {
    match err.message() {
        Some(message) => message.to_string(),
        None if matches!(err, ClientError::Http { .. } | ClientError::Authentication { .. }) => {
            fallback.to_string()
        }
        None => format!("{fallback} {err}"),
    }
}
