//! Notes CLI binary entry point.

use clap::Parser;
use notes_client::cli::{AccountCommands, AuthCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("NOTES_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use notes_client::cli::{auth, notes};

    let client = notes_client::cli::connect()?;
    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Register(args) => auth::handle_register(&client, args).await,
            AuthCommands::Login(args) => auth::handle_login(&client, args).await,
            AuthCommands::Logout => auth::handle_logout(&client).await,
            AuthCommands::Whoami => auth::handle_whoami(&client).await,
            AuthCommands::Status => auth::handle_status(&client),
        },
        Commands::List(args) => notes::handle_list(&client, args).await,
        Commands::Create(args) => notes::handle_create(&client, args).await,
        Commands::Update(args) => notes::handle_update(&client, args.id, args.note).await,
        Commands::Delete(args) => notes::handle_delete(&client, args.id).await,
        Commands::Account(account) => match account.command {
            AccountCommands::Password(args) => auth::handle_password(&client, args).await,
        },
    }
}
