use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;

use blogicum::forms::RegistrationForm;
use blogicum::services::AuthService;
use blogicum::utils::ensure_directory_exists;
use blogicum::{router, AppState, BlogError, Database, Services, Settings};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(name = "blogicum", about = "Personal blog server")]
struct Cli {
    /// SQLite database file, overrides BLOG_DATABASE_PATH
    #[arg(long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the blog over HTTP (default)
    Serve {
        /// Address to listen on, overrides BLOG_LISTEN_ADDR
        #[arg(long)]
        listen: Option<String>,
    },
    /// Register an account
    CreateUser {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Add a category
    CreateCategory {
        title: String,
        slug: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Create the category unpublished
        #[arg(long)]
        hidden: bool,
    },
    /// Add a location
    CreateLocation {
        name: String,
        #[arg(long)]
        hidden: bool,
    },
    /// Print every category
    ListCategories,
}

/// Keeps form errors readable on the command line
fn describe(err: BlogError) -> anyhow::Error {
    match err {
        BlogError::Validation(errors) => anyhow!(
            "invalid input: {}",
            serde_json::to_string(&errors).unwrap_or_default()
        ),
        other => anyhow!(other),
    }
}

fn spawn_session_purge(auth: AuthService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let auth = auth.clone();
            match tokio::task::spawn_blocking(move || auth.purge_expired_sessions()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Session purge failed: {:#}", e),
                Err(e) => error!("Session purge task panicked: {}", e),
            }
        }
    });
}

async fn serve(services: Services, settings: &Settings) -> Result<()> {
    spawn_session_purge(services.auth.clone());

    let app = router(AppState::new(services), settings);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen_addr))?;
    info!("Listening on {}", settings.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }

    ensure_directory_exists(&settings.database_path)?;
    let database = Database::new(&settings.database_path)?;
    let services = Services::new(&database, &settings)?;

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                settings.listen_addr = listen;
            }
            serve(services, &settings).await?;
        }
        Command::CreateUser { username, password } => {
            let form = RegistrationForm {
                username,
                password1: password.clone(),
                password2: password,
            };
            let id = services.auth.register(&form).map_err(describe)?;
            println!("Created user {}", id);
        }
        Command::CreateCategory {
            title,
            slug,
            description,
            hidden,
        } => {
            let id = services
                .catalog
                .create_category(&title, &slug, &description, !hidden)
                .map_err(describe)?;
            println!("Created category {} ({})", slug, id);
        }
        Command::CreateLocation { name, hidden } => {
            let id = services
                .catalog
                .create_location(&name, !hidden)
                .map_err(describe)?;
            println!("Created location {} ({})", name, id);
        }
        Command::ListCategories => {
            for category in services.catalog.list_categories().map_err(describe)? {
                let state = if category.is_published { "published" } else { "hidden" };
                println!("{}\t{}\t{}\t{}", category.id, category.slug, state, category.title);
            }
        }
    }

    Ok(())
}
