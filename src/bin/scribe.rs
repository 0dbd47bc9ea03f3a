//! Management CLI for the Scribe API. `scribe seed` loads the sample data
//! set the way the original deployment scripts did: clears posts and
//! categories, ensures the default admin account, and inserts sample
//! content cycling through the categories.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use scribe_api_rust::auth;
use scribe_api_rust::database::manager::DatabaseManager;
use scribe_api_rust::database::models::user::ROLE_ADMIN;
use scribe_api_rust::database::schema;
use scribe_api_rust::services::category_service::{CategoryService, CreateCategory};
use scribe_api_rust::services::post_service::{CreatePost, PostService};

#[derive(Parser)]
#[command(name = "scribe", about = "Scribe API management CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset posts and categories, then load the sample data set
    Seed {
        /// Also remove all user accounts before seeding
        #[arg(long)]
        drop_users: bool,
    },
}

const SAMPLE_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Technology", "Latest tech trends and innovations", "#3B82F6"),
    ("Programming", "Coding tutorials and development tips", "#10B981"),
    ("Web Development", "Frontend and backend development", "#F59E0B"),
    ("Databases", "Storage engines and data management", "#8B5CF6"),
    ("Rust", "Rust tutorials and best practices", "#06B6D4"),
];

const SAMPLE_POSTS: &[(&str, &str, &[&str])] = &[
    (
        "Getting Started with Axum",
        "Axum is an ergonomic web framework built on Tokio, Tower, and Hyper. \
         Handlers are plain async functions, extractors pull typed data out of \
         requests, and middleware composes through Tower layers. This post walks \
         through a first service: a router, a JSON endpoint, and structured \
         error handling.",
        &["rust", "axum", "web"],
    ),
    (
        "Understanding Ownership and Borrowing",
        "Ownership is the heart of Rust's memory model. Every value has a \
         single owner, moves transfer that ownership, and borrows grant \
         temporary access without it. Once those three rules click, the \
         borrow checker turns from an adversary into a code reviewer that \
         never sleeps.",
        &["rust", "ownership", "basics"],
    ),
    (
        "Designing JSON APIs That Last",
        "A good JSON API is boring: predictable envelopes, stable field \
         names, explicit pagination, and errors that tell the client what to \
         fix. We look at the success/error envelope pattern and why returning \
         field-level validation errors beats a single message string.",
        &["api", "json", "design"],
    ),
    (
        "Document Stores vs Relational Tables",
        "Embedding related data in one document buys you atomic updates and \
         cheap reads at the cost of cross-document joins. We compare embedded \
         comment arrays against a separate comments table and when each shape \
         wins.",
        &["databases", "modeling"],
    ),
    (
        "Full-Text Search Without a Search Engine",
        "Not every application needs a dedicated search cluster. For small \
         corpora, case-insensitive substring matching across a handful of \
         columns goes a long way. This post covers pattern matching over \
         title, body, and tag arrays, and where its limits are.",
        &["search", "databases", "web"],
    ),
];

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "password123";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Seed { drop_users } => seed(drop_users).await,
    }
}

async fn seed(drop_users: bool) -> Result<()> {
    let pool = DatabaseManager::pool()
        .await
        .context("failed to connect to the database")?;
    schema::ensure_schema(&pool)
        .await
        .context("failed to ensure schema")?;

    // Clear existing content the way the original seed script does;
    // accounts survive unless explicitly dropped.
    sqlx::query("DELETE FROM posts").execute(&pool).await?;
    sqlx::query("DELETE FROM categories").execute(&pool).await?;
    if drop_users {
        sqlx::query("DELETE FROM users").execute(&pool).await?;
    }
    println!("Cleared existing data");

    let admin_id = ensure_admin(&pool).await?;

    let categories = CategoryService::new().await?;
    let mut created_categories = Vec::new();
    for (name, description, color) in SAMPLE_CATEGORIES {
        let category = categories
            .create(CreateCategory {
                name: name.to_string(),
                description: Some(description.to_string()),
                color: Some(color.to_string()),
                is_active: None,
            })
            .await
            .with_context(|| format!("failed to create category '{}'", name))?;
        created_categories.push(category);
    }
    println!("Created {} categories", created_categories.len());

    let posts = PostService::new().await?;
    for (index, (title, content, tags)) in SAMPLE_POSTS.iter().enumerate() {
        let category = &created_categories[index % created_categories.len()];
        posts
            .create(
                admin_id,
                CreatePost {
                    title: title.to_string(),
                    content: content.to_string(),
                    category: category.id,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    featured_image: None,
                },
            )
            .await
            .with_context(|| format!("failed to create post '{}'", title))?;
    }
    println!("Created {} posts", SAMPLE_POSTS.len());

    println!("Database seeding completed successfully!");
    println!("Default user: {} / {}", ADMIN_EMAIL, ADMIN_PASSWORD);
    Ok(())
}

/// Find or create the default admin account, returning its id.
async fn ensure_admin(pool: &sqlx::PgPool) -> Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(ADMIN_EMAIL)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let hash = auth::hash_password(ADMIN_PASSWORD).context("failed to hash admin password")?;
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password, role, avatar, created_at) \
         VALUES ($1, $2, $3, $4, $5, NULL, now())",
    )
    .bind(id)
    .bind("Admin User")
    .bind(ADMIN_EMAIL)
    .bind(&hash)
    .bind(ROLE_ADMIN)
    .execute(pool)
    .await?;
    println!("Created default user");
    Ok(id)
}
