use crate::entities::{courses, ratings, stored_files, summaries, users};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm::{ConnectionTrait, Schema, Statement};
use std::env;
use std::time::Duration;
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://studyhub.db?mode=rwc";

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: users, courses, stored_files -> summaries -> ratings
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "courses",
            schema
                .create_table_from_entity(courses::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "stored_files",
            schema
                .create_table_from_entity(stored_files::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "summaries",
            schema
                .create_table_from_entity(summaries::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "ratings",
            schema
                .create_table_from_entity(ratings::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        db.execute(builder.build(&stmt)).await?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_ratings_summary_user ON ratings(summary_id, user_id)",
        "CREATE INDEX IF NOT EXISTS idx_summaries_course_id ON summaries(course_id)",
        "CREATE INDEX IF NOT EXISTS idx_summaries_upload_date ON summaries(upload_date)",
    ];

    for query in indexes {
        db.execute(Statement::from_string(builder, query.to_owned()))
            .await?;
    }

    Ok(())
}
