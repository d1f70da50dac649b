use chrono::{Duration, Utc};
use clap::Parser;
use dotenvy::dotenv;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use studyhub_backend::config::AppConfig;
use studyhub_backend::entities::{prelude::Users, users};
use studyhub_backend::infrastructure::database;
use studyhub_backend::utils::auth::create_jwt_with_ttl;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Issues a session token for an existing user, or creates the user first.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Email of the user to issue the token for
    #[arg(long)]
    email: String,

    /// Create the user with this full name when the email is unknown
    #[arg(long)]
    create: Option<String>,

    /// Give a newly created user the admin role
    #[arg(long, default_value_t = false)]
    admin: bool,

    /// Token lifetime in hours
    #[arg(long, default_value_t = 24 * 7)]
    ttl_hours: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issue_token=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    info!("🔌 Connecting to database...");
    let db = database::setup_database().await?;

    let existing = Users::find()
        .filter(users::Column::Email.eq(&args.email))
        .one(&db)
        .await?;

    let user = match (existing, args.create) {
        (Some(user), _) => user,
        (None, Some(full_name)) => {
            let role = if args.admin {
                users::ROLE_ADMIN
            } else {
                users::ROLE_STUDENT
            };
            let user = users::ActiveModel {
                full_name: Set(full_name),
                email: Set(args.email.clone()),
                role: Set(role.to_string()),
                institution: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db)
            .await?;
            info!("👤 Created {} user {} ({})", role, user.id, user.email);
            user
        }
        (None, None) => {
            error!("❌ No user with email {}. Pass --create <full name> to add one.", args.email);
            std::process::exit(1);
        }
    };

    let token = create_jwt_with_ttl(user.id, &config.jwt_secret, Duration::hours(args.ttl_hours))?;

    info!("✅ Token for user {} valid for {}h", user.id, args.ttl_hours);
    println!("{}", token);

    Ok(())
}
