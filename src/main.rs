// src/main.rs

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use exam_backend::config::Config;
use exam_backend::routes;
use exam_backend::state::AppState;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Demo question bank, inserted at startup when the bank is empty and
/// seeding is enabled.
const DEMO_QUESTIONS: [(&str, &str, &str, &str, &str, &str); 10] = [
    ("What is the capital of France?", "Berlin", "Paris", "Madrid", "Rome", "b"),
    ("2 + 2 = ?", "3", "5", "4", "22", "c"),
    ("React is a ____ library.", "UI", "Database", "OS", "Compiler", "a"),
    ("HTTP status 200 means?", "OK", "Created", "Not Found", "Forbidden", "a"),
    ("JWT stands for?", "Java Web Tool", "JSON Web Token", "JavaScript Web Type", "None", "b"),
    ("SQL command to fetch rows?", "SELECT", "INSERT", "UPDATE", "DELETE", "a"),
    ("Which is a NoSQL DB?", "MongoDB", "PostgreSQL", "MySQL", "SQLite", "a"),
    ("CSS property for text color?", "background", "color", "font-weight", "border", "b"),
    ("In React, useState returns?", "value and setter", "class", "DOM", "route", "a"),
    ("Primary key property?", "Duplicates ok", "Must be unique", "Nullable", "Text only", "b"),
];

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("DATABASE_URL is not a valid SQLite URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_options)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed Question Bank
    if config.seed_questions {
        if let Err(e) = seed_question_bank(&pool).await {
            tracing::error!("Failed to seed question bank: {:?}", e);
        }
    }

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

async fn seed_question_bank(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    tracing::info!("Question bank empty, seeding {} demo questions", DEMO_QUESTIONS.len());

    for (text, option_a, option_b, option_c, option_d, correct) in DEMO_QUESTIONS {
        sqlx::query(
            r#"
            INSERT INTO questions (text, option_a, option_b, option_c, option_d, correct)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(text)
        .bind(option_a)
        .bind(option_b)
        .bind(option_c)
        .bind(option_d)
        .bind(correct)
        .execute(pool)
        .await?;
    }

    tracing::info!("Question bank seeded.");
    Ok(())
}
