// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Time budget for a single exam session, in seconds.
    pub exam_duration_seconds: i64,
    /// Insert the demo question set at startup when the bank is empty.
    pub seed_questions: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let exam_duration_seconds = env::var("EXAM_DURATION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        let seed_questions = env::var("SEED_QUESTIONS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            exam_duration_seconds,
            seed_questions,
        }
    }
}
