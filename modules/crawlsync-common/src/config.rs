use std::env;

/// Service configuration loaded from environment variables. Run identity
/// (site, frequency, date, mode) is explicit CLI input, never ambient.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (records, registry, summaries, and the PGMQ queue)
    pub database_url: String,

    // Queue handoff
    pub queue_name: String,

    // Site whose missing records are registered with the MasterDB category
    pub primary_site: String,

    // Offset used to derive the run date when none is given
    pub utc_offset_minutes: i32,

    // Default copy-attribute list, overridable per run
    pub copy_attributes: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            queue_name: env::var("QUEUE_NAME").unwrap_or_else(|_| "missing_records".to_string()),
            primary_site: required_env("PRIMARY_SITE"),
            utc_offset_minutes: env::var("UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("UTC_OFFSET_MINUTES must be a number"),
            copy_attributes: env::var("COPY_ATTRIBUTES").unwrap_or_default(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
