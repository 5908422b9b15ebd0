use std::env;
use std::path::PathBuf;

/// Process configuration, resolved once at startup. Everything downstream
/// receives these values already resolved; no other module reads the
/// environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON rates file ingested by `POST /loaddata`.
    pub rates_file: PathBuf,
    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl AppConfig {
    /// Reads configuration from the environment, falling back to the
    /// defaults of the docker-compose deployment for anything unset.
    pub fn from_env() -> Self {
        Self {
            rates_file: env::var("RATES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("rates.json")),
            postgres_host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "db".to_string()),
            postgres_port: env::var("POSTGRES_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(5432),
            postgres_user: env::var("POSTGRES_USER").unwrap_or_else(|_| "admin".to_string()),
            postgres_password: env::var("POSTGRES_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            postgres_db: env::var("POSTGRES_DB")
                .unwrap_or_else(|_| "CargoInsurance".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }

    /// Connection string for the tariff database.
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_host,
            self.postgres_port,
            self.postgres_db
        )
    }
}
