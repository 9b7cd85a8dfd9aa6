//! Environment-backed application configuration.

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            "postgres://appraisal:@localhost:5432/appraisalserver".to_string()
        });
        Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig { url },
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
