//! PostgreSQL log store configuration loaded from environment variables.

/// Connection settings for [`PostgresLogStore`](crate::PostgresLogStore).
///
/// Reads from environment variables:
/// - `DATABASE_URL`: connection string (no default; `None` when unset)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `DATABASE_RUN_MIGRATIONS`: apply bundled migrations on connect (default: `true`)
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl PostgresConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_connections),
            run_migrations: lookup("DATABASE_RUN_MIGRATIONS")
                .and_then(|flag| parse_flag(&flag))
                .unwrap_or(defaults.run_migrations),
        }
    }

    /// Returns a copy of this configuration pointing at `url`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            run_migrations: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = PostgresConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = PostgresConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/sagas"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("DATABASE_RUN_MIGRATIONS", "off"),
        ]));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/sagas")
        );
        assert_eq!(config.max_connections, 12);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = PostgresConfig::from_lookup(lookup(&[
            ("DATABASE_URL", ""),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
            ("DATABASE_RUN_MIGRATIONS", "maybe"),
        ]));
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_with_url() {
        let config = PostgresConfig::default().with_url("postgres://db/logs");
        assert_eq!(config.database_url.as_deref(), Some("postgres://db/logs"));
    }
}
