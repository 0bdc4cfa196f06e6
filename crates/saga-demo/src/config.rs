//! Demo configuration loaded from environment variables.

/// Transfer scenario settings with sensible defaults.
///
/// Reads from environment variables:
/// - `SAGA_DEMO_FROM` / `SAGA_DEMO_TO`: accounts (default: `"alice"` / `"bob"`)
/// - `SAGA_DEMO_AMOUNT`: amount to move (default: `25`)
/// - `SAGA_DEMO_OPENING_BALANCE`: balance of the source account (default: `100`)
/// - `SAGA_DEMO_FAIL_AT`: name of a step to fail on purpose (default: none)
/// - `SAGA_DEMO_FAIL_COMPENSATION`: make every compensation fail (default: `false`)
/// - `SAGA_DEMO_EXECUTION_ID`: fixed execution id (default: random)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub opening_balance: i64,
    pub fail_at: Option<String>,
    pub fail_compensation: bool,
    pub execution_id: Option<String>,
    pub log_level: String,
}

impl DemoConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            from: lookup("SAGA_DEMO_FROM").unwrap_or(defaults.from),
            to: lookup("SAGA_DEMO_TO").unwrap_or(defaults.to),
            amount: lookup("SAGA_DEMO_AMOUNT")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.amount),
            opening_balance: lookup("SAGA_DEMO_OPENING_BALANCE")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.opening_balance),
            fail_at: lookup("SAGA_DEMO_FAIL_AT").filter(|s| !s.is_empty()),
            fail_compensation: lookup("SAGA_DEMO_FAIL_COMPENSATION")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.fail_compensation),
            execution_id: lookup("SAGA_DEMO_EXECUTION_ID").filter(|s| !s.is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 25,
            opening_balance: 100,
            fail_at: None,
            fail_compensation: false,
            execution_id: None,
            log_level: "info".to_string(),
        }
    }
}
