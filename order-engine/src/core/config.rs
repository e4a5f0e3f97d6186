use std::time::Duration;

/// Engine configuration
///
/// # Environment variables
///
/// Every knob can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/order-engine | Working directory (logs, menu file) |
/// | LOG_LEVEL | info | Log level |
/// | MENU_PATH | menu.json | Menu source file, relative to WORK_DIR |
/// | MENU_TTL_HOURS | 24 | Menu cache refresh interval |
/// | PAYMENT_POLL_INTERVAL_SECS | 15 | Delay between payment status polls |
/// | PAYMENT_POLL_MAX_ATTEMPTS | 20 | Automatic polls before manual-only mode |
/// | RECOVERY_WINDOW_DAYS | 5 | Startup sweep window for stuck orders |
/// | SESSION_IDLE_TIMEOUT_MINS | 60 | Idle order sessions older than this are evicted |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/bot MENU_TTL_HOURS=12 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for logs and the menu file
    pub work_dir: String,
    /// Log level: trace | debug | info | warn | error
    pub log_level: String,
    /// Menu source file path (relative paths resolve against work_dir)
    pub menu_path: String,
    /// Menu cache TTL in hours
    pub menu_ttl_hours: u64,
    /// Payment poll interval in seconds
    pub payment_poll_interval_secs: u64,
    /// Automatic payment poll attempt budget
    pub payment_poll_max_attempts: u32,
    /// How many days back the startup recovery sweep looks
    pub recovery_window_days: i64,
    /// Idle session eviction threshold in minutes
    pub session_idle_timeout_mins: u64,
}

impl Config {
    /// Load configuration from environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/order-engine".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            menu_path: std::env::var("MENU_PATH").unwrap_or_else(|_| "menu.json".into()),
            menu_ttl_hours: std::env::var("MENU_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            payment_poll_interval_secs: std::env::var("PAYMENT_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            payment_poll_max_attempts: std::env::var("PAYMENT_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            recovery_window_days: std::env::var("RECOVERY_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            session_idle_timeout_mins: std::env::var("SESSION_IDLE_TIMEOUT_MINS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }

    pub fn menu_ttl(&self) -> Duration {
        Duration::from_secs(self.menu_ttl_hours * 3600)
    }

    pub fn payment_poll_interval(&self) -> Duration {
        Duration::from_secs(self.payment_poll_interval_secs)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_mins * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "/var/lib/order-engine".into(),
            log_level: "info".into(),
            menu_path: "menu.json".into(),
            menu_ttl_hours: 24,
            payment_poll_interval_secs: 15,
            payment_poll_max_attempts: 20,
            recovery_window_days: 5,
            session_idle_timeout_mins: 60,
        }
    }
}
