//! Food-ordering engine
//!
//! # Architecture overview
//!
//! The engine is the conversational core of a food-ordering bot: it
//! owns the order conversation state machine, the menu cache, the
//! QR-payment flow, and the daily status rollover. Everything the bot
//! talks to over the wire (messenger, spreadsheet, bank) sits behind
//! narrow traits so any host can drive it.
//!
//! # Module structure
//!
//! ```text
//! order-engine/src/
//! ├── core/         # configuration
//! ├── utils/        # logger, clock, business-time helpers
//! ├── store/        # OrderStore trait + in-memory implementation
//! ├── catalog.rs    # menu cache with TTL refresh
//! ├── session/      # order conversation state machine (the core)
//! ├── payment/      # QR payment flow with bounded polling
//! └── scheduler.rs  # daily status rollover and rollup
//! ```

pub mod catalog;
pub mod core;
pub mod payment;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod utils;

// Re-export public types
pub use catalog::{CatalogError, JsonMenuSource, MenuCatalog, MenuSource};
pub use core::Config;
pub use payment::{PaymentError, PaymentFlow, PaymentProvider};
pub use scheduler::{DailySummary, RolloverScheduler};
pub use session::{OrderSession, SessionError, SessionRegistry, SessionState};
pub use store::{MemoryOrderStore, OrderStore, StoreError};
pub use utils::clock::{Clock, SystemClock};
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load .env, switch to the working directory and set up logging.
/// Must run before anything else in main.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();

    std::fs::create_dir_all(&config.work_dir)?;
    std::env::set_current_dir(&config.work_dir)?;

    let log_dir = format!("{}/logs", config.work_dir);
    std::fs::create_dir_all(&log_dir)?;
    init_logger_with_file(Some(&config.log_level), Some(&log_dir));

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ____          __
  / __ \_______/ /__  _____
 / / / / ___/ __  / _ \/ ___/
/ /_/ / /  / /_/ /  __/ /
\____/_/   \__,_/\___/_/
    ______            _
   / ____/___  ____ _(_)___  ___
  / __/ / __ \/ __ `/ / __ \/ _ \
 / /___/ / / / /_/ / / / / /  __/
/_____/_/ /_/\__, /_/_/ /_/\___/
            /____/
    "#
    );
}
