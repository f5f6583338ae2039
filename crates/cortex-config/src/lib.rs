//! Configuration and `.cx/` directory discovery for the cortex engine.

pub mod config;
pub mod cx_dir;

pub use config::{
    load_config, save_config, BudgetConfig, BudgetMode, ConfigError, CxConfig, DeadConfig,
    ExpandConfig, MetricsConfig,
};
pub use cx_dir::{create_cx_dir, find_cx_dir, CONFIG_FILE_NAME, CX_DIR_NAME, DB_FILE_NAME,
    PRIME_FILE_NAME};
