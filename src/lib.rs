// Brokerage Commission Simulator - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod bootstrap;      // Startup migration + split seeding
pub mod calculator;     // Commission calculation engine
pub mod config;
pub mod db;
pub mod entities;       // Schemes, distributors, commission split
pub mod error;
pub mod logging;
pub mod tenures;        // Merged tenure lookup
pub mod validation;

#[cfg(feature = "server")]
pub mod api;            // REST API (axum)

// Re-export commonly used types
pub use bootstrap::{bootstrap, BootstrapReport, SeedSource};
pub use calculator::{calculate, compute_breakdown, resolve_rate, CalculationRequest, CommissionBreakdown};
pub use config::{ServerConfig, StorageConfig};
pub use db::{open_database, setup_database};
pub use entities::{
    CommissionSplit, Distributor, DistributorInput, GstMode, NewScheme, PayoutMode,
    RateField, RateMap, Scheme, SchemeUpdate, SplitInput, UpsertOutcome,
};
pub use error::{Result, SimulatorError};
pub use logging::init_logging;
pub use tenures::{merged_tenures, tenures_for_scheme, SchemeTenures};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
