// Storynova: premise in, illustrated read-aloud children's story out.
//
// The hosting web layer calls the `commands` facade; everything below it is
// organized as provider services plus the pure reading-analysis core.

pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod reading;
pub mod services;
pub mod utils;

pub use commands::AppState;
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
