mod collector_config;
pub use collector_config::*;
mod collectors_cache;
pub use collectors_cache::*;
