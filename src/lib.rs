pub mod config;
pub mod logging;
pub mod migration;
pub mod store;
pub mod sync;
