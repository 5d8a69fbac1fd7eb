// Library root: re-exports all modules so integration tests and the driver
// binary can access the engine's public API.

pub mod config;
pub mod constants;
pub mod loaders;
pub mod metrics;
pub mod model;
pub mod population;
