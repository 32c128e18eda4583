//! Multi-node client of the Greenfield chain for the challenger.

#![doc = include_str!("../README.md")]
#![deny(clippy::nursery, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod alert;
pub mod channel;
pub mod config;
pub mod error;
pub mod executor;
pub mod grpc;
pub mod handle;
pub mod identity;
pub mod light_block;
pub mod metrics;
pub mod monitor;
pub mod pool;
pub mod retry;
pub mod rpc;
pub mod validators;

#[cfg(test)]
mod testing;

pub use account::{Account, AccountRegistry};
pub use alert::{AlertSink, LogAlertSink};
pub use channel::{QueryChannel, StatusChannel, ValidatorRecord};
pub use config::ChallengerConfig;
pub use error::{ConfigError, NodeError};
pub use executor::Executor;
pub use handle::NodeHandle;
pub use identity::Identity;
pub use monitor::{HealthMonitor, MonitorConfig, TickReport};
pub use pool::ClientPool;
pub use retry::RetryPolicy;
pub use validators::{ValidatorCache, ValidatorSource};
