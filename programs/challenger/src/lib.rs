//! The challenger program: command line, logging setup and the metrics
//! endpoint around [`challenger_executor`].

#![deny(clippy::nursery, clippy::pedantic, missing_docs)]

pub mod cli;
pub mod metrics;
pub mod observability;
pub mod query;
