//! Business records kept in a key-value ledger: fraud entries with hand-built
//! secondary indexes and SLA contracts with a staged approval workflow.

pub mod clock;
pub mod config;
pub mod contract;
pub mod error;
pub mod fraud;
pub mod id;
pub mod index;
pub mod ledger;
pub mod service;
pub mod telemetry;
pub mod utils;
pub mod workflow;
