//! dbpriv CLI - operator tool for account privilege rules
//!
//! Wires configuration, logging and the storage backend to the rule service.

pub mod command;
pub mod model;
pub mod startup;
