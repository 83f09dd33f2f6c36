//! # Services module
//!
//! This module provide services to interact with the rackspace apis, the user
//! and helpers to provision cloud databases.
pub mod cfg;
pub mod output;
pub mod prompt;
pub mod provision;
pub mod rackspace;
