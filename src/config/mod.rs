//! Configuration modules for the Ehtimami API.
//!
//! Each submodule handles one aspect of configuration, loaded from
//! environment variables at process start:
//!
//! - [`cors`]: allowed origins
//! - [`database`]: PostgreSQL connection pool
//! - [`email`]: SMTP credentials for notification dispatch
//! - [`jwt`]: token signing secret and expiry
//! - [`server`]: listen port

pub mod cors;
pub mod database;
pub mod email;
pub mod jwt;
pub mod server;
