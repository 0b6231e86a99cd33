pub mod config;
pub mod conflict;
pub mod domain;
pub mod error;
pub mod holds;
pub mod lineup;
pub mod logging;
pub mod machine;
pub mod service;
pub mod store;
