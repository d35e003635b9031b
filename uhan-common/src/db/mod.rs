//! Database setup

pub mod init;

pub use init::*;
