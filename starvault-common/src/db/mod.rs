//! Metadata store setup

pub mod init;

pub use init::*;
