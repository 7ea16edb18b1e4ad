//! Backup/store-copy collaborator interface.
//!
//! The harness only knows that a backup is "point it at an advertised
//! backup address, give it an empty destination directory, get a
//! classified error back". How the bytes move is the collaborator's
//! business.

mod store_copy;
pub use store_copy::*;


use std::net::SocketAddr;
use std::path::Path;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::BackupError;

/// Performs one store copy of a live member's durable state into
/// `dest`. Must never mutate cluster-visible state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupRunner: Send + Sync + 'static {
    async fn backup(
        &self,
        target: SocketAddr,
        dest: &Path,
    ) -> std::result::Result<(), BackupError>;
}
