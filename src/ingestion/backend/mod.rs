//! Physical source backends.
//!
//! [`Backend`] is a closed set: one struct per physical source kind. A backend either hands
//! back raw payload bytes (to be decoded by format) or, for databases, a finished table.

pub mod database;
pub mod filesystem;
pub mod object_store;

use bytes::Bytes;

use crate::error::IngestionResult;
use crate::types::DataSet;

use super::descriptor::{SourceDescriptor, SourceKind};

pub use database::DatabaseBackend;
pub use filesystem::FilesystemBackend;
pub use object_store::ObjectStoreBackend;

/// What a backend produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Raw serialized bytes of a file or object.
    Payload(Bytes),
    /// A fully materialized result set.
    Table(DataSet),
}

/// A source backend.
#[derive(Debug)]
pub enum Backend {
    Filesystem(FilesystemBackend),
    ObjectStore(ObjectStoreBackend),
    Database(DatabaseBackend),
}

impl Backend {
    /// Select and set up the backend for `descriptor`.
    ///
    /// Object-store clients are built here, so credential and feature errors surface as
    /// [`crate::IngestionError::BackendConnection`] before any transfer starts.
    pub fn for_source(descriptor: &SourceDescriptor) -> IngestionResult<Self> {
        Ok(match descriptor.kind() {
            SourceKind::Local => Self::Filesystem(FilesystemBackend::new(descriptor.location())),
            SourceKind::S3 | SourceKind::Azure => {
                Self::ObjectStore(ObjectStoreBackend::connect(descriptor)?)
            }
            SourceKind::Database => Self::Database(DatabaseBackend::from_descriptor(descriptor)?),
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Filesystem(_) => SourceKind::Local,
            Self::ObjectStore(b) => b.kind(),
            Self::Database(_) => SourceKind::Database,
        }
    }

    /// Retrieve the whole source.
    pub fn fetch(&self, descriptor: &SourceDescriptor) -> IngestionResult<Fetched> {
        match self {
            Self::Filesystem(b) => b.fetch().map(Fetched::Payload),
            Self::ObjectStore(b) => b.fetch().map(Fetched::Payload),
            Self::Database(b) => b.fetch(descriptor.schema()).map(Fetched::Table),
        }
    }
}
