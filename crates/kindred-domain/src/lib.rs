//! Kindred Domain Layer
//!
//! This crate contains the core data model and the pure rules of the Kindred
//! relationship graph. It depends only on `uuid` and defines the value types,
//! inference rules and trait interfaces that the store, engine and CLI build on.
//!
//! ## Key Concepts
//!
//! - **Person**: an identity record owning its typed direct-relation edges
//! - **Family cluster**: a connected-component label that partitions persons
//! - **Connection request**: a proposed edge awaiting multi-party approval
//! - **Relation rules**: inverse and implied-relation tables over seven types
//! - **Change set**: versioned writes the store commits atomically
//!
//! ## Architecture
//!
//! - Arena-style records: persons reference each other by id only
//! - Closed enums for relation types and sex, matched exhaustively
//! - Storage is injected through [`traits::KinshipStore`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod id;

pub mod changes;
pub mod cluster;
pub mod edges;
pub mod person;
pub mod projection;
pub mod relation;
pub mod request;
pub mod traits;

// Re-exports for convenience
pub use changes::{Change, ChangeSet, CommitConflict, CommitOutcome, EntityRef};
pub use cluster::{ClusterId, FamilyCluster};
pub use edges::DirectRelations;
pub use person::{NewPerson, Person, PersonId, PersonSummary, Sex};
pub use projection::{LayoutParams, PlacedRelative};
pub use relation::{derive_implied_relation, inverse_of, RelationType, UnsupportedRelation};
pub use request::{ConnectionRequest, RequestId, RequestStateError, RequestStatus};
pub use traits::{KinshipStore, RequestQuery};
