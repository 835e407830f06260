//! Core data models for the reconciler
//!
//! This module contains the data structures of the reconciliation domain:
//! statement transactions, contacts, registry records and candidate links.

pub mod alias;
pub mod contact;
pub mod link;
pub mod money;
mod nullable;
pub mod registry;
pub mod transaction;

pub use alias::{AliasConflict, AliasEntry, IntegrationReport};
pub use contact::{Contact, ContactChange, Partner};
pub use link::{CandidateLink, LinkType};
pub use money::Money;
pub use registry::{LookupFailure, RegistryRecord};
pub use transaction::{MatchMethod, MatchStatus, Transaction, TransactionType};
