//! payee-reconciler - match bank-statement transactions to known contacts
//!
//! Brazilian statements identify the counterpart by a CPF (people, usually
//! masked as `***.123.456-**`) or a CNPJ (companies) plus a payee name. This
//! crate attaches each transaction to a contact from a flat-file directory,
//! resolves unknown companies through a public registry (with a persistent
//! cache), proposes links between registry names and contacts, and feeds the
//! registry data back into the directory for a second pass.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and run settings
//! - `error`: Custom error types
//! - `models`: Transactions, contacts, registry records, candidate links
//! - `storage`: Contact, alias and transaction files plus the registry cache
//! - `services`: Normalization, matching, registry client, run pipeline
//! - `audit`: Audit log of directory mutations
//! - `export`: CSV and JSON reports
//!
//! # Example
//!
//! ```rust,ignore
//! use payee_reconciler::config::{ReconPaths, Settings};
//! use payee_reconciler::services::{Pipeline, RegistryClient};
//! use payee_reconciler::storage::Storage;
//!
//! let paths = ReconPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths)?;
//! let client = RegistryClient::from_settings(storage.cache.clone(), &settings.registry)?;
//! let summary = Pipeline::new(&storage, &settings).run(&client)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{ReconError, ReconResult};
