//! Service layer for the reconciler
//!
//! Matching logic on top of the storage layer: identifier normalization,
//! name tokenization, the contact directory, the registry client, the
//! reconciliation engine and the run pipeline tying them together.

pub mod aliases;
pub mod directory;
pub mod extractor;
pub mod linking;
pub mod normalizer;
pub mod pipeline;
pub mod reconciliation;
pub mod registry;
pub mod tokenizer;

pub use directory::{ContactDirectory, IdentifierMatch, NameMatch};
pub use extractor::{scan, DescriptionDetails, ExtractedIdentifier, IdentifierSource};
pub use normalizer::IdentifierKind;
pub use pipeline::{LookupSummary, Pipeline, ReconciliationSummary};
pub use reconciliation::{PassOutcome, ReconciliationEngine};
pub use registry::{
    BatchOutcome, BrasilApiSource, CnpjaSource, LookupOrigin, RegistryClient, RegistrySource,
    UnconfiguredSource,
};
pub use tokenizer::{NameMatcher, NameTokenizer};
