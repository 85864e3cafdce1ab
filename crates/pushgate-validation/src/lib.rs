//! API metadata compliance.
//!
//! A [`RuleBook`] holds one rule table per [`ProjectType`](pushgate_utils::types::ProjectType);
//! [`MetadataRuleEngine`] evaluates every rule of the selected table against
//! each metadata document and reports the full ordered result sequence.

pub mod engine;
pub mod error;
pub mod metadata;
pub mod rulebook;
pub mod rules;

pub use engine::{EngineState, MetadataReport, MetadataRuleEngine};
pub use error::MetadataParseError;
pub use metadata::{MetadataDocument, parse_metadata};
pub use rulebook::RuleBook;
pub use rules::{Condition, Predicate, Rule, builtin_rules};
