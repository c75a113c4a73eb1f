//! Criteria sets and weak-criterion selection.
//!
//! A criteria set is an ordered list of named natural-language rules, loaded
//! from YAML/JSON and validated against JSON Schema.

mod parser;
mod schema;
mod selection;

pub use parser::{CriteriaError, CriteriaSet, Criterion};
pub use schema::validate_criteria_schema;
pub use selection::{WeaknessPolicy, WeightedCriterion};
