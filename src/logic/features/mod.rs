//! Features Module - Feature Assembly
//!
//! Raw request input -> named features -> dense row in training order.

pub mod builder;
pub mod calendar;
pub mod schema;
pub mod vector;


// Re-export common types
pub use builder::{FeatureBuilder, FeaturePolicy};
pub use calendar::{parse_date, CalendarFeatures};
pub use vector::{assemble_vector, lookup, DefaultPolicy, FeatureMap, FeatureVector};
