mod suppression;

pub use suppression::{SuppressionDoc, SuppressionError, SuppressionStore};
