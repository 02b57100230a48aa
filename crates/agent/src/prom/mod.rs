mod client;
mod model;

pub use client::{PromClient, PromError};
pub use model::{InstantQueryResponse, SeriesLabels, VectorSample};
