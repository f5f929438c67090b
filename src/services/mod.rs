pub mod charts;
pub mod creators;
pub mod dataset;
pub mod gemini;
pub mod learning;
pub mod pipeline;
pub mod stats;
