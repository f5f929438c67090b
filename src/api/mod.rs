pub mod analysis;
pub mod charts;
pub mod creators;
pub mod dataset;
pub mod videos;
