pub mod aggregator;
pub mod classifier;
