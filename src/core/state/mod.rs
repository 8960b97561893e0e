// Mapping checkpoints for resumable clones

pub mod manager;

pub use manager::{checkpoint_key, CheckpointManager};
