//! Elastic Weight Consolidation++ support.
//!
//! The online EWC variant here keeps a running diagonal Fisher estimate
//! with periodic decay, so pattern importance can weigh "how disruptive
//! would forgetting this be" per embedding dimension.

mod fisher;

pub use fisher::FisherMatrix;
