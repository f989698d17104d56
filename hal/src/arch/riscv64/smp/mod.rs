//! # Hart Identification
//!
//! Every trap-path object that holds per-hart state is keyed by [`HartId`].

pub mod hartid;

pub use hartid::HartId;
