//! Collection combinators: compose many promises into one aggregate.
//!
//! Each combinator wires a set of input promises (or promise generators)
//! into a single output promise:
//!
//! - [`all()`]: order-preserving join, first failure rejects the aggregate
//! - [`any()`]: first settlement wins, across both channels
//! - [`sequence()`]: strictly ordered execution, abort on first failure
//!
//! Inputs are never cancelled: a combinator that has already settled its
//! aggregate simply ignores the remaining inputs' eventual settlements.

pub mod all;
pub mod any;
pub mod sequence;

pub use all::all;
pub use any::any;
pub use sequence::{sequence, Generator};
