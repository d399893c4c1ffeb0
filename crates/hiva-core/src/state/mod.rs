//! Shared application state.
//!
//! Holds the approximate cart size shown as a badge. The counter is an
//! explicit handle passed to whoever needs it; clones share one value.

pub mod cart;

pub use cart::{CartCount, CartCounter, LoadPhase};
