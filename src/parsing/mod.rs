//! Derivation of node pins from Python function source text.

pub mod signature;
