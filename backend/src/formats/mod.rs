//! Package format handlers.

pub mod helm;
