// LLM abstraction layer

pub mod google;
pub mod provider;

#[cfg(test)]
pub(crate) mod scripted;

pub use provider::*;
pub use crate::types::*;
