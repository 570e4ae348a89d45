//! Credential lifecycle

pub mod token;
pub mod token_mngr;
