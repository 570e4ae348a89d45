//! HTTP clients for the bridge's upstream services

pub mod auth;
pub mod gateway;
pub mod shadow;
