//! HTTP handlers for the relay service.

pub mod chat;
pub mod health;
