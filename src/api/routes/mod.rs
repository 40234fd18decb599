//! API Routes
//!
//! Route handlers organized by functionality.

pub mod auth;
pub mod chat;
pub mod discovery;
pub mod events;
pub mod health;
