//! Flock Server
//!
//! Multi-tenant church management backend: role hierarchy and permission
//! matrix, local-church tenant isolation, and a capacity-bounded event RSVP
//! ledger with a FIFO waitlist.

pub mod api;
pub mod auth;
pub mod churches;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod members;
pub mod permissions;
pub mod tenancy;
