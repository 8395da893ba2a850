//! Home Assistant Built-in Components
//!
//! Integrations built on the entity platform. Each integration lives in its
//! own module and exposes an `async_setup` entry point.

pub mod ecobee;
