//! Email Routing Manager
//!
//! Keeps several Cloudflare account configurations, lists their zones, and
//! creates or deletes Email Routing forwarding rules while mirroring the
//! created rules in a local SQLite table.

pub mod cloudflare;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod store;
pub mod validation;

pub use cloudflare::{CloudflareClient, EmailRoutingApi};
pub use config::ServerConfig;
pub use server::{build_router, AppState};
pub use store::Store;
