//! Shared types, errors, and configuration for GL Budget.
//!
//! This crate provides common types used across all other crates:
//! - Typed numeric keys for ledgers, budgets and GLM rows
//! - Role and permission model carried in access tokens
//! - JWT validation
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::{Claims, Permission, Role};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
