//! # HRMS API Server Library
//!
//! Multi-tenant HR management API: organisation structure, employees,
//! rosters and attendance, users and permissions, CSV import/export.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error envelope and HTTP status mapping
//! - `middleware`: JWT authentication and security headers
//! - `response`: Success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
