//! # TeamBoard API Server Library
//!
//! Multi-tenant project and task management over REST: organizations with
//! role-based membership, projects, tasks with filtering and a drag-and-drop
//! board, notifications, and an activity log.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Request ID middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
