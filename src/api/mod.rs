//! HTTP layer: the request pipeline, route groups and their handlers.
//!
//! # Modules
//!
//! - [`pipeline`] - Fixed-order stage orchestration for every request
//! - [`middleware`] - The individual pipeline stages
//! - [`routes`] - Route group registration and dispatch table
//! - [`handlers`] - Reference route group handlers
//! - [`dto`] - Data Transfer Objects for request/response serialization

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod routes;
