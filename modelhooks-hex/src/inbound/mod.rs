//! HTTP Inbound Adapter
//!
//! The Axum pipeline: middleware stack, error chain and the generic
//! resource routes exposing models.

mod errors;
mod handlers;
mod middleware;
mod server;

pub use errors::{HttpError, RaisedError, api_not_found, render_api_error};
pub use handlers::{health, resource_routes};
pub use middleware::{Cookies, METHOD_OVERRIDE_HEADER, security_headers};
pub use server::{DEFAULT_BODY_LIMIT, HttpServer, Pipeline, PipelineConfig};
