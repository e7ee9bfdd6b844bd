//! # Middleware Module
//!
//! Middleware runs before the route handlers and can short-circuit a request.
//!
//! ## Our Middleware
//! - `auth`: Checks if user is logged in (has valid session)

pub mod auth;
