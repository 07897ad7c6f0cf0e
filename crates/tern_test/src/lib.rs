//! Helpers for testing against a mock SSE backend.

pub mod mock;
pub mod sse;
