//! HTTP request handlers.

pub mod websocket;
