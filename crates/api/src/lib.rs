//! HTTP API: server, routing, and request/response mapping for the battle
//! pipeline.

pub mod app;
