//! Signal Broker - pairing broker and signaling relay
//!
//! This crate provides:
//! - Sessions with one primary participant and a pool of waiting candidates
//! - Selection of one candidate as the primary's peer
//! - Server-sent push channels with heartbeats and disconnect teardown
//! - Relaying of opaque signaling payloads between the paired participants

pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;
pub mod state;
