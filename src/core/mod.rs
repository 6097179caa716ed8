// src/core/mod.rs

/// Data structures shared by the scanners, the HTTP API and the UI.
pub mod models;

/// Static reference tables: ports, services, risky exposures, subdomain wordlist.
pub mod knowledge_base;

pub mod target;

/// Bounded worker pool every fan-out goes through.
pub mod scheduler;

/// Process-wide TTL cache for reputation verdicts and DNS resolutions.
pub mod cache;

pub mod dns;
pub mod context;

/// TCP port scanning and the combined reconnaissance run used by the UI.
pub mod scanner;

/// Reputation providers and the aggregator that combines them.
pub mod reputation;

/// Subdomain candidate generation and resolution.
pub mod subdomain;
