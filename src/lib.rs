// Broker topic grammar and the event kind / entity type vocabulary
pub mod topic;

// Entity attributes and resolution
pub mod entity;

// Context store client (current-state documents)
pub mod context;

// History store client (append-only event log)
pub mod history;

// Access-control oracle client
pub mod ledger;

// MQTT connection, publisher seam and receive loop
pub mod broker;

// The per-event-kind ingestion pipeline
pub mod pipeline;

// Inbound message classification and routing
pub mod dispatch;

// HTTP boundary (About / Rules)
pub mod api;

// Periodic self-telemetry
pub mod life;

// TOML configuration
pub mod config;

// Error taxonomy
pub mod error;
