//! AI Governance Proof (AIGP) core
//!
//! Cryptographic proof that an AI agent used specific governed resources
//! (policies, prompts, tools, memory, models, ...) when it acted, emitted
//! onto the agent's existing tracing spans.
//!
//! ## Features
//!
//! - **Governance hashes**: SHA-256 over content, domain-separated leaf
//!   hashes, and a sorted-pair Merkle root for multi-resource proofs
//! - **Event records**: the fixed 0.8.0 governance event schema with
//!   correlation identifiers taken from the active span
//! - **Signatures**: ES256 compact JWS over the canonical event
//!   (`signing` feature)
//! - **Dual/triple emit**: span event, governance store sink, and lineage
//!   sink from a single call, with a gap-free per-trace sequence number
//! - **Propagation**: the `aigp` tracestate vendor entry and allow-listed
//!   baggage keys, decoded from inbound requests by [`InboundGovernance`]
//! - **Metrics**: Prometheus counters for emission and sink failures
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aigp_core::{EmitOptions, EmitterConfig, GovernanceEmitter, JsonLinesSink};
//! use aigp_span::RecordingTracer;
//!
//! let tracer = Arc::new(RecordingTracer::new());
//! let config = EmitterConfig::builder("agent.trading-bot-v2")
//!     .org("org.finco", "FinCo")
//!     .build();
//! let emitter = GovernanceEmitter::new(config, tracer.clone())
//!     .with_event_sink(JsonLinesSink::new(std::io::stdout()));
//!
//! let _span = tracer.start_span("invoke_agent");
//! let event = emitter.inject_success(
//!     "policy.trading-limits",
//!     4,
//!     "max position: 10000",
//!     EmitOptions::new().classification("confidential"),
//! );
//! assert_eq!(event.sequence_number, 1);
//! ```

pub mod attributes;
pub mod baggage;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod hash;
pub mod inbound;
pub mod lineage;
pub mod merkle;
pub mod metrics;
pub mod signing;
pub mod tracestate;

pub use config::{EmitterConfig, EmitterConfigBuilder};
pub use emitter::{
    span_attributes, EmitOptions, EventSink, GovernanceEmitter, JsonLinesSink, LineageSink,
    PolicyRef, SequenceCounter,
};
pub use error::{AigpError, Result};
pub use event::{Annotations, EventBuilder, EventType, GovernanceEvent, SPEC_VERSION};
pub use hash::{governance_hash, GovernedResource, HashAlgorithm, HashMode, ResourceSpec};
pub use inbound::InboundGovernance;
pub use lineage::{GovernanceRunFacet, ResourceInputFacet, RunEvent, RunEventType};
pub use merkle::{MerkleLeaf, MerkleTree};
pub use metrics::EmitterMetrics;
pub use signing::{sign_event, verify_event, verify_json, SigningKey, VerifyingKey};
pub use tracestate::GovernanceTraceState;

/// Crate version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
