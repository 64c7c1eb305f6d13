//! gcore-dns01 - ACME DNS-01 challenge solver for the G-Core DNS API
//!
//! Architecture:
//! - Zone resolution by longest-suffix lookup against the provider account
//! - Read-merge-write reconciliation of the challenge TXT record set
//! - Provider seam (`DnsProvider`) with a G-Core adapter and an in-memory one
//! - axum webhook surface plus a one-shot CLI with retry

pub mod challenge;
pub mod config;
pub mod constants;
pub mod error;
pub mod gcore;
pub mod metrics;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod server;
pub mod validation;
pub mod zone;

pub use challenge::{ChallengeRequest, ChallengeSolver, SolverConfig};
pub use error::{ChallengeError, ErrorKind, ProviderError, Step};
pub use provider::{DnsProvider, RecordSet, RecordType, Zone};
pub use reconciler::{Reconciled, Reconciler};
