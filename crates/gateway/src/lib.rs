//! Remote gateway to the spreadsheet-backed transaction service.
//!
//! Implements the [`tally_core::RemoteGateway`] and
//! [`tally_core::ReachabilityProbe`] seams: JSON reads normalized into
//! the domain model, degraded-response writes, and an active
//! connectivity probe.

mod client;
mod probe;
mod wire;

pub use client::SheetClient;
pub use probe::{HttpProbe, DEFAULT_PROBE_URL};
