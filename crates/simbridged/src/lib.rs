//! simbridged: assembly of the scheduling bridge.
//!
//! [`config`] loads the daemon configuration; [`bridge`] wires the store,
//! extender client, scheduling engine, reconciler and API router together
//! and runs them until shutdown.

pub mod bridge;
pub mod config;
