//! simbridge-extender: the scheduler-extender protocol.
//!
//! An extender is an external scoring service consulted in two phases for
//! every job the scheduler places:
//!
//! ```text
//! POST {url}/filter      ExtenderArgs → FilterResult   (which nodes can run the job)
//! POST {url}/prioritize  ExtenderArgs → [HostPriority] (how much each survivor is preferred)
//! ```
//!
//! The scheduler talks to an extender through the [`Extender`] trait so a
//! scripted implementation can stand in during tests. [`HttpExtenderClient`]
//! is the real HTTP+JSON implementation, and [`mock`] serves the permissive
//! proof-of-concept extender (every node passes, every node scores 100).

pub mod client;
pub mod error;
pub mod mock;
pub mod protocol;

pub use client::{Extender, ExtenderFuture, HttpExtenderClient};
pub use error::{ExtenderCause, ExtenderError, ExtenderPhase, ExtenderResult};
pub use protocol::{ExtenderArgs, FilterResult, HostPriority, HostPriorityList};
