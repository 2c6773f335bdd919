// src/lib.rs
//!
//! trapwire — honeypot threat-intelligence collector.
//!
//! The crate's core is the [`forensics`] module: the attack-aggregation and
//! scoring pipeline that turns captured HTTP/SSH request records into scored,
//! tiered candidate attacks. The binary in `main.rs` is a thin operator CLI
//! over the same library.

pub mod error;
pub mod forensics;
pub mod logging;

pub use error::{Result, TrapwireError};
