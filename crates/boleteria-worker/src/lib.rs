//! Background lock maintenance for the boletería.
//!
//! This crate provides:
//! - An expiry sweep that flags soon-to-expire seat locks and deletes
//!   lapsed ones, so abandoned sessions release their seats
//! - A cron scheduler that runs the sweep on a fixed schedule
//!
//! The sweep runs server side. Sessions that are still alive keep
//! their seats ahead of it by extending their holds; only locks whose
//! owner stopped extending are reaped.

pub mod scheduler;
pub mod sweep;

pub use scheduler::ReaperScheduler;
pub use sweep::{ExpirySweep, SweepReport};
