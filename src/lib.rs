#![forbid(unsafe_code)]

//! Cycle projection engine and local state container for the Flora tracker.
//!
//! The engine in [`prediction`] is pure: every function takes the settings,
//! cycle history and an explicit "today" and returns fresh values. State
//! transitions and persistence live in [`commands`] and [`storage`].

pub mod calendar;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod models;
pub mod prediction;
pub mod storage;

pub use commands::Tracker;
pub use config::Config;
pub use error::{Error, Result};
pub use models::*;
pub use prediction::{compute_stats, phase_for_date};
