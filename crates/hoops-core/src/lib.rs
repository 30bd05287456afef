//! Core types and pure computations for the hoops league tracker.
//!
//! This crate is deliberately free of database and I/O dependencies. The
//! rating engine and the combo aggregator operate on in-memory snapshots of
//! the game log; storage backends implement [`store::LeagueStore`].

pub mod combo;
pub mod error;
pub mod game;
pub mod history;
pub mod player;
pub mod rating;
pub mod store;

pub use error::{Error, Result};
