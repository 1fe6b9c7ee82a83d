//! Supervision of external processes.
//!
//! A [`ProcessApplication`] describes what to run and how to handle its output.
//! [`spawn`] launches it and returns a [`ManagedProcess`] handle that can be
//! waited on or shut down.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_init_process::{ProcessApplication, Result, spawn};
//!
//! struct Sleeper;
//!
//! impl ProcessApplication for Sleeper {
//!     fn args(&self) -> Vec<String> {
//!         vec!["60".to_string()]
//!     }
//!
//!     fn executable(&self) -> &str {
//!         "/bin/sleep"
//!     }
//!
//!     fn name(&self) -> &str {
//!         "sleeper"
//!     }
//! }
//!
//! async fn run() -> Result<()> {
//!     let process = spawn(Sleeper).await?;
//!
//!     process.shutdown().await;
//!
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod application;
mod error;
mod spawn;

pub use application::ProcessApplication;
pub use error::{Error, Result};
pub use nix::sys::signal::Signal;
pub use spawn::{ManagedProcess, spawn};
