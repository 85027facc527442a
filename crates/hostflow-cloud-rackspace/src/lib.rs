//! Rackspace provider for HostFlow
//!
//! This crate talks to the OpenStack Nova compute API over HTTPS, with
//! Keystone v2 identity (API key or password credentials).
//!
//! # Server Lifecycle
//!
//! - **create**: flavor and image are resolved by name, then `POST /servers`
//! - **start**: hard reboot
//! - **stop**: `os-stop`
//! - **delete**: `DELETE /servers/{id}`; the server is gone once Nova answers 404

pub mod client;
pub mod error;
pub mod identity;
pub mod nova;

pub use client::RackspaceClient;
pub use error::{RackspaceError, Result};
pub use identity::Session;
