//! KolekTrash companion service.
//!
//! Client-side logic of the KolekTrash waste-collection system: the barangay
//! directory (filter, search and multi-select), the driver assignment
//! acknowledgement flow and the collector profile endpoints. The remote PHP
//! API owns persistence and business rules; this crate talks to it through
//! [`api::KolekApi`] and exposes the flows over a small actix-web server and
//! a command-line mode.

pub mod api;
pub mod assignments;
pub mod collector;
pub mod config;
pub mod directory;
pub mod display;
pub mod error;
pub mod id;
pub mod session;
pub mod web;

pub use error::{Error, Result};
pub use id::Id;
