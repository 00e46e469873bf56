//! # charla-responder
//!
//! Reply generation for Charla: keyword classification, Spanish reply
//! catalogs, and a simulated thinking delay.

#![deny(unsafe_code)]

pub mod catalog;
pub mod classify;
pub mod errors;
pub mod latency;
pub mod responder;

pub use classify::{Category, classify};
pub use errors::ResponderError;
pub use latency::Latency;
pub use responder::{KeywordResponder, Responder};
