//! `relieftrack-store` - client for the hosted tabular data API
//!
//! This library speaks the REST dialect of the hosted relational store that
//! backs relieftrack: table and view reads with equality filters and
//! ordering, inserts with selectable return preference, and partial updates
//! filtered by equality predicates. It knows nothing about the schema; the
//! domain crate owns table names and row shapes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;

pub use client::{InsertRequest, Order, ReturnPreference, SelectRequest, StoreClient, UpdateRequest};
pub use error::{Result, StoreError};
