//! schemastore - schema-validated entity storage
//!
//! Operators declare a field schema per service (resource type); payloads
//! are validated against it before being persisted through one of several
//! interchangeable storage backends.

pub mod cli;
pub mod config;
pub mod schema;
pub mod service;
pub mod storage;
