//! Pure domain logic for the lease-tracker suggestion pipeline.
//!
//! Nothing in this crate performs I/O. Storage is reached only through the
//! [`store::RecordStore`] port, implemented in `leasetrack-db`.

pub mod entity;
pub mod entity_validation;
pub mod error;
pub mod field_coercion;
pub mod order_key;
pub mod storage_error;
pub mod store;
pub mod suggestion;
pub mod types;
