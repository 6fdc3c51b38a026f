//! Protobuf messages and gRPC stubs for the Orisun event store.
//!
//! Two services are exposed:
//! - [`eventstore`]: `eventstore.EventStore` (save, query, catch-up subscriptions)
//! - [`admin`]: `orisun.Admin` (user management and counters)
//!
//! The code under `src/generated/` is produced from the schemas in
//! `proto/` and checked in, so building this crate never needs `protoc`.

#![deny(unsafe_code)]
// gRPC services return tonic::Status (176 bytes) - standard practice for gRPC error handling
#![allow(clippy::result_large_err)]

/// Messages and stubs for the `eventstore` protobuf package.
pub mod eventstore {
    #![allow(clippy::all)]
    #![allow(missing_docs)]

    include!("generated/eventstore.rs");
}

/// Messages and stubs for the `orisun` protobuf package (administration).
pub mod admin {
    #![allow(clippy::all)]
    #![allow(missing_docs)]

    include!("generated/orisun.rs");
}
