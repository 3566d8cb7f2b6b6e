//! Storage Adapter Abstraction
//!
//! One contract, implemented against two structurally different data
//! models. Each adapter owns its connection resource and normalizes
//! its native record shape into the canonical [`User`].
//!
//! ```text
//! ┌─────────────────────┐
//! │     HTTP layer      │
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   StorageAdapter    │  <-- Trait
//! │      (async)        │
//! └──────────┬──────────┘
//!            │
//!     ┌──────┴──────┐
//!     │             │
//! ┌───▼────┐  ┌─────▼─────┐
//! │MongoDB │  │    SQL    │
//! │Adapter │  │  Adapter  │
//! └────────┘  └───────────┘
//! ```
//!
//! Backends are selected at build time by the `store-mongodb` and
//! `store-sql` features and at run time by [`create_adapter`].

mod factory;
mod traits;

pub use factory::{create_adapter, StoreKind};
pub use traits::*;

#[cfg(feature = "store-mongodb")]
mod mongodb_adapter;

#[cfg(feature = "store-mongodb")]
pub use mongodb_adapter::DocumentStoreAdapter;

#[cfg(feature = "store-sql")]
mod sql_adapter;

#[cfg(feature = "store-sql")]
pub use sql_adapter::RelationalStoreAdapter;
