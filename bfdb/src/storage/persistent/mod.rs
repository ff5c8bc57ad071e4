// Copyright (c) 2024-2025 bfdb Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Key/value storage drivers
//!
//! Trait-based abstractions over embedded key-value stores, so the KV
//! storage adapter can persist records in any of them.
//!
//! ```text
//! KvStorageAdapter (DbItem records)
//!     ↓
//! StorageDriver / StorageTree (key-value abstraction)
//!     ↓
//! Concrete Implementations (Sled, Memory)
//! ```

pub mod factory;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

pub use factory::create_storage_driver;
pub use traits::{StorageDriver, StorageTree};
pub use types::{StorageDriverError, StorageResult, StorageType};
