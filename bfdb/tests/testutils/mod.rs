//! Test utilities for bfdb integration tests
//!
//! - TestFixture: a graph over a counting in-memory adapter, or over sled
//! - CountingAdapter: storage wrapper that counts calls and can fail writes
//! - sample_types: props types used across the suites

#![allow(dead_code)]

pub mod counting_adapter;
pub mod sample_types;
pub mod test_fixture;
