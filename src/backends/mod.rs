// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processor implementations.
//!
//! # Available Backends
//!
//! ## Local Backend
//! Built-in in-process processors, registered under these names:
//! - **relay**: forwards each message unchanged to its single output sink, or drops it
//!   when no sink is wired
//! - **shard_router**: forwards each message to the output sink indexed by the inbound
//!   channel's consumer shard; an out-of-range shard is fatal
//! - **sink**: releases every message
//! - **printer**: emits a delivery record (channel, producer, consumer, key, value) and
//!   releases the message
//!
//! ## Stub Backend (Test-Only)
//! Recording, failing, panicking and batching processors used by the engine tests.
//! **Note**: NOT available in production builds
//!
//! # Architecture
//!
//! ```text
//! Registry name → Factory → Processor Instance → Task
//! ```
//!
//! # Example
//! ```rust
//! use shardflow::backends::local::LocalProcessorFactory;
//! use shardflow::config::ProcessorRegistry;
//!
//! let mut registry = ProcessorRegistry::new();
//! LocalProcessorFactory::register_all(&mut registry);
//! let processor = registry.create("shard_router").unwrap();
//! assert_eq!(processor.name(), "shard_router");
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
