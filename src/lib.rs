// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // processor backends
pub mod config;     // descriptors + registry
pub mod engine;     // thread pool, dispatcher, pipeline
pub mod errors;     // error handling
pub mod model;      // messages, channels, tasks
pub mod observability;
pub mod traits;     // processor capability
