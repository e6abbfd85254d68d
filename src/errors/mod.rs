// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod pipeline;
mod pool;
mod registry;

pub use config::{ConfigError, ValidationError};
pub use pipeline::PipelineError;
pub use pool::PoolError;
pub use registry::RegistryError;
