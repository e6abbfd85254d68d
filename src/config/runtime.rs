// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::config::{load_and_validate_config, PipelineConfig, ProcessorRegistry};
use crate::engine::Pipeline;
use crate::errors::PipelineError;

/// Pipeline runtime builder - turns a descriptor into an assembled [`Pipeline`].
///
/// # Examples
///
/// ## Building a pipeline from a descriptor
/// ```
/// use shardflow::config::{PipelineConfig, ProcessorRegistry, RuntimeBuilder};
///
/// let config: PipelineConfig = serde_yaml::from_str(r#"
/// executor: { workers: 2, queue_capacity: 4 }
/// tasks:
///   - { name: relay, processor: relay }
///   - { name: sink, processor: sink }
/// channels:
///   - { id: in, to: { task: relay } }
///   - { id: out, from: { task: relay }, to: { task: sink } }
/// "#).unwrap();
///
/// let registry = ProcessorRegistry::with_builtins();
/// let mut pipeline = RuntimeBuilder::from_config(&config, &registry)?;
/// pipeline.start()?;
/// let summary = pipeline.stop()?;
/// assert_eq!(summary.delivered, 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Assemble a pipeline from an already loaded descriptor.
    pub fn from_config(
        cfg: &PipelineConfig,
        registry: &ProcessorRegistry,
    ) -> Result<Pipeline, PipelineError> {
        Pipeline::assemble(cfg, registry)
    }

    /// Load, validate and assemble a descriptor file using the built-in processors.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Pipeline> {
        let cfg = load_and_validate_config(path)?;
        let registry = ProcessorRegistry::with_builtins();
        Ok(Self::from_config(&cfg, &registry)?)
    }
}
