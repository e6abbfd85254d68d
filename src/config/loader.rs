// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS_FALLBACK,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Pipeline descriptor.
///
/// Names the tasks to instantiate, the processor each one is bound to, how many shards
/// each task is split into, and the channel graph wiring task ports together.
///
/// # Fields
/// * `executor` - Thread pool sizing (optional)
/// * `tasks` - Declared stages; a stage with `shards: N > 1` becomes N task instances
/// * `channels` - Channel graph; a channel without `from` is an external input
///
/// # Example
/// ```yaml
/// executor:
///   workers: 4
///   queue_capacity: 64
/// tasks:
///   - name: mapper
///     processor: relay
///   - name: printer
///     processor: printer
/// channels:
///   - id: in
///     to: { task: mapper }
///   - id: out
///     from: { task: mapper }
///     to: { task: printer }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub executor: ExecutorOptions,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

/// Thread pool sizing.
///
/// # Fields
/// * `workers` - Worker thread count (defaults to available parallelism)
/// * `queue_capacity` - Maximum queued-but-unstarted units (defaults to 256)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorOptions {
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
}

impl ExecutorOptions {
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKERS_FALLBACK)
        })
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }
}

/// A declared stage.
///
/// # Example
/// ```yaml
/// name: reducer
/// processor: shard_router
/// shards: 3
/// params:
///   format: json
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    pub processor: String,
    #[serde(default = "default_shards")]
    pub shards: usize,
    #[serde(default)]
    pub params: HashMap<String, serde_yaml::Value>, // processor-specific options
}

fn default_shards() -> usize {
    1
}

impl TaskConfig {
    /// Task instance names: the stage name itself, or `name.0 .. name.{N-1}` when sharded.
    ///
    /// ```
    /// use shardflow::config::TaskConfig;
    /// use std::collections::HashMap;
    ///
    /// let task = TaskConfig {
    ///     name: "mapper".to_string(),
    ///     processor: "relay".to_string(),
    ///     shards: 2,
    ///     params: HashMap::new(),
    /// };
    /// assert_eq!(task.instance_names(), vec!["mapper.0", "mapper.1"]);
    /// ```
    pub fn instance_names(&self) -> Vec<String> {
        if self.shards == 1 {
            vec![self.name.clone()]
        } else {
            (0..self.shards)
                .map(|i| format!("{}.{}", self.name, i))
                .collect()
        }
    }
}

/// A channel between two task ports, or from outside the pipeline into a task.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub id: String,
    pub from: Option<EndpointConfig>,
    pub to: EndpointConfig,
}

/// One end of a channel.
///
/// `port` defaults to `output` on the producing side and `input` on the consuming side.
/// `shard` is the slot index; on the consuming side it is the routing key read by
/// shard-aware processors.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub task: String,
    pub port: Option<String>,
    #[serde(default)]
    pub shard: usize,
}

impl EndpointConfig {
    pub fn port_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.port.as_deref().unwrap_or(default)
    }
}

impl ChannelConfig {
    pub fn producer_port(&self) -> Option<&str> {
        self.from.as_ref().map(|f| f.port_or(DEFAULT_OUTPUT_PORT))
    }

    pub fn consumer_port(&self) -> &str {
        self.to.port_or(DEFAULT_INPUT_PORT)
    }
}

/// Load a descriptor from a YAML file, or TOML when the extension is `.toml`
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

/// Load a descriptor and validate it.
///
/// All validation errors are collected into a single [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_pipeline(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
executor:
  workers: 2
tasks:
  - name: mapper
    processor: relay
    shards: 2
  - name: sink
    processor: sink
channels:
  - id: in
    to: { task: mapper.0 }
  - id: m0
    from: { task: mapper.0 }
    to: { task: sink, shard: 1 }
"#;

        let cfg: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.executor.workers(), 2);
        assert_eq!(cfg.executor.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(cfg.tasks.len(), 2);
        assert_eq!(cfg.tasks[0].shards, 2);
        assert_eq!(cfg.tasks[1].shards, 1);
        assert!(cfg.channels[0].from.is_none());
        assert_eq!(cfg.channels[0].consumer_port(), "input");
        assert_eq!(cfg.channels[1].producer_port(), Some("output"));
        assert_eq!(cfg.channels[1].to.shard, 1);
    }

    #[test]
    fn test_instance_names() {
        let single = TaskConfig {
            name: "reducer".into(),
            processor: "shard_router".into(),
            shards: 1,
            params: HashMap::new(),
        };
        assert_eq!(single.instance_names(), vec!["reducer"]);

        let sharded = TaskConfig {
            shards: 3,
            ..single
        };
        assert_eq!(
            sharded.instance_names(),
            vec!["reducer.0", "reducer.1", "reducer.2"]
        );
    }

    #[test]
    fn test_load_yaml_and_toml_descriptors() {
        let yaml = write_temp(
            ".yaml",
            r#"
tasks:
  - name: a
    processor: relay
channels:
  - id: in
    to: { task: a }
"#,
        );
        let cfg = load_and_validate_config(yaml.path()).unwrap();
        assert_eq!(cfg.tasks[0].processor, "relay");

        let toml = write_temp(
            ".toml",
            r#"
[executor]
workers = 3
queue_capacity = 8

[[tasks]]
name = "a"
processor = "printer"

[tasks.params]
format = "json"

[[channels]]
id = "in"
to = { task = "a" }
"#,
        );
        let cfg = load_and_validate_config(toml.path()).unwrap();
        assert_eq!(cfg.executor.workers(), 3);
        assert_eq!(cfg.executor.queue_capacity(), 8);
        assert_eq!(
            cfg.tasks[0].params.get("format").and_then(|v| v.as_str()),
            Some("json")
        );
    }

    #[test]
    fn test_load_and_validate_cyclic_config() {
        let file = write_temp(
            ".yaml",
            r#"
tasks:
  - name: a
    processor: relay
  - name: b
    processor: relay
channels:
  - id: ab
    from: { task: a }
    to: { task: b }
  - id: ba
    from: { task: b }
    to: { task: a }
"#,
        );

        let result = load_and_validate_config(file.path());
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("Cyclic channel graph detected"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/pipeline.yaml"));
    }

    #[test]
    fn test_malformed_yaml() {
        let file = write_temp(".yml", "tasks: [ { name: a ");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Yaml(_))
        ));
    }
}
