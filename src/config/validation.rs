//! Pipeline descriptor validation.
//!
//! Checks run in order and accumulate, so a user sees every problem at once:
//!
//! 1. **Executor sizing**: worker count and queue capacity are at least 1
//! 2. **Tasks**: shard counts are at least 1, every task names a processor, and
//!    task instance names (`name` or `name.i`) are unique
//! 3. **Channels**: ids are unique, both endpoints name existing task instances, and no
//!    two channels share a producer slot or a consumer slot (task + port + shard)
//! 4. **Cycle detection**: DFS over the task instance graph, reporting the cycle path
//!
//! Cycle detection needs a structurally valid graph, so it only runs when steps 1-3 pass.
//!
//! # Example
//! ```rust
//! use shardflow::config::{validate_pipeline, ChannelConfig, EndpointConfig, PipelineConfig, TaskConfig};
//! use shardflow::errors::ValidationError;
//! use std::collections::HashMap;
//!
//! let config = PipelineConfig {
//!     tasks: vec![TaskConfig {
//!         name: "mapper".to_string(),
//!         processor: "relay".to_string(),
//!         shards: 1,
//!         params: HashMap::new(),
//!     }],
//!     channels: vec![ChannelConfig {
//!         id: "in".to_string(),
//!         from: None,
//!         to: EndpointConfig { task: "reducer".to_string(), port: None, shard: 0 },
//!     }],
//!     ..Default::default()
//! };
//!
//! let errors = validate_pipeline(&config).unwrap_err();
//! assert!(matches!(errors[0], ValidationError::UnresolvedTask { .. }));
//! ```

use std::collections::{HashMap, HashSet};

use crate::config::PipelineConfig;
use crate::errors::ValidationError;

/// Validates a descriptor, returning every problem found.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    errors.extend(validate_executor(config));
    errors.extend(validate_tasks(config));
    errors.extend(validate_channels(config));

    if errors.is_empty() {
        if let Err(cycle) = validate_acyclic_graph(config) {
            errors.push(cycle);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_executor(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if config.executor.workers == Some(0) {
        errors.push(ValidationError::InvalidExecutorOption { option: "workers" });
    }
    if config.executor.queue_capacity == Some(0) {
        errors.push(ValidationError::InvalidExecutorOption {
            option: "queue_capacity",
        });
    }
    errors
}

fn validate_tasks(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for task in &config.tasks {
        if task.shards == 0 {
            errors.push(ValidationError::InvalidShardCount {
                task: task.name.clone(),
            });
        }
        if task.processor.trim().is_empty() {
            errors.push(ValidationError::MissingProcessor {
                task: task.name.clone(),
            });
        }
        for instance in task.instance_names() {
            if !seen.insert(instance.clone()) {
                errors.push(ValidationError::DuplicateTask { task: instance });
            }
        }
    }

    errors
}

/// Task instance names declared by the descriptor, in declaration order
fn instance_names(config: &PipelineConfig) -> Vec<String> {
    config
        .tasks
        .iter()
        .flat_map(|t| t.instance_names())
        .collect()
}

fn validate_channels(config: &PipelineConfig) -> Vec<ValidationError> {
    let instances: HashSet<String> = instance_names(config).into_iter().collect();
    let mut ids = HashSet::new();
    let mut producer_slots: HashMap<String, &str> = HashMap::new();
    let mut consumer_slots: HashMap<String, &str> = HashMap::new();
    let mut errors = Vec::new();

    for channel in &config.channels {
        if !ids.insert(channel.id.as_str()) {
            errors.push(ValidationError::DuplicateChannel {
                channel: channel.id.clone(),
            });
        }

        if let Some(from) = &channel.from {
            if !instances.contains(&from.task) {
                errors.push(ValidationError::UnresolvedTask {
                    channel: channel.id.clone(),
                    task: from.task.clone(),
                });
            }
            let slot = slot_name(&from.task, channel.producer_port().unwrap_or_default(), from.shard);
            if let Some(first) = producer_slots.insert(slot.clone(), &channel.id) {
                errors.push(ValidationError::PortConflict {
                    direction: "producer",
                    slot,
                    first: first.to_string(),
                    second: channel.id.clone(),
                });
            }
        }

        if !instances.contains(&channel.to.task) {
            errors.push(ValidationError::UnresolvedTask {
                channel: channel.id.clone(),
                task: channel.to.task.clone(),
            });
        }
        let slot = slot_name(&channel.to.task, channel.consumer_port(), channel.to.shard);
        if let Some(first) = consumer_slots.insert(slot.clone(), &channel.id) {
            errors.push(ValidationError::PortConflict {
                direction: "consumer",
                slot,
                first: first.to_string(),
                second: channel.id.clone(),
            });
        }
    }

    errors
}

fn slot_name(task: &str, port: &str, shard: usize) -> String {
    format!("{}:{}[{}]", task, port, shard)
}

/// DFS cycle detection over task instances (producer task -> consumer task).
///
/// Uses the three-colors approach: a node still on the recursion stack that is reached
/// again closes a cycle, and the path segment from that node onwards is reported.
fn validate_acyclic_graph(config: &PipelineConfig) -> Result<(), ValidationError> {
    let nodes = instance_names(config);
    let mut graph: HashMap<&str, Vec<&str>> =
        nodes.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for channel in &config.channels {
        if let Some(from) = &channel.from {
            if let Some(edges) = graph.get_mut(from.task.as_str()) {
                edges.push(channel.to.task.as_str());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Declaration order keeps the reported cycle deterministic
    for node in &nodes {
        if !visited.contains(node.as_str()) {
            if let Some(cycle) =
                dfs_cycle_detection(node, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(ValidationError::CyclicGraph { cycle });
            }
        }
    }

    Ok(())
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(neighbor.to_string()); // Close the cycle
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, EndpointConfig, ExecutorOptions, TaskConfig};

    fn task(name: &str, processor: &str, shards: usize) -> TaskConfig {
        TaskConfig {
            name: name.to_string(),
            processor: processor.to_string(),
            shards,
            params: HashMap::new(),
        }
    }

    fn endpoint(task: &str, shard: usize) -> EndpointConfig {
        EndpointConfig {
            task: task.to_string(),
            port: None,
            shard,
        }
    }

    fn link(id: &str, from: &str, to: &str) -> ChannelConfig {
        ChannelConfig {
            id: id.to_string(),
            from: Some(endpoint(from, 0)),
            to: endpoint(to, 0),
        }
    }

    fn input(id: &str, to: &str) -> ChannelConfig {
        ChannelConfig {
            id: id.to_string(),
            from: None,
            to: endpoint(to, 0),
        }
    }

    fn config(tasks: Vec<TaskConfig>, channels: Vec<ChannelConfig>) -> PipelineConfig {
        PipelineConfig {
            executor: ExecutorOptions::default(),
            tasks,
            channels,
        }
    }

    #[test]
    fn test_valid_empty_config() {
        assert!(validate_pipeline(&config(vec![], vec![])).is_ok());
    }

    #[test]
    fn test_valid_sharded_fan_in() {
        let mut channels = vec![input("in0", "mapper.0"), input("in1", "mapper.1")];
        for shard in 0..2 {
            channels.push(ChannelConfig {
                id: format!("m{}", shard),
                from: Some(endpoint(&format!("mapper.{}", shard), 0)),
                to: endpoint("reducer", shard),
            });
        }
        let cfg = config(
            vec![task("mapper", "relay", 2), task("reducer", "shard_router", 1)],
            channels,
        );
        assert!(validate_pipeline(&cfg).is_ok());
    }

    #[test]
    fn test_validation_errors_table() {
        struct TestCase {
            name: &'static str,
            config: PipelineConfig,
            expected: ValidationError,
        }

        let test_cases = vec![
            TestCase {
                name: "duplicate task",
                config: config(vec![task("a", "relay", 1), task("a", "sink", 1)], vec![]),
                expected: ValidationError::DuplicateTask { task: "a".into() },
            },
            TestCase {
                name: "sharded instance collides with plain task",
                config: config(vec![task("a", "relay", 2), task("a.1", "sink", 1)], vec![]),
                expected: ValidationError::DuplicateTask { task: "a.1".into() },
            },
            TestCase {
                name: "zero shards",
                config: config(vec![task("a", "relay", 0)], vec![]),
                expected: ValidationError::InvalidShardCount { task: "a".into() },
            },
            TestCase {
                name: "missing processor",
                config: config(vec![task("a", " ", 1)], vec![]),
                expected: ValidationError::MissingProcessor { task: "a".into() },
            },
            TestCase {
                name: "duplicate channel",
                config: config(
                    vec![task("a", "relay", 1), task("b", "sink", 1)],
                    vec![input("x", "a"), link("x", "a", "b")],
                ),
                expected: ValidationError::DuplicateChannel { channel: "x".into() },
            },
            TestCase {
                name: "unresolved consumer",
                config: config(vec![task("a", "relay", 1)], vec![link("ab", "a", "b")]),
                expected: ValidationError::UnresolvedTask {
                    channel: "ab".into(),
                    task: "b".into(),
                },
            },
            TestCase {
                name: "unresolved sharded instance",
                config: config(vec![task("a", "relay", 2)], vec![input("in", "a.2")]),
                expected: ValidationError::UnresolvedTask {
                    channel: "in".into(),
                    task: "a.2".into(),
                },
            },
            TestCase {
                name: "consumer slot bound twice",
                config: config(
                    vec![task("a", "relay", 1)],
                    vec![input("in1", "a"), input("in2", "a")],
                ),
                expected: ValidationError::PortConflict {
                    direction: "consumer",
                    slot: "a:input[0]".into(),
                    first: "in1".into(),
                    second: "in2".into(),
                },
            },
            TestCase {
                name: "producer slot bound twice",
                config: config(
                    vec![task("a", "relay", 1), task("b", "sink", 1), task("c", "sink", 1)],
                    vec![link("ab", "a", "b"), link("ac", "a", "c")],
                ),
                expected: ValidationError::PortConflict {
                    direction: "producer",
                    slot: "a:output[0]".into(),
                    first: "ab".into(),
                    second: "ac".into(),
                },
            },
            TestCase {
                name: "zero workers",
                config: PipelineConfig {
                    executor: ExecutorOptions {
                        workers: Some(0),
                        queue_capacity: None,
                    },
                    ..Default::default()
                },
                expected: ValidationError::InvalidExecutorOption { option: "workers" },
            },
            TestCase {
                name: "zero capacity",
                config: PipelineConfig {
                    executor: ExecutorOptions {
                        workers: None,
                        queue_capacity: Some(0),
                    },
                    ..Default::default()
                },
                expected: ValidationError::InvalidExecutorOption {
                    option: "queue_capacity",
                },
            },
        ];

        for test_case in test_cases {
            let errors = validate_pipeline(&test_case.config)
                .expect_err(test_case.name);
            assert_eq!(errors, vec![test_case.expected], "{}", test_case.name);
        }
    }

    #[test]
    fn test_simple_cycle() {
        let cfg = config(
            vec![task("a", "relay", 1), task("b", "relay", 1)],
            vec![link("ab", "a", "b"), link("ba", "b", "a")],
        );
        let errors = validate_pipeline(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicGraph {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_self_loop_on_distinct_ports() {
        let cfg = config(
            vec![task("a", "relay", 1)],
            vec![ChannelConfig {
                id: "loop".into(),
                from: Some(endpoint("a", 0)),
                to: EndpointConfig {
                    task: "a".into(),
                    port: Some("feedback".into()),
                    shard: 0,
                },
            }],
        );
        let errors = validate_pipeline(&cfg).unwrap_err();
        assert!(matches!(errors[0], ValidationError::CyclicGraph { .. }));
    }

    #[test]
    fn test_complex_cycle_reports_only_cycle_segment() {
        let cfg = config(
            vec![
                task("a", "relay", 1),
                task("b", "relay", 1),
                task("c", "relay", 1),
                task("d", "relay", 1),
            ],
            vec![
                link("ab", "a", "b"),
                link("bc", "b", "c"),
                link("cd", "c", "d"),
                ChannelConfig {
                    id: "db".into(),
                    from: Some(endpoint("d", 0)),
                    to: EndpointConfig {
                        task: "b".into(),
                        port: Some("retry".into()),
                        shard: 0,
                    },
                },
            ],
        );
        let errors = validate_pipeline(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicGraph {
                cycle: vec!["b".into(), "c".into(), "d".into(), "b".into()]
            }]
        );
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        let cfg = config(
            vec![task("a", "relay", 1), task("a", "relay", 0)],
            vec![link("ab", "a", "missing"), input("in", "nowhere")],
        );
        let errors = validate_pipeline(&cfg).unwrap_err();
        assert!(errors.len() >= 3);
        assert!(!errors
            .iter()
            .any(|e| matches!(e, ValidationError::CyclicGraph { .. })));
    }
}
