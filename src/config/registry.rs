//! Processor registry.
//!
//! Maps a processor name to a zero-argument factory. A registry is populated once before
//! any pipeline is assembled and then shared immutably; `Pipeline::assemble` only ever
//! reads from it.
//!
//! # Example
//! ```
//! use shardflow::config::ProcessorRegistry;
//! use shardflow::backends::local::SinkProcessor;
//! use shardflow::errors::RegistryError;
//!
//! let mut registry = ProcessorRegistry::with_builtins();
//! assert!(registry.contains("relay"));
//!
//! let duplicate = registry.register("sink", || Box::new(SinkProcessor::new()));
//! assert!(matches!(duplicate, Err(RegistryError::Duplicate { .. })));
//!
//! registry.register("blackhole", || Box::new(SinkProcessor::new()))?;
//! let processor = registry.create("blackhole")?;
//! assert_eq!(processor.name(), "sink");
//! # Ok::<(), RegistryError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backends::local::LocalProcessorFactory;
use crate::errors::RegistryError;
use crate::traits::Processor;

/// Creates a fresh processor instance
pub type ProcessorFactory = Arc<dyn Fn() -> Box<dyn Processor> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in processors (`relay`, `shard_router`, `sink`, `printer`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        LocalProcessorFactory::register_all(&mut registry);
        registry
    }

    /// Bind `name` to `factory`. Fails if the name is already bound.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Processor> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// A new processor instance for `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn Processor>, RegistryError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::{RelayProcessor, SinkProcessor};

    #[test]
    fn test_builtins_registered() {
        let registry = ProcessorRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["printer", "relay", "shard_router", "sink"]
        );

        for name in registry.names() {
            let processor = registry.create(name).unwrap();
            assert_eq!(processor.name(), name);
        }
    }

    #[test]
    fn test_register_and_create() {
        struct TestCase {
            name: &'static str,
            register: Vec<&'static str>,
            create: &'static str,
            expected: Result<&'static str, RegistryError>,
        }

        let test_cases = vec![
            TestCase {
                name: "empty registry",
                register: vec![],
                create: "relay",
                expected: Err(RegistryError::Unknown {
                    name: "relay".into(),
                }),
            },
            TestCase {
                name: "registered name",
                register: vec!["relay"],
                create: "relay",
                expected: Ok("relay"),
            },
            TestCase {
                name: "other name",
                register: vec!["relay", "mapper"],
                create: "reducer",
                expected: Err(RegistryError::Unknown {
                    name: "reducer".into(),
                }),
            },
        ];

        for test_case in test_cases {
            let mut registry = ProcessorRegistry::new();
            for name in &test_case.register {
                registry
                    .register(*name, || Box::new(RelayProcessor::new()))
                    .unwrap();
            }
            let created = registry.create(test_case.create).map(|p| p.name());
            assert_eq!(created, test_case.expected, "{}", test_case.name);
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first_factory() {
        let mut registry = ProcessorRegistry::new();
        registry
            .register("terminal", || Box::new(SinkProcessor::new()))
            .unwrap();

        let err = registry
            .register("terminal", || Box::new(RelayProcessor::new()))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                name: "terminal".into()
            }
        );
        assert_eq!(registry.create("terminal").unwrap().name(), "sink");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_each_create_returns_a_new_instance() {
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = ProcessorRegistry::new();
        let seen = Arc::clone(&counter);
        registry
            .register("counted", move || {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Box::new(SinkProcessor::new())
            })
            .unwrap();

        for _ in 0..3 {
            registry.create("counted").unwrap();
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
