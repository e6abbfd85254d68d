use crate::config::ProcessorRegistry;
use crate::traits::Processor;
use super::processors::*;

/// Factory for the built-in (in-process) processors
pub struct LocalProcessorFactory;

type Constructor = fn() -> Box<dyn Processor>;

// - "relay" -> RelayProcessor
// - "shard_router" -> ShardRouterProcessor
// - "sink" -> SinkProcessor
// - "printer" -> PrinterProcessor (tracing writer, `format` param)
const BUILTINS: [(&str, Constructor); 4] = [
    ("relay", || Box::new(RelayProcessor::new())),
    ("shard_router", || Box::new(ShardRouterProcessor::new())),
    ("sink", || Box::new(SinkProcessor::new())),
    ("printer", || Box::new(PrinterProcessor::new())),
];

impl LocalProcessorFactory {
    /// Bind every built-in processor into `registry`, skipping names already taken
    pub fn register_all(registry: &mut ProcessorRegistry) {
        for (name, construct) in BUILTINS {
            if !registry.contains(name) {
                let _ = registry.register(name, construct);
            }
        }
    }

    /// List all built-in processor names
    pub fn list_available_implementations() -> Vec<&'static str> {
        BUILTINS.iter().map(|(name, _)| *name).collect()
    }
}
