/// Default bound on queued-but-unstarted units of work
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Worker count used when available parallelism cannot be determined
pub const DEFAULT_WORKERS_FALLBACK: usize = 4;
/// Port assumed for the consuming end of a channel
pub const DEFAULT_INPUT_PORT: &str = "input";
/// Port assumed for the producing end of a channel
pub const DEFAULT_OUTPUT_PORT: &str = "output";
