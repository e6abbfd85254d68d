// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod printer;
pub mod relay;
pub mod shard_router;
pub mod sink;

pub use printer::*;
pub use relay::*;
pub use shard_router::*;
pub use sink::*;
