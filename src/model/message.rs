// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::borrow::Cow;

/// An owned key/value record passed between tasks.
///
/// `Message` is deliberately not `Clone`: it moves from the producer into a channel and
/// from the channel into exactly one `Processor::receive` call, which either forwards it
/// with `Channel::send` or releases it.
#[derive(Debug, PartialEq, Eq)]
pub struct Message {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Message {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Key as text, with invalid UTF-8 replaced.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Payload size in bytes (key + value)
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.key, self.value)
    }

    /// Release the message. Terminal processors call this to end its lifetime
    /// before `receive` returns.
    pub fn release(self) {}
}
