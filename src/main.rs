// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::io::{self, BufRead};

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use shardflow::backends::local::LocalProcessorFactory;
use shardflow::config::RuntimeBuilder;
use shardflow::model::Message;

const USAGE: &str = "Usage: shardflow <pipeline.yaml|pipeline.toml> [input_channel] [key=value ...]

Messages are read from stdin, one `key=value` per line, when none are given.
Without an input channel, messages are spread round-robin over every input channel.";

/// Split `key=value`; a bare value gets an empty key
fn parse_message(raw: &str) -> Message {
    match raw.split_once('=') {
        Some((key, value)) => Message::new(key, value),
        None => Message::new("", raw),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(descriptor) = args.first() else {
        eprintln!("{}", USAGE);
        eprintln!(
            "\nBuilt-in processors: {}",
            LocalProcessorFactory::list_available_implementations().join(", ")
        );
        std::process::exit(2);
    };

    let mut pipeline = RuntimeBuilder::from_file(descriptor)
        .with_context(|| format!("failed to assemble pipeline from '{}'", descriptor))?;

    let mut rest = &args[1..];
    let targets: Vec<String> = match rest.first() {
        Some(first) if !first.contains('=') => {
            rest = &rest[1..];
            vec![first.clone()]
        }
        _ => pipeline.input_ids().into_iter().map(String::from).collect(),
    };
    if targets.is_empty() {
        bail!("pipeline '{}' declares no input channels", descriptor);
    }

    let messages: Vec<Message> = if rest.is_empty() {
        let mut lines = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read stdin")?;
            if !line.trim().is_empty() {
                lines.push(parse_message(&line));
            }
        }
        lines
    } else {
        rest.iter().map(|raw| parse_message(raw)).collect()
    };

    let inputs = messages
        .into_iter()
        .enumerate()
        .map(|(i, message)| (targets[i % targets.len()].as_str(), message));
    let summary = pipeline
        .run(inputs)
        .with_context(|| format!("pipeline '{}' failed", descriptor))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
