//! Diagnostic printer.
//!
//! A terminal processor that turns each delivery into a [`DeliveryRecord`] (channel id,
//! producer, consumer, key, value) and hands it to a [`RecordWriter`]. The default
//! writer emits the record through `tracing`; deployments that want records elsewhere
//! plug in their own writer with [`PrinterProcessor::with_writer`].
//!
//! # Params
//! * `format` - `text` (default, structured log fields) or `json` (one JSON line)

use serde::Serialize;

use crate::errors::PipelineError;
use crate::model::{Channel, Message, Task};
use crate::observability::messages::{processor::*, StructuredLog};
use crate::traits::Processor;

/// One observed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub channel: String,
    /// Producing port, or `external` for input channels
    pub producer: String,
    pub consumer: String,
    pub key: String,
    pub value: String,
}

impl DeliveryRecord {
    pub fn new(channel: &Channel, message: &Message) -> Self {
        Self {
            channel: channel.id().to_string(),
            producer: channel.producer_name(),
            consumer: channel.consumer().to_string(),
            key: message.key_lossy().into_owned(),
            value: message.value_lossy().into_owned(),
        }
    }
}

/// Destination for delivery records.
pub trait RecordWriter: Send {
    fn write(&mut self, record: &DeliveryRecord) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFormat {
    #[default]
    Text,
    Json,
}

impl RecordFormat {
    fn parse(task: &str, value: &str) -> Result<Self, PipelineError> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(PipelineError::processor(
                task,
                format!("unknown printer format '{}', expected 'text' or 'json'", other),
            )),
        }
    }
}

/// Writes records as `info` events.
#[derive(Debug, Default)]
pub struct TracingWriter {
    format: RecordFormat,
}

impl TracingWriter {
    pub fn new(format: RecordFormat) -> Self {
        Self { format }
    }
}

impl RecordWriter for TracingWriter {
    fn write(&mut self, record: &DeliveryRecord) -> Result<(), PipelineError> {
        match self.format {
            RecordFormat::Text => DeliveryRecorded { record }.log(),
            RecordFormat::Json => {
                let line = serde_json::to_string(record).map_err(|e| {
                    PipelineError::processor(record.consumer.clone(), e.to_string())
                })?;
                DeliveryRecordedJson { line: &line }.log();
            }
        }
        Ok(())
    }
}

pub struct PrinterProcessor {
    writer: Option<Box<dyn RecordWriter>>,
}

impl PrinterProcessor {
    /// Printer using [`TracingWriter`], configured from the task's `format` param at start
    pub fn new() -> Self {
        Self { writer: None }
    }

    /// Printer sending records to `writer`; the `format` param is ignored
    pub fn with_writer(writer: impl RecordWriter + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
        }
    }
}

impl Default for PrinterProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for PrinterProcessor {
    fn start(&mut self, task: &Task) -> Result<(), PipelineError> {
        if self.writer.is_none() {
            let format = match task.param_str("format") {
                Some(value) => RecordFormat::parse(task.name(), value)?,
                None => RecordFormat::default(),
            };
            self.writer = Some(Box::new(TracingWriter::new(format)));
        }
        Ok(())
    }

    fn receive(&mut self, channel: &Channel, message: Message) -> Result<(), PipelineError> {
        let record = DeliveryRecord::new(channel, &message);
        message.release();
        self.writer
            .get_or_insert_with(|| Box::new(TracingWriter::default()))
            .write(&record)
    }

    fn name(&self) -> &'static str {
        "printer"
    }
}
