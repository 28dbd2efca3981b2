//! Destinations for the tuples a pipeline produces.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use spanflow_core::types::Tuple;
use spanflow_io::writers::jsonl::JsonlWriter;

use crate::runtime::ExecError;

pub trait TupleSink {
    fn write(&mut self, tuple: &Tuple) -> Result<(), ExecError>;

    /// Called once after the last tuple.
    fn finish(&mut self) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Collects tuples in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    tuples: Vec<Tuple>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }
}

impl TupleSink for VecSink {
    fn write(&mut self, tuple: &Tuple) -> Result<(), ExecError> {
        self.tuples.push(tuple.clone());
        Ok(())
    }
}

/// One JSON object per tuple; the payload attribute is left out.
pub struct JsonlSink<W: Write> {
    writer: JsonlWriter<W>,
}

impl JsonlSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ExecError> {
        Ok(Self {
            writer: JsonlWriter::to_path(path)?,
        })
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: JsonlWriter::to_writer(writer),
        }
    }

    pub fn written(&self) -> u64 {
        self.writer.written()
    }
}

impl<W: Write> TupleSink for JsonlSink<W> {
    fn write(&mut self, tuple: &Tuple) -> Result<(), ExecError> {
        self.writer.write_tuple(tuple)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExecError> {
        self.writer.flush()?;
        Ok(())
    }
}
