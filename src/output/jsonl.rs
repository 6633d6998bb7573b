//! JSON-lines sink: one record per line, appended across runs

use crate::crawler::{GameDetail, ItemRecord};
use crate::output::{ItemSink, OutputResult};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonLinesSink {
    writer: BufWriter<File>,
    written: u64,
}

impl JsonLinesSink {
    /// Opens (or creates) the file in append mode
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Records written through this sink
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_line<T: Serialize>(&mut self, record: &T) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

impl ItemSink for JsonLinesSink {
    fn write_item(&mut self, item: &ItemRecord) -> OutputResult<()> {
        self.write_line(item)
    }

    fn write_detail(&mut self, detail: &GameDetail) -> OutputResult<()> {
        self.write_line(detail)
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::debug!("Flushed {} records", self.written);
        Ok(())
    }
}
