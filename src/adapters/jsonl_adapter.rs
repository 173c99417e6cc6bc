//! JSON lines result sink: one flattened record per line.

use crate::domain::error::QuantscanError;
use crate::domain::flatten::FlatRecord;
use crate::ports::result_port::ResultPort;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug)]
pub struct JsonLinesAdapter<W: Write> {
    writer: W,
}

impl JsonLinesAdapter<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, QuantscanError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| QuantscanError::Output {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesAdapter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultPort for JsonLinesAdapter<W> {
    fn write_records(&mut self, records: &[FlatRecord]) -> Result<(), QuantscanError> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record).map_err(|e| {
                QuantscanError::Output {
                    reason: format!("failed to serialize {}: {}", record.code, e),
                }
            })?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
