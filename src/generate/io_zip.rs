use std::io::{Cursor, Write};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::generate::*;

/// Builds a zip archive in memory.
pub struct ZipArchiveWriter {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    count: usize,
}

impl Default for ZipArchiveWriter {
    fn default() -> ZipArchiveWriter {
        ZipArchiveWriter {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            count: 0,
        }
    }
}

impl ZipArchiveWriter {
    fn add(&mut self, name: &str, bytes: &[u8]) -> CliResult<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(name, options)
            .context(WritingArchiveSnafu {})?;
        self.writer
            .write_all(bytes)
            .context(WritingEntrySnafu { name })?;
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> CliResult<Vec<u8>> {
        let cursor = self.writer.finish().context(WritingArchiveSnafu {})?;
        Ok(cursor.into_inner())
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), BoxError> {
        self.add(name, bytes)?;
        debug!("ZipArchiveWriter::write_entry: {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    fn finalize(self) -> Result<Vec<u8>, BoxError> {
        debug!("ZipArchiveWriter::finalize: {} entries", self.count);
        Ok(self.finish()?)
    }
}
