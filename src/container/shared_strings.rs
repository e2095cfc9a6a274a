//! Shared string table (SST) for the legacy container
//!
//! Strings are appended to a staging file as they are first seen, so the
//! table does not grow in memory with the row count. Deduplication only
//! covers strings that fit in a fixed lookup budget.

use super::biff::{write_record, MAX_RECORD_DATA, RECORD_CONTINUE, RECORD_SST};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

/// Bytes of string text kept in the dedup lookup
pub const DEFAULT_LOOKUP_BUDGET: usize = 1 << 20;

/// Disk-backed deduplicating string table; indices follow first-seen order
pub struct SharedStrings {
    staging: BufWriter<File>,
    lookup: IndexMap<String, u32>,
    lookup_bytes: usize,
    lookup_budget: usize,
    unique: u32,
    references: u32,
}

impl SharedStrings {
    pub fn new(staging: File) -> Self {
        Self::with_lookup_budget(staging, DEFAULT_LOOKUP_BUDGET)
    }

    pub fn with_lookup_budget(staging: File, lookup_budget: usize) -> Self {
        SharedStrings {
            staging: BufWriter::with_capacity(64 * 1024, staging),
            lookup: IndexMap::new(),
            lookup_bytes: 0,
            lookup_budget,
            unique: 0,
            references: 0,
        }
    }

    /// Add a string reference and get its table index
    pub fn add_string(&mut self, s: &str) -> io::Result<u32> {
        self.references = self.references.saturating_add(1);
        if let Some(&index) = self.lookup.get(s) {
            return Ok(index);
        }

        let index = self.unique;
        let units: Vec<u16> = s.encode_utf16().collect();
        self.staging.write_all(&(units.len() as u16).to_le_bytes())?;
        for unit in &units {
            self.staging.write_all(&unit.to_le_bytes())?;
        }
        self.unique += 1;

        // past the budget, repeats get a fresh entry instead of a lookup slot
        if self.lookup_bytes + s.len() <= self.lookup_budget {
            self.lookup_bytes += s.len();
            self.lookup.insert(s.to_string(), index);
        }
        Ok(index)
    }

    /// Number of table entries
    pub fn count(&self) -> usize {
        self.unique as usize
    }

    /// Number of cells referencing the table
    pub fn references(&self) -> u32 {
        self.references
    }

    /// Bytes of string text held by the dedup lookup
    #[cfg(test)]
    pub fn lookup_bytes(&self) -> usize {
        self.lookup_bytes
    }

    /// Size in bytes of the SST and CONTINUE records, headers included
    pub fn biff_len(&mut self) -> io::Result<u64> {
        self.write_biff(&mut io::sink())
    }

    /// Write the SST record and its CONTINUE records, returning the bytes written.
    ///
    /// Strings are stored uncompressed. A string split across records repeats
    /// its option flags byte at the start of the CONTINUE record.
    pub fn write_biff<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<u64> {
        self.staging.flush()?;
        let file = self.staging.get_mut();
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&*file);

        let mut written = 0u64;
        let mut emit = |out: &mut W, id: u16, data: &[u8]| -> io::Result<()> {
            write_record(out, id, data)?;
            written += 4 + data.len() as u64;
            Ok(())
        };

        let mut record = Vec::with_capacity(MAX_RECORD_DATA);
        let mut record_id = RECORD_SST;
        record.extend_from_slice(&self.references.to_le_bytes());
        record.extend_from_slice(&self.unique.to_le_bytes());

        let mut units = Vec::new();
        for _ in 0..self.unique {
            read_string(&mut reader, &mut units)?;
            // length, flags and at least one character stay together
            let header = if units.is_empty() { 3 } else { 5 };
            if record.len() + header > MAX_RECORD_DATA {
                emit(out, record_id, &record)?;
                record.clear();
                record_id = RECORD_CONTINUE;
            }
            record.extend_from_slice(&(units.len() as u16).to_le_bytes());
            record.push(0x01);

            let mut rest = &units[..];
            loop {
                let room = (MAX_RECORD_DATA - record.len()) / 2;
                let (now, later) = rest.split_at(room.min(rest.len()));
                for unit in now {
                    record.extend_from_slice(&unit.to_le_bytes());
                }
                rest = later;
                if rest.is_empty() {
                    break;
                }
                emit(out, record_id, &record)?;
                record.clear();
                record_id = RECORD_CONTINUE;
                record.push(0x01);
            }
        }
        emit(out, record_id, &record)?;

        // further adds append after the staged strings
        self.staging.get_mut().seek(SeekFrom::End(0))?;
        Ok(written)
    }
}

fn read_string<R: Read>(reader: &mut R, units: &mut Vec<u16>) -> io::Result<()> {
    let mut len = [0u8; 2];
    reader.read_exact(&mut len)?;
    let mut bytes = vec![0u8; u16::from_le_bytes(len) as usize * 2];
    reader.read_exact(&mut bytes)?;
    units.clear();
    units.extend(
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
    );
    Ok(())
}
