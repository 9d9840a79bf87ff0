//! Top-level driver that loads a queue file (or disk-sampler windows),
//! chooses a job delimiter, and yields jobs by trying the clean path first
//! and the carver second. Mirrors `original_source/bits/bits.py`'s `Bits`
//! class: two accumulating buffers (clean `bits_data`, raw `raw_data`), a
//! delimiter guessed from whichever candidate occurs most often, and an
//! iteration order of legitimate jobs before carved ones.

use std::path::Path;

use log::{debug, info, warn};

use crate::bits::consts::JOB_DELIMITERS;
use crate::bits::job::Job;
use crate::bits::scan::trim_zero;
use crate::bits::{carver, parser, queue};
use crate::error::Result;

pub struct Orchestrator {
    raw_data: Vec<u8>,
    bits_data: Vec<u8>,
    delimiter: Option<[u8; 16]>,
}

impl Orchestrator {
    pub fn new(delimiter: Option<[u8; 16]>) -> Self {
        Self {
            raw_data: Vec::new(),
            bits_data: Vec::new(),
            delimiter,
        }
    }

    /// Reads `path`, attempts the structural `QUEUE` decode, and falls back
    /// to carving-only mode on failure. Only I/O failures escape.
    pub fn load_file(path: &Path, delimiter: Option<[u8; 16]>) -> Result<Self> {
        info!("Processing BITS queue {}", path.display());
        let data = std::fs::read(path)?;
        let mut rv = Self::new(delimiter);
        rv.load_queue_bytes(&data);
        rv.choose_delimiter();
        Ok(rv)
    }

    fn load_queue_bytes(&mut self, data: &[u8]) {
        match queue::parse(data) {
            Ok(q) => {
                self.ingest(q.jobs, true);
                self.ingest(q.remains, false);
                if q.job_count > 0 {
                    info!("{} legitimate job(s) detected", q.job_count);
                }
            }
            Err(_) => {
                warn!("incoherent data, carving mode only.");
                self.ingest(data, false);
            }
        }
    }

    /// Appends `data` (zero-stripped) to the clean or raw accumulator. This
    /// is the entry point the disk sampler feeds its windows through, since
    /// a sampled window has no structural `QUEUE` framing to decode.
    pub fn ingest(&mut self, data: &[u8], is_clean: bool) {
        let trimmed = trim_zero(data);
        debug!("{} bytes loaded (raw={})", trimmed.len(), !is_clean);
        if is_clean {
            self.bits_data.extend_from_slice(trimmed);
        } else {
            self.raw_data.extend_from_slice(trimmed);
        }
    }

    /// Picks the job delimiter with the most occurrences across everything
    /// ingested so far, unless one was forced at construction. Always logs
    /// the outcome, forced or guessed.
    pub fn choose_delimiter(&mut self) {
        if self.delimiter.is_none() {
            let mut data = self.bits_data.clone();
            data.extend_from_slice(&self.raw_data);

            let mut best: Option<([u8; 16], usize)> = None;
            for (_, delim) in JOB_DELIMITERS {
                let count = count_occurrences(&data, &delim);
                best = Some(match best {
                    Some((bd, bc)) if (bc, bd) >= (count, delim) => (bd, bc),
                    _ => (delim, count),
                });
            }
            self.delimiter = best.and_then(|(d, c)| (c > 0).then_some(d));
        }

        match self.delimiter {
            Some(d) => info!("Job delimiter is {}", hex_upper(&d)),
            None => warn!("Job delimiter is undefined"),
        }
    }

    pub fn delimiter(&self) -> Option<[u8; 16]> {
        self.delimiter
    }

    /// Yields legitimate jobs first, then carved jobs. Matches the
    /// original's `__iter__`: `parse()` only ever looks at the clean buffer,
    /// `carve()` only ever looks at the raw buffer.
    pub fn iterate(&self) -> Vec<Job> {
        let mut out = Vec::new();
        match self.delimiter {
            Some(delim) if !self.bits_data.is_empty() => {
                debug!("analysis of {} bytes", self.bits_data.len());
                out.extend(parser::parse(&self.bits_data, &delim));
            }
            _ => info!("No legitimate data found."),
        }
        debug!("analysis of {} bytes", self.raw_data.len());
        out.extend(carver::carve(&self.raw_data, self.delimiter));
        out
    }
}

fn count_occurrences(data: &[u8], pat: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + pat.len() <= data.len() {
        if &data[i..i + pat.len()] == pat {
            count += 1;
            i += pat.len();
        } else {
            i += 1;
        }
    }
    count
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
