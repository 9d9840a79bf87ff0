//! Job parser, clean path. Pre-condition: a job delimiter has
//! been chosen — otherwise this path yields nothing.

use log::{debug, warn};

use crate::bits::consts::XFER_DELIMITER;
use crate::bits::job::Job;
use crate::bits::scan;
use crate::bits::structs;

/// Splits `clean` on `delimiter`, decodes each chunk into a full [`Job`],
/// and decodes each chunk's file-transfers sub-range on [`XFER_DELIMITER`].
/// Chunks that fail to decode as a job are skipped; file sub-chunks that
/// fail to decode are dropped silently.
pub fn parse(clean: &[u8], delimiter: &[u8; 16]) -> Vec<Job> {
    let mut out = Vec::new();
    for chunk in scan::split(clean, delimiter) {
        match structs::job(chunk) {
            Ok((_rest, mut job, files_bytes)) => {
                for sub in scan::split(&files_bytes, &XFER_DELIMITER) {
                    match structs::file(sub) {
                        Ok((_, file)) => job.files.push(file),
                        Err(e) => debug!("{} byte(s) of unreadable file transfer: {e}", sub.len()),
                    }
                }
                if job.file_count != Some(job.files.len() as u32) {
                    warn!(
                        "invalid transfer count: {} found, {:?} expected",
                        job.files.len(),
                        job.file_count
                    );
                }
                out.push(job);
            }
            Err(e) => debug!("{} byte(s) of unknown data: {e}", chunk.len()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::consts::{JOB_DELIMITERS, XFER_HEADER};

    fn pstr(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut buf = (units.len() as u32).to_le_bytes().to_vec();
        for u in units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
        buf
    }

    fn build_single_job() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes()); // type
        buf.extend_from_slice(&0u32.to_le_bytes()); // priority
        buf.extend_from_slice(&0u32.to_le_bytes()); // state
        buf.extend_from_slice(&0u32.to_le_bytes()); // pad
        buf.extend_from_slice(&[0u8; 16]); // job_id
        buf.extend_from_slice(&pstr("name"));
        buf.extend_from_slice(&pstr("desc"));
        buf.extend_from_slice(&pstr("cmd"));
        buf.extend_from_slice(&pstr("args"));
        buf.extend_from_slice(&pstr("S-1-5-18"));
        buf.extend_from_slice(&1u32.to_le_bytes()); // flags
        buf.extend_from_slice(&XFER_HEADER);
        buf.extend_from_slice(&0u32.to_le_bytes()); // file_count
        buf.extend_from_slice(&XFER_HEADER);
        // metadata: zero errors, zero counts, zero times
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&[0u8; 14]);
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf
    }

    #[test]
    fn parses_one_clean_job() {
        let delim = JOB_DELIMITERS[0].1;
        let mut clean = build_single_job();
        clean.extend_from_slice(&delim);
        let jobs = parse(&clean, &delim);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].sid.as_deref(), Some("S-1-5-18"));
        assert_eq!(jobs[0].file_count, Some(0));
        assert!(jobs[0].files.is_empty());
    }

    #[test]
    fn garbage_chunk_is_skipped() {
        let delim = JOB_DELIMITERS[0].1;
        let mut clean = b"not a job".to_vec();
        clean.extend_from_slice(&delim);
        assert!(parse(&clean, &delim).is_empty());
    }
}
