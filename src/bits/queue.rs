//! Queue parser: decodes a structurally valid queue
//! container into a legitimate-jobs block plus a raw-tail block.

use crate::bits::consts::{FILE_HEADER, QUEUE_HEADER};
use crate::bits::fields;
use crate::error::{BitsError, Result};

#[derive(Debug)]
pub struct Queue<'a> {
    pub job_count: u32,
    pub jobs: &'a [u8],
    pub remains: &'a [u8],
}

/// Decodes one `QUEUE` container from the start of `input`.
///
/// On success, `jobs` and `remains` still carry their interior `0x00`
/// padding (stripped later by the caller, as `Orchestrator::ingest` does).
/// Any structural failure is reported as [`BitsError::QueueStructure`],
/// carrying the byte offset into `input` where the read failed.
pub fn parse(input: &[u8]) -> Result<Queue<'_>> {
    let total = input.len();
    let wrap = |rest: &[u8], e: BitsError| BitsError::QueueStructure {
        offset: total - rest.len(),
        message: e.to_string(),
    };

    let (i, _header) = fields::delimited_field(input, &FILE_HEADER).map_err(|e| wrap(input, e))?;
    let i = fields::constant(i, &FILE_HEADER).map_err(|e| wrap(i, e))?;
    let i = fields::constant(i, &QUEUE_HEADER).map_err(|e| wrap(i, e))?;
    let (i, job_count) = fields::u32le(i).map_err(|e| wrap(i, e))?;
    let (i, jobs) = fields::delimited_field(i, &QUEUE_HEADER).map_err(|e| wrap(i, e))?;
    let i = fields::constant(i, &QUEUE_HEADER).map_err(|e| wrap(i, e))?;
    let (i, _unknown) = fields::delimited_field(i, &FILE_HEADER).map_err(|e| wrap(i, e))?;
    let remains = fields::constant(i, &FILE_HEADER).map_err(|e| wrap(i, e))?;
    Ok(Queue {
        job_count,
        jobs,
        remains,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_queue(job_count: u32, jobs: &[u8], remains: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"hdr");
        buf.extend_from_slice(&FILE_HEADER);
        buf.extend_from_slice(&QUEUE_HEADER);
        buf.extend_from_slice(&job_count.to_le_bytes());
        buf.extend_from_slice(jobs);
        buf.extend_from_slice(&QUEUE_HEADER);
        buf.extend_from_slice(&FILE_HEADER);
        buf.extend_from_slice(remains);
        buf
    }

    #[test]
    fn parses_well_formed_queue() {
        let buf = build_queue(1, b"JOBDATA", b"TAIL");
        let q = parse(&buf).unwrap();
        assert_eq!(q.job_count, 1);
        assert_eq!(q.jobs, b"JOBDATA");
        assert_eq!(q.remains, b"TAIL");
    }

    #[test]
    fn empty_queue_has_zero_jobs() {
        let buf = build_queue(0, b"", b"");
        let q = parse(&buf).unwrap();
        assert_eq!(q.job_count, 0);
        assert!(q.jobs.is_empty());
    }

    #[test]
    fn malformed_input_fails() {
        assert!(parse(b"not a queue at all").is_err());
    }

    #[test]
    fn malformed_input_reports_queue_structure_error() {
        assert!(matches!(
            parse(b"not a queue at all").unwrap_err(),
            BitsError::QueueStructure { .. }
        ));
    }
}
