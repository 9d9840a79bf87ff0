//! Disk-image sampler: scans a raw image for a byte pattern with a rolling
//! dual 512-byte buffer, then reads a `radiance`-KiB window of context
//! around each hit. Ported from `original_source/bits/sampler.py`'s
//! `_radiance_read`/`sample_disk`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::info;

use crate::error::Result;

const SCAN_BUF_SIZE: usize = 512;

/// Scans `img_path` for `pattern`, yielding one byte sample per hit: the
/// `radiance`-KiB of data preceding the hit, through to the last occurrence
/// of `pattern` within `radiance` KiB following it (or end of file).
pub fn sample_disk(img_path: &Path, pattern: &[u8], radiance_kib: u64) -> Result<Vec<Vec<u8>>> {
    info!("disk analysis of {}", img_path.display());
    info!("search for pattern 0x{} R:{radiance_kib}", hex_upper(pattern));

    let mut f = File::open(img_path)?;
    let mut samples = Vec::new();

    let mut buf0 = vec![0u8; SCAN_BUF_SIZE];
    let mut buf1 = vec![0u8; SCAN_BUF_SIZE];

    loop {
        let n = f.read(&mut buf1)?;
        if n == 0 {
            break;
        }

        let mut data = buf0.clone();
        data.extend_from_slice(&buf1);

        let search_from = (SCAN_BUF_SIZE - 1).saturating_sub(pattern.len());
        if let Some(rel) = find_from(&data, pattern, search_from) {
            let pos = f.stream_position()? as i64;
            let abs_offset = pos - (SCAN_BUF_SIZE as i64 * 2) + rel as i64;
            let start_offset = (abs_offset - (radiance_kib as i64 * 1024)).max(0) as u64;
            samples.push(radiance_read(&mut f, start_offset, pattern, radiance_kib)?);
        }

        std::mem::swap(&mut buf0, &mut buf1);
    }

    info!("disk analysis complete");
    Ok(samples)
}

/// Reads forward from `start_offset`, keeping a window of `radiance` KiB on
/// both sides of every occurrence of `pattern`, stopping at the first
/// `radiance`-KiB chunk with no further occurrence (or end of file).
fn radiance_read(f: &mut File, start_offset: u64, pattern: &[u8], radiance_kib: u64) -> Result<Vec<u8>> {
    let radiance_bytes = (radiance_kib * 1024) as usize;
    f.seek(SeekFrom::Start(start_offset))?;
    let mut rv = read_upto(f, radiance_bytes + pattern.len())?;

    loop {
        let chunk = read_upto(f, radiance_bytes)?;
        if chunk.len() < radiance_bytes {
            rv.extend_from_slice(&chunk);
            return Ok(rv);
        }
        match find_last(&chunk, pattern) {
            Some(local_offset) => {
                rv.extend_from_slice(&chunk[..local_offset + pattern.len()]);
                let back = radiance_bytes - (local_offset + pattern.len());
                let cur = f.stream_position()?;
                f.seek(SeekFrom::Start(cur - back as u64))?;
            }
            None => {
                rv.extend_from_slice(&chunk);
                return Ok(rv);
            }
        }
    }
}

fn read_upto(f: &mut File, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut total = 0usize;
    while total < n {
        let r = f.read(&mut buf[total..])?;
        if r == 0 {
            break;
        }
        total += r;
    }
    buf.truncate(total);
    Ok(buf)
}

fn find_from(data: &[u8], pattern: &[u8], start: usize) -> Option<usize> {
    if pattern.is_empty() || start >= data.len() || pattern.len() > data.len() - start {
        return None;
    }
    data[start..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|p| p + start)
}

fn find_last(data: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > data.len() {
        return None;
    }
    (0..=data.len() - pattern.len())
        .rev()
        .find(|&i| &data[i..i + pattern.len()] == pattern)
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
