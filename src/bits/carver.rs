//! Heuristic recovery of jobs from a queue file too damaged for the clean
//! path to decode in full. Ported from `original_source/bits/carver.py`,
//! kept close to its stage structure (queue split, job split, section split
//! processed tail-to-head, per-section classification, pivot-based deep
//! carving, reverse Pascal-UTF16 scanning) but expressed as the same
//! byte-cursor combinators `structs`/`fields` already use.

use std::collections::HashMap;

use log::debug;

use crate::bits::consts::{FILE_HEADER, QUEUE_HEADER, XFER_HEADER};
use crate::bits::fields::decode_utf16le;
use crate::bits::job::{File, Flags, Job, JobType, Priority, State};
use crate::bits::scan;
use crate::bits::structs;

/// "S-1-" in UTF-16LE: the start of a Windows SID string, used as a pivot
/// marker for locating a `CONTROL` fragment inside unstructured bytes.
const SID_MARKER: [u8; 8] = [0x53, 0x00, 0x2D, 0x00, 0x31, 0x00, 0x2D, 0x00];

/// ".tmp" in UTF-16LE: the suffix BITS appends to in-progress destination
/// filenames, used as a pivot marker for locating a `FILE` fragment.
const TMP_MARKER: [u8; 8] = [0x2E, 0x00, 0x74, 0x00, 0x6D, 0x00, 0x70, 0x00];

/// Splits raw bytes on [`QUEUE_HEADER`], the outermost framing a queue file
/// can be recovered from even when everything past it is scrambled.
pub fn carve_queues(data: &[u8]) -> Vec<&[u8]> {
    scan::split(data, &QUEUE_HEADER)
}

/// Splits one queue candidate into job candidates on `delimiter`. Without a
/// chosen delimiter the whole candidate is treated as a single job.
pub fn carve_jobs<'a>(data: &'a [u8], delimiter: Option<&[u8; 16]>) -> Vec<&'a [u8]> {
    match delimiter {
        Some(d) => scan::split(data, d),
        None => vec![data],
    }
}

/// Carves every job recoverable from `data`, trying `delimiter` (if any) to
/// split job candidates before falling back to whole-queue candidates.
pub fn carve(data: &[u8], delimiter: Option<[u8; 16]>) -> Vec<Job> {
    let mut out = Vec::new();
    for b_queue in carve_queues(data) {
        for b_job in carve_jobs(b_queue, delimiter.as_ref()) {
            let (mut job, lost_bytes) = carve_sections(b_job);
            if lost_bytes > 0 {
                debug!("{lost_bytes} byte(s) of unrecoverable section data");
            }
            if job.is_trivially_empty() {
                continue;
            }
            job.carved = true;
            out.push(job);
        }
    }
    out
}

/// Splits a job candidate on [`XFER_HEADER`] and classifies each section in
/// reverse order (tail of the job first), accumulating fields into a single
/// [`Job`]. A field already set by an earlier (later-processed) section is
/// never overwritten.
fn carve_sections(data: &[u8]) -> (Job, usize) {
    let sections = scan::split(data, &XFER_HEADER);
    let mut job = Job::default();
    let mut lost_bytes = 0usize;

    for section in sections.iter().rev() {
        if try_transfers_section(section, &mut job) {
            continue;
        }
        if try_metadata_section(section, &mut job) {
            continue;
        }
        let deep = deep_carving(section);
        if deep.is_empty() {
            lost_bytes += section.len();
        } else {
            merge_deep(&mut job, deep);
        }
    }
    (job, lost_bytes)
}

/// Stage 1: does this section look like a run of `FILE` records? Requires
/// a plausible leading `file_count` (each record is at least 37 bytes) and
/// recovers records by incrementing the offset by one byte past any that
/// fail to decode, abandoning after 16 consecutive single-byte shifts
/// without progress.
fn try_transfers_section(section: &[u8], job: &mut Job) -> bool {
    if section.len() < 4 {
        return false;
    }
    let file_count = u32::from_le_bytes(section[..4].try_into().unwrap());
    if (file_count as u64).saturating_mul(37) >= section.len() as u64 {
        return false;
    }

    let mut files = Vec::new();
    let mut offset = 4usize;
    let mut consecutive_shifts = 0u32;
    while files.len() < file_count as usize && offset < section.len() {
        match structs::file(&section[offset..]) {
            Ok((rest, f)) => {
                consecutive_shifts = 0;
                let consumed = (section.len() - offset).saturating_sub(rest.len()).max(1);
                if !f.is_empty() {
                    files.push(f);
                }
                offset += consumed;
            }
            Err(_) => {
                offset += 1;
                consecutive_shifts += 1;
                if consecutive_shifts >= 16 {
                    break;
                }
            }
        }
    }
    if files.is_empty() {
        return false;
    }
    if job.file_count.is_none() {
        job.file_count = Some(file_count);
    }
    if job.files.is_empty() {
        job.files = files;
    }
    true
}

/// Stage 2: does this section decode whole as `METADATA`?
fn try_metadata_section(section: &[u8], job: &mut Job) -> bool {
    let (_, meta) = match structs::metadata(section) {
        Ok(v) => v,
        Err(_) => return false,
    };
    if job.errors.is_empty() {
        job.errors = meta.errors;
    }
    if job.transient_error_count.is_none() {
        job.transient_error_count = Some(meta.transient_error_count);
    }
    if job.retry_delay.is_none() {
        job.retry_delay = Some(meta.retry_delay);
    }
    if job.timeout.is_none() {
        job.timeout = Some(meta.timeout);
    }
    if job.ctime.is_none() {
        job.ctime = Some(meta.ctime);
    }
    if job.mtime.is_none() {
        job.mtime = Some(meta.mtime);
    }
    if job.other_time0.is_none() {
        job.other_time0 = Some(meta.other_time0);
    }
    if job.other_time1.is_none() {
        job.other_time1 = Some(meta.other_time1);
    }
    if job.other_time2.is_none() {
        job.other_time2 = Some(meta.other_time2);
    }
    true
}

/// Partial fields recovered by stage 3 (deep carving), merged onto the
/// section's job only where not already set.
#[derive(Default)]
struct DeepCarved {
    job_type: Option<JobType>,
    priority: Option<Priority>,
    state: Option<State>,
    job_id: Option<String>,
    name: Option<String>,
    desc: Option<String>,
    cmd: Option<String>,
    args: Option<String>,
    sid: Option<String>,
    flags: Option<Flags>,
    file_count: Option<u32>,
    files: Vec<File>,
}

impl DeepCarved {
    fn is_empty(&self) -> bool {
        self.job_type.is_none()
            && self.priority.is_none()
            && self.state.is_none()
            && self.job_id.is_none()
            && self.name.is_none()
            && self.desc.is_none()
            && self.cmd.is_none()
            && self.args.is_none()
            && self.sid.is_none()
            && self.flags.is_none()
            && self.file_count.is_none()
            && self.files.is_empty()
    }
}

fn merge_deep(job: &mut Job, deep: DeepCarved) {
    if job.job_type.is_none() {
        job.job_type = deep.job_type;
    }
    if job.priority.is_none() {
        job.priority = deep.priority;
    }
    if job.state.is_none() {
        job.state = deep.state;
    }
    if job.job_id.is_none() {
        job.job_id = deep.job_id;
    }
    if job.name.is_none() {
        job.name = deep.name;
    }
    if job.desc.is_none() {
        job.desc = deep.desc;
    }
    if job.cmd.is_none() {
        job.cmd = deep.cmd;
    }
    if job.args.is_none() {
        job.args = deep.args;
    }
    if job.sid.is_none() {
        job.sid = deep.sid;
    }
    if job.flags.is_none() {
        job.flags = deep.flags;
    }
    if job.file_count.is_none() {
        job.file_count = deep.file_count;
    }
    if job.files.is_empty() {
        job.files = deep.files;
    }
}

/// Stage 3: hunt for a SID or `.tmp` marker and carve outward from it. A
/// section matching neither marker yields nothing and its bytes are lost.
fn deep_carving(data: &[u8]) -> DeepCarved {
    let data = data.strip_prefix(&FILE_HEADER).unwrap_or(data);

    if let Some(sid_idx) = find_subslice(data, &SID_MARKER) {
        control_deep_carving(data, sid_idx as isize - 4)
    } else if let Some(tmp_idx) = find_subslice(data, &TMP_MARKER) {
        files_deep_carving(data, tmp_idx as isize + 10)
    } else {
        DeepCarved::default()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `data` at `pivot`, following Python slice semantics: a negative
/// pivot counts back from the end, and any out-of-range pivot clamps to the
/// nearest bound instead of panicking.
fn split_at_pivot(data: &[u8], pivot: isize) -> (&[u8], &[u8]) {
    let len = data.len() as isize;
    let p = if pivot < 0 { (len + pivot).max(0) } else { pivot.min(len) };
    data.split_at(p as usize)
}

/// A SID marker anchors the tail of a `CONTROL` fragment: `args`/`cmd`/
/// `desc`/`name` are recovered by scanning backward from the pivot, then
/// `CONTROL_PART_0` (if exactly 32 bytes remain before them) and
/// `CONTROL_PART_1` (the SID and flags, at or after the pivot) are applied.
fn control_deep_carving(data: &[u8], pivot: isize) -> DeepCarved {
    let (partial, remains) = split_at_pivot(data, pivot);
    let (mut rv, sub_data) = reverse_carve_pascal_utf16(partial, &["args", "cmd", "desc", "name"]);

    let mut out = DeepCarved {
        args: rv.remove("args"),
        cmd: rv.remove("cmd"),
        desc: rv.remove("desc"),
        name: rv.remove("name"),
        ..DeepCarved::default()
    };

    if let Some(sub) = sub_data {
        if sub.len() == 32 {
            if let Ok((_, part0)) = structs::control_part_0(&sub) {
                out.job_type = Some(part0.job_type);
                out.priority = Some(part0.priority);
                out.state = Some(part0.state);
                out.job_id = Some(part0.job_id);
            }
        }
    }
    if let Ok((_, part1)) = structs::control_part_1(remains) {
        out.sid = Some(part1.sid);
        out.flags = Some(part1.flags);
    }
    out
}

/// A `.tmp` marker anchors the tail of a `FILE` fragment: `tmp_fn`/`src_fn`/
/// `dest_fn` are recovered by scanning backward from the pivot, then
/// `FILE_PART_0` and as many subsequent whole `FILE` records as will decode
/// are read forward from the pivot.
fn files_deep_carving(data: &[u8], pivot: isize) -> DeepCarved {
    let mut out = DeepCarved::default();
    let (partial, mut remains) = split_at_pivot(data, pivot);
    let (mut rv, _) = reverse_carve_pascal_utf16(partial, &["tmp_fn", "src_fn", "dest_fn"]);
    if rv.is_empty() {
        return out;
    }

    let mut files = vec![File {
        dest_fn: rv.remove("dest_fn"),
        src_fn: rv.remove("src_fn"),
        tmp_fn: rv.remove("tmp_fn"),
        ..File::default()
    }];

    match structs::file_part_0(remains) {
        Ok((rest, part0)) => {
            files[0].download_size = Some(part0.download_size);
            files[0].transfer_size = part0.transfer_size;
            files[0].drive = Some(part0.drive);
            files[0].vol_guid = Some(part0.vol_guid);
            remains = rest;
        }
        Err(_) => {
            out.file_count = Some(files.len() as u32);
            out.files = files;
            return out;
        }
    }

    while !remains.is_empty() {
        match structs::file(remains) {
            Ok((rest, f)) => {
                files.push(f);
                remains = rest;
            }
            Err(_) => break,
        }
    }
    out.file_count = Some(files.len() as u32);
    out.files = files;
    out
}

/// Reverse-scans `data` for a sequence of length-prefixed UTF-16LE strings,
/// one per entry in `fields` (innermost/closest-to-the-end first). For each
/// field, walks backward two bytes at a time looking for a position whose
/// `u32` length prefix is consistent with the bytes remaining to the end of
/// `data`; on a match the string is recovered and `data` truncated to
/// exclude it before moving to the next field.
///
/// If no consistent position is found for a field, gives up on the
/// remaining fields and instead tries to recover a UTF-8 tail of growing
/// length for the current field, stopping at the first invalid byte
/// sequence (the "unrecoverable tail" fallback).
fn reverse_carve_pascal_utf16<'a>(
    mut data: &'a [u8],
    fields: &[&str],
) -> (HashMap<String, String>, Option<&'a [u8]>) {
    let mut rv = HashMap::new();
    let mut remaining: Option<&[u8]> = None;

    for &field in fields {
        let mut found = None;
        let mut i = data.len() as isize - 4;
        while i >= 0 {
            let iu = i as usize;
            if let Some(s) = try_pascal_utf16_at(data, iu) {
                found = Some((iu, s));
                break;
            }
            i -= 2;
        }

        if let Some((iu, s)) = found {
            rv.insert(field.to_string(), s);
            data = &data[..iu];
            remaining = Some(data);
        } else {
            remaining = None;
            let mut j = 2usize;
            while j < data.len() {
                let tail = &data[data.len() - j..];
                let stripped: Vec<u8> = tail.iter().copied().filter(|&b| b != 0).collect();
                match std::str::from_utf8(&stripped) {
                    Ok(s) => {
                        if !s.is_empty() {
                            rv.insert(field.to_string(), s.to_string());
                        }
                    }
                    Err(_) => break,
                }
                j += 2;
            }
            break;
        }
    }
    (rv, remaining)
}

fn try_pascal_utf16_at(data: &[u8], i: usize) -> Option<String> {
    if i + 4 > data.len() {
        return None;
    }
    let n = u32::from_le_bytes(data[i..i + 4].try_into().unwrap()) as usize;
    let needed = 4 + n * 2;
    if i + needed > data.len() {
        return None;
    }
    Some(decode_utf16le(&data[i + 4..i + needed]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::consts::JOB_DELIMITERS;

    fn pstr(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let mut buf = (units.len() as u32).to_le_bytes().to_vec();
        for u in units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
        buf
    }

    #[test]
    fn carve_jobs_without_delimiter_is_whole_candidate() {
        let data = b"anything";
        assert_eq!(carve_jobs(data, None), vec![&data[..]]);
    }

    #[test]
    fn carve_jobs_with_delimiter_splits() {
        let delim = JOB_DELIMITERS[0].1;
        let mut buf = b"one".to_vec();
        buf.extend_from_slice(&delim);
        buf.extend_from_slice(b"two");
        assert_eq!(carve_jobs(&buf, Some(&delim)), vec![&b"one"[..], &b"two"[..]]);
    }

    #[test]
    fn reverse_carve_recovers_pascal_strings() {
        let mut buf = pstr("C:\\out.bin");
        buf.extend_from_slice(&pstr("http://example/out.bin"));
        buf.extend_from_slice(&pstr("C:\\out.bin.tmp"));
        let (rv, remains) =
            reverse_carve_pascal_utf16(&buf, &["tmp_fn", "src_fn", "dest_fn"]);
        assert_eq!(rv.get("tmp_fn").map(String::as_str), Some("C:\\out.bin.tmp"));
        assert_eq!(rv.get("src_fn").map(String::as_str), Some("http://example/out.bin"));
        assert_eq!(rv.get("dest_fn").map(String::as_str), Some("C:\\out.bin"));
        assert_eq!(remains, Some(&[][..]));
    }

    #[test]
    fn reverse_carve_falls_back_to_utf8_tail_on_noise() {
        let mut buf = vec![0xFF, 0xFE, 0xFD];
        buf.extend_from_slice(b"trailing-ascii");
        let (rv, remains) = reverse_carve_pascal_utf16(&buf, &["name"]);
        assert!(remains.is_none());
        assert!(rv.get("name").map_or(false, |s| s.ends_with("trailing-ascii")));
    }

    #[test]
    fn deep_carving_finds_sid_marker() {
        let mut buf = pstr("args");
        buf.extend_from_slice(&pstr("cmd"));
        buf.extend_from_slice(&pstr("desc"));
        buf.extend_from_slice(&pstr("name"));
        buf.extend_from_slice(&pstr("S-1-5-18"));
        buf.extend_from_slice(&1u32.to_le_bytes());
        let deep = deep_carving(&buf);
        assert_eq!(deep.sid.as_deref(), Some("S-1-5-18"));
        assert_eq!(deep.name.as_deref(), Some("name"));
    }

    #[test]
    fn carve_sections_recovers_transfers_section() {
        let mut file_bytes = Vec::new();
        file_bytes.extend_from_slice(&pstr("C:\\out.bin"));
        file_bytes.extend_from_slice(&pstr("http://example/out.bin"));
        file_bytes.extend_from_slice(&pstr("C:\\out.bin.tmp"));
        file_bytes.extend_from_slice(&10u64.to_le_bytes());
        file_bytes.extend_from_slice(&10u64.to_le_bytes());
        file_bytes.push(0);
        file_bytes.extend_from_slice(&pstr("C:"));
        file_bytes.extend_from_slice(&pstr("{GUID}"));

        let mut section = 1u32.to_le_bytes().to_vec();
        section.extend_from_slice(&file_bytes);

        let mut job_bytes = Vec::new();
        job_bytes.extend_from_slice(&XFER_HEADER);
        job_bytes.extend_from_slice(&section);

        let (job, lost) = carve_sections(&job_bytes);
        assert_eq!(lost, 0);
        assert_eq!(job.file_count, Some(1));
        assert_eq!(job.files.len(), 1);

        let expected = crate::bits::job::File {
            dest_fn: Some("C:\\out.bin".to_string()),
            src_fn: Some("http://example/out.bin".to_string()),
            tmp_fn: Some("C:\\out.bin.tmp".to_string()),
            download_size: Some(10),
            transfer_size: Some(10),
            drive: Some("C:".to_string()),
            vol_guid: Some("{GUID}".to_string()),
        };
        pretty_assertions::assert_eq!(job.files[0], expected);
    }

    #[test]
    fn section_with_unrepresentable_filetime_is_not_accepted_as_metadata() {
        use crate::bits::consts::METADATA_PAD_LEN;

        let mut section = 0u32.to_le_bytes().to_vec(); // error_count = 0
        section.extend_from_slice(&0u32.to_le_bytes()); // transient_error_count
        section.extend_from_slice(&0u32.to_le_bytes()); // retry_delay
        section.extend_from_slice(&0u32.to_le_bytes()); // timeout
        section.extend_from_slice(&u64::MAX.to_le_bytes()); // ctime: unrepresentable
        section.extend_from_slice(&0u64.to_le_bytes()); // mtime
        section.extend_from_slice(&0u64.to_le_bytes()); // other_time0
        section.extend_from_slice(&[0u8; METADATA_PAD_LEN]);
        section.extend_from_slice(&0u64.to_le_bytes()); // other_time1
        section.extend_from_slice(&0u64.to_le_bytes()); // other_time2

        let mut job_bytes = Vec::new();
        job_bytes.extend_from_slice(&XFER_HEADER);
        job_bytes.extend_from_slice(&section);

        let (job, lost) = carve_sections(&job_bytes);
        // rejected by both stage 1 (no file records) and stage 2 (bad
        // FILETIME), falls to stage 3 which finds no marker either.
        assert_eq!(lost, section.len());
        assert!(job.ctime.is_none());
        assert!(job.mtime.is_none());
    }
}
