//! Struct decoders: the fixed record layouts that make up a
//! job. Each function takes the remaining input and returns `(rest, value)`,
//! composed the way `orsetii-squige`'s `OptionalHeader64::parse`/
//! `WindowsFields::parse` compose field-by-field reads, just through this
//! crate's [`BitsError`] instead of `nom`'s own error type.

use crate::bits::consts::{METADATA_PAD_LEN, XFER_HEADER};
use crate::bits::fields::{self, pascal_utf16};
use crate::bits::job::{File, Flags, Job, JobError, JobType, Priority, State, TRANSFER_SIZE_UNKNOWN};
use crate::error::{BitsError, Result};

pub struct ControlPart0 {
    pub job_type: JobType,
    pub priority: Priority,
    pub state: State,
    pub job_id: String,
}

pub fn control_part_0(input: &[u8]) -> Result<(&[u8], ControlPart0)> {
    let (i, job_type) = fields::u32le(input)?;
    let (i, priority) = fields::u32le(i)?;
    let (i, state) = fields::u32le(i)?;
    let (i, _pad) = fields::u32le(i)?;
    let (i, job_id) = fields::guid(i)?;
    Ok((
        i,
        ControlPart0 {
            job_type: job_type.into(),
            priority: priority.into(),
            state: state.into(),
            job_id,
        },
    ))
}

pub struct ControlPart1 {
    pub sid: String,
    pub flags: Flags,
}

pub fn control_part_1(input: &[u8]) -> Result<(&[u8], ControlPart1)> {
    let (i, sid) = pascal_utf16(input)?;
    let (i, flags) = fields::u32le(i)?;
    Ok((
        i,
        ControlPart1 {
            sid,
            flags: flags.into(),
        },
    ))
}

pub struct Control {
    pub part0: ControlPart0,
    pub name: String,
    pub desc: String,
    pub cmd: String,
    pub args: String,
    pub part1: ControlPart1,
    pub access_token: Vec<u8>,
}

pub fn control(input: &[u8]) -> Result<(&[u8], Control)> {
    let (i, part0) = control_part_0(input)?;
    let (i, name) = pascal_utf16(i)?;
    let (i, desc) = pascal_utf16(i)?;
    let (i, cmd) = pascal_utf16(i)?;
    let (i, args) = pascal_utf16(i)?;
    let (i, part1) = control_part_1(i)?;
    let (i, access_token) = fields::delimited_field(i, &XFER_HEADER)?;
    Ok((
        i,
        Control {
            part0,
            name,
            desc,
            cmd,
            args,
            part1,
            access_token: access_token.to_vec(),
        },
    ))
}

pub struct FilePart0 {
    pub download_size: u64,
    pub transfer_size: Option<u64>,
    pub drive: String,
    pub vol_guid: String,
}

pub fn file_part_0(input: &[u8]) -> Result<(&[u8], FilePart0)> {
    let (i, download_size) = fields::u64le(input)?;
    let (i, transfer_size) = fields::u64le(i)?;
    let (i, _byte) = fields::u8(i)?;
    let (i, drive) = pascal_utf16(i)?;
    let (i, vol_guid) = pascal_utf16(i)?;
    let transfer_size = if transfer_size == TRANSFER_SIZE_UNKNOWN {
        None
    } else {
        Some(transfer_size)
    };
    Ok((
        i,
        FilePart0 {
            download_size,
            transfer_size,
            drive,
            vol_guid,
        },
    ))
}

/// Realigns the cursor to the start of `dest_fn`'s length prefix by finding
/// the first raw `:` byte (the low byte of the UTF-16LE drive-letter colon,
/// e.g. `C:\...`) and stepping back 6 bytes: 4 for the `u32` length prefix,
/// 2 for the first UTF-16 code unit preceding the colon.
fn realign_to_dest_fn(input: &[u8]) -> Result<&[u8]> {
    let pos = input
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| BitsError::ShortInput {
            needed: 1,
            available: input.len(),
        })?;
    if pos < 6 {
        return Err(BitsError::ShortInput {
            needed: 6,
            available: pos,
        });
    }
    Ok(&input[pos - 6..])
}

/// Decodes one file-transfer record. Failures are reported as
/// [`BitsError::FileDecode`], carrying the byte offset into `input` where
/// the read failed.
pub fn file(input: &[u8]) -> Result<(&[u8], File)> {
    let total = input.len();
    let wrap = |rest: &[u8], e: BitsError| BitsError::FileDecode {
        offset: total - rest.len(),
        message: e.to_string(),
    };

    let aligned = realign_to_dest_fn(input).map_err(|e| wrap(input, e))?;
    let (i, dest_fn) = pascal_utf16(aligned).map_err(|e| wrap(aligned, e))?;
    let (i, src_fn) = pascal_utf16(i).map_err(|e| wrap(i, e))?;
    let (i, tmp_fn) = pascal_utf16(i).map_err(|e| wrap(i, e))?;
    let (i, part0) = file_part_0(i).map_err(|e| wrap(i, e))?;
    Ok((
        i,
        File {
            dest_fn: Some(dest_fn),
            src_fn: Some(src_fn),
            tmp_fn: Some(tmp_fn),
            download_size: Some(part0.download_size),
            transfer_size: part0.transfer_size,
            drive: Some(part0.drive),
            vol_guid: Some(part0.vol_guid),
        },
    ))
}

pub fn error_record(input: &[u8]) -> Result<(&[u8], JobError)> {
    let (i, code) = fields::u64le(input)?;
    let (i, stat1) = fields::u32le(i)?;
    let (i, stat2) = fields::u32le(i)?;
    let (i, stat3) = fields::u32le(i)?;
    let (i, stat4) = fields::u32le(i)?;
    let (i, _byte) = fields::u8(i)?;
    Ok((
        i,
        JobError {
            code,
            stat1,
            stat2,
            stat3,
            stat4,
        },
    ))
}

/// Metadata fields, merged directly onto a [`Job`] by the caller (mirrors
/// the original's `Embedded(METADATA)` struct-spread).
#[derive(Debug)]
pub struct Metadata {
    pub errors: Vec<JobError>,
    pub transient_error_count: u32,
    pub retry_delay: u32,
    pub timeout: u32,
    pub ctime: chrono::DateTime<chrono::Utc>,
    pub mtime: chrono::DateTime<chrono::Utc>,
    pub other_time0: chrono::DateTime<chrono::Utc>,
    pub other_time1: chrono::DateTime<chrono::Utc>,
    pub other_time2: chrono::DateTime<chrono::Utc>,
}

/// Decodes the `METADATA` block. Failures are reported as
/// [`BitsError::MetadataDecode`], carrying the byte offset into `input`
/// where the read failed — in particular, a `FILETIME` too far in the
/// future to represent (see [`fields::filetime`]) fails here rather than
/// being accepted with a bogus timestamp.
pub fn metadata(input: &[u8]) -> Result<(&[u8], Metadata)> {
    let total = input.len();
    let wrap = |rest: &[u8], e: BitsError| BitsError::MetadataDecode {
        offset: total - rest.len(),
        message: e.to_string(),
    };

    let (mut i, error_count) = fields::u32le(input).map_err(|e| wrap(input, e))?;
    let mut errors = Vec::with_capacity(error_count as usize);
    for _ in 0..error_count {
        let (rest, e) = error_record(i).map_err(|e| wrap(i, e))?;
        errors.push(e);
        i = rest;
    }
    let (i, transient_error_count) = fields::u32le(i).map_err(|e| wrap(i, e))?;
    let (i, retry_delay) = fields::u32le(i).map_err(|e| wrap(i, e))?;
    let (i, timeout) = fields::u32le(i).map_err(|e| wrap(i, e))?;
    let (i, ctime) = fields::filetime(i).map_err(|e| wrap(i, e))?;
    let (i, mtime) = fields::filetime(i).map_err(|e| wrap(i, e))?;
    let (i, other_time0) = fields::filetime(i).map_err(|e| wrap(i, e))?;
    let (i, _pad) = fields::take(i, METADATA_PAD_LEN).map_err(|e| wrap(i, e))?;
    let (i, other_time1) = fields::filetime(i).map_err(|e| wrap(i, e))?;
    let (i, other_time2) = fields::filetime(i).map_err(|e| wrap(i, e))?;
    Ok((
        i,
        Metadata {
            errors,
            transient_error_count,
            retry_delay,
            timeout,
            ctime,
            mtime,
            other_time0,
            other_time1,
            other_time2,
        },
    ))
}

/// Decodes a full job: `CONTROL`, file transfers delimited by `XFER_HEADER`,
/// then `METADATA`. The caller is responsible for re-splitting the
/// `files` byte range on `XFER_DELIMITER`.
pub struct RawJob {
    pub control: Control,
    pub file_count: u32,
    pub files_bytes: Vec<u8>,
}

pub fn job_header(input: &[u8]) -> Result<(&[u8], RawJob)> {
    let (i, control) = control(input)?;
    let i = fields::constant(i, &XFER_HEADER)?;
    let (i, file_count) = fields::u32le(i)?;
    let (i, files_bytes) = fields::delimited_field(i, &XFER_HEADER)?;
    let i = fields::constant(i, &XFER_HEADER)?;
    Ok((
        i,
        RawJob {
            control,
            file_count,
            files_bytes: files_bytes.to_vec(),
        },
    ))
}

/// Fully decodes one job chunk's header and metadata, with no tolerance for
/// trailing garbage (the clean path). Returns the assembled [`Job`]
/// (with `files` still empty) plus the raw file-transfers byte range, which
/// the caller splits on `XFER_DELIMITER` (owned by [`crate::bits::scan`])
/// and decodes with [`file`]. Failures are reported as
/// [`BitsError::JobDecode`], carrying the byte offset into `input` where
/// the read failed.
pub fn job(input: &[u8]) -> Result<(&[u8], Job, Vec<u8>)> {
    let total = input.len();
    let wrap = |rest: &[u8], e: BitsError| BitsError::JobDecode {
        offset: total - rest.len(),
        message: e.to_string(),
    };

    let (i, raw) = job_header(input).map_err(|e| wrap(input, e))?;
    let (i, meta) = metadata(i).map_err(|e| wrap(i, e))?;

    let j = Job {
        job_id: Some(raw.control.part0.job_id),
        job_type: Some(raw.control.part0.job_type),
        priority: Some(raw.control.part0.priority),
        state: Some(raw.control.part0.state),
        name: Some(raw.control.name),
        desc: Some(raw.control.desc),
        cmd: Some(raw.control.cmd),
        args: Some(raw.control.args),
        sid: Some(raw.control.part1.sid),
        flags: Some(raw.control.part1.flags),
        access_token: Some(raw.control.access_token),
        file_count: Some(raw.file_count),
        files: Vec::new(),
        errors: meta.errors,
        transient_error_count: Some(meta.transient_error_count),
        retry_delay: Some(meta.retry_delay),
        timeout: Some(meta.timeout),
        ctime: Some(meta.ctime),
        mtime: Some(meta.mtime),
        other_time0: Some(meta.other_time0),
        other_time1: Some(meta.other_time1),
        other_time2: Some(meta.other_time2),
        carved: false,
    };
    Ok((i, j, raw.files_bytes))
}
