//! Domain types produced by the core.
//!
//! Enumerations follow `orsetii-squige`'s `Machine`/`Subsystem` shape: a
//! `#[repr(u32)]` enum with an explicit discriminant per known value, and an
//! `Unknown(u32)` fallback so an unrecognized discriminant is preserved
//! rather than silently discarded.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Download,
    Upload,
    UploadReply,
    Unknown(u32),
}

impl From<u32> for JobType {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Download,
            1 => Self::Upload,
            2 => Self::UploadReply,
            n => Self::Unknown(n),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
            Self::UploadReply => write!(f, "upload_reply"),
            Self::Unknown(n) => write!(f, "unknown({n})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Foreground,
    High,
    Normal,
    Low,
    Unknown(u32),
}

impl From<u32> for Priority {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Foreground,
            1 => Self::High,
            2 => Self::Normal,
            3 => Self::Low,
            n => Self::Unknown(n),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
            Self::Unknown(n) => write!(f, "unknown({n})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Queued,
    Connecting,
    Transferring,
    Suspended,
    Error,
    TransientError,
    Transferred,
    Acknowledged,
    Cancelled,
    Unknown(u32),
}

impl From<u32> for State {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Queued,
            1 => Self::Connecting,
            2 => Self::Transferring,
            3 => Self::Suspended,
            4 => Self::Error,
            5 => Self::TransientError,
            6 => Self::Transferred,
            7 => Self::Acknowledged,
            8 => Self::Cancelled,
            n => Self::Unknown(n),
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Connecting => "connecting",
            Self::Transferring => "transferring",
            Self::Suspended => "suspended",
            Self::Error => "error",
            Self::TransientError => "transient_error",
            Self::Transferred => "transferred",
            Self::Acknowledged => "acknowledged",
            Self::Cancelled => "cancelled",
            Self::Unknown(n) => return write!(f, "unknown({n})"),
        };
        write!(f, "{s}")
    }
}

/// BITS notification-bit combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flags {
    JobTransferred,
    JobError,
    JobTransferredOrError,
    Disable,
    JobTransferredAndDisable,
    JobErrorAndDisable,
    JobTransferredOrErrorAndDisable,
    JobModification,
    FileTransferred,
    Unknown(u32),
}

impl From<u32> for Flags {
    fn from(v: u32) -> Self {
        match v {
            1 => Self::JobTransferred,
            2 => Self::JobError,
            3 => Self::JobTransferredOrError,
            4 => Self::Disable,
            5 => Self::JobTransferredAndDisable,
            6 => Self::JobErrorAndDisable,
            7 => Self::JobTransferredOrErrorAndDisable,
            8 => Self::JobModification,
            16 => Self::FileTransferred,
            n => Self::Unknown(n),
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::JobTransferred => "BG_NOTIFY_JOB_TRANSFERRED",
            Self::JobError => "BG_NOTIFY_JOB_ERROR",
            Self::JobTransferredOrError => {
                "BG_NOTIFY_JOB_TRANSFERRED_BG_NOTIFY_JOB_ERROR"
            }
            Self::Disable => "BG_NOTIFY_DISABLE",
            Self::JobTransferredAndDisable => {
                "BG_NOTIFY_JOB_TRANSFERRED_BG_NOTIFY_DISABLE"
            }
            Self::JobErrorAndDisable => "BG_NOTIFY_JOB_ERROR_BG_NOTIFY_DISABLE",
            Self::JobTransferredOrErrorAndDisable => {
                "BG_NOTIFY_JOB_TRANSFERRED_BG_NOTIFY_JOB_ERROR_BG_NOTIFY_DISABLE"
            }
            Self::JobModification => "BG_NOTIFY_JOB_MODIFICATION",
            Self::FileTransferred => "BG_NOTIFY_FILE_TRANSFERRED",
            Self::Unknown(n) => return write!(f, "unknown({n})"),
        };
        write!(f, "{s}")
    }
}

/// Sentinel raw value of `File::transfer_size` meaning "unknown"; surfaced
/// as `None` rather than the raw `u64`.
pub const TRANSFER_SIZE_UNKNOWN: u64 = 0xFFFF_FFFF_FFFF_FFFF;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct File {
    pub dest_fn: Option<String>,
    pub src_fn: Option<String>,
    pub tmp_fn: Option<String>,
    pub download_size: Option<u64>,
    pub transfer_size: Option<u64>,
    pub drive: Option<String>,
    pub vol_guid: Option<String>,
}

impl File {
    /// True iff every field is absent — used to drop vacuous carved records.
    pub fn is_empty(&self) -> bool {
        self.dest_fn.is_none()
            && self.src_fn.is_none()
            && self.tmp_fn.is_none()
            && self.download_size.is_none()
            && self.transfer_size.is_none()
            && self.drive.is_none()
            && self.vol_guid.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobError {
    pub code: u64,
    pub stat1: u32,
    pub stat2: u32,
    pub stat3: u32,
    pub stat4: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Job {
    pub job_id: Option<String>,
    pub job_type: Option<JobType>,
    pub priority: Option<Priority>,
    pub state: Option<State>,
    pub name: Option<String>,
    pub desc: Option<String>,
    pub cmd: Option<String>,
    pub args: Option<String>,
    pub sid: Option<String>,
    pub flags: Option<Flags>,
    pub access_token: Option<Vec<u8>>,
    pub file_count: Option<u32>,
    pub files: Vec<File>,
    pub errors: Vec<JobError>,
    pub transient_error_count: Option<u32>,
    pub retry_delay: Option<u32>,
    pub timeout: Option<u32>,
    pub ctime: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
    pub other_time0: Option<DateTime<Utc>>,
    pub other_time1: Option<DateTime<Utc>>,
    pub other_time2: Option<DateTime<Utc>>,
    pub carved: bool,
}

impl Job {
    /// True iff at least one top-level field or file/error is populated
    /// for the carver's output filter.
    pub fn any_populated(&self) -> bool {
        self.job_id.is_some()
            || self.job_type.is_some()
            || self.priority.is_some()
            || self.state.is_some()
            || self.name.is_some()
            || self.desc.is_some()
            || self.cmd.is_some()
            || self.args.is_some()
            || self.sid.is_some()
            || self.flags.is_some()
            || self.access_token.is_some()
            || self.file_count.is_some()
            || !self.files.is_empty()
            || !self.errors.is_empty()
            || self.transient_error_count.is_some()
            || self.retry_delay.is_some()
            || self.timeout.is_some()
            || self.ctime.is_some()
            || self.mtime.is_some()
            || self.other_time0.is_some()
            || self.other_time1.is_some()
            || self.other_time2.is_some()
    }

    /// True iff this record carries no information worth yielding: either
    /// nothing at all, or exactly one wholly-empty file and nothing else.
    pub fn is_trivially_empty(&self) -> bool {
        if !self.any_populated() {
            return true;
        }
        let only_one_empty_file = self.file_count == Some(1)
            && self.files.len() == 1
            && self.files[0].is_empty()
            && self.job_id.is_none()
            && self.job_type.is_none()
            && self.priority.is_none()
            && self.state.is_none()
            && self.name.is_none()
            && self.desc.is_none()
            && self.cmd.is_none()
            && self.args.is_none()
            && self.sid.is_none()
            && self.flags.is_none()
            && self.access_token.is_none()
            && self.errors.is_empty()
            && self.transient_error_count.is_none()
            && self.retry_delay.is_none()
            && self.timeout.is_none()
            && self.ctime.is_none()
            && self.mtime.is_none()
            && self.other_time0.is_none()
            && self.other_time1.is_none()
            && self.other_time2.is_none();
        only_one_empty_file
    }
}
