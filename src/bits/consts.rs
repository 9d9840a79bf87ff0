//! Known constants: container/section delimiters, per-version job
//! delimiters, and the informational Windows-version hint table.
//!
//! Bit-exact, little-endian on disk.

/// Marks the start and end of a `QUEUE` container.
pub const FILE_HEADER: [u8; 16] = [
    0x13, 0xF7, 0x2B, 0xC8, 0x40, 0x99, 0x12, 0x4A, 0x9F, 0x1A, 0x3A, 0xAE, 0xBD, 0x89, 0x4E, 0xEA,
];

/// Marks the start and end of the job section within a `QUEUE` container.
pub const QUEUE_HEADER: [u8; 16] = [
    0x47, 0x44, 0x5F, 0x00, 0xA9, 0xBD, 0xBA, 0x44, 0x98, 0x51, 0xC4, 0x7B, 0xB6, 0xC0, 0x7A, 0xCE,
];

/// Separates the control section from file transfers, and file transfers
/// from metadata, within a single job.
pub const XFER_HEADER: [u8; 16] = [
    0x36, 0xDA, 0x56, 0x77, 0x6F, 0x51, 0x5A, 0x43, 0xAC, 0xAC, 0x44, 0xA2, 0x48, 0xFF, 0xF3, 0x4D,
];

/// Separates individual file transfers within the file-transfers section.
pub const XFER_DELIMITER: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// One `METADATA` job-decoder constant per BITS on-disk format version.
///
/// Keys are version tags used only for diagnostics; the parser never infers
/// a version, it picks whichever delimiter occurs most often in the input
/// (see [`crate::bits::orchestrator::Orchestrator::choose_delimiter`]).
pub const JOB_DELIMITERS: [(u8, [u8; 16]); 4] = [
    (
        1,
        [
            0x93, 0x36, 0x20, 0x35, 0xA0, 0x0C, 0x10, 0x4A, 0x84, 0xF3, 0xB1, 0x7E, 0x7B, 0x49,
            0x9C, 0xD7,
        ],
    ),
    (
        2,
        [
            0x10, 0x13, 0x70, 0xC8, 0x36, 0x53, 0xB3, 0x41, 0x83, 0xE5, 0x81, 0x55, 0x7F, 0x36,
            0x1B, 0x87,
        ],
    ),
    (
        3,
        [
            0x8C, 0x93, 0xEA, 0x64, 0x03, 0x0F, 0x68, 0x40, 0xB4, 0x6F, 0xF9, 0x7F, 0xE5, 0x1D,
            0x4D, 0xCD,
        ],
    ),
    (
        4,
        [
            0xB3, 0x46, 0xED, 0x3D, 0x3B, 0x10, 0xF9, 0x44, 0xBC, 0x2F, 0xE8, 0x37, 0x8B, 0xD3,
            0x19, 0x86,
        ],
    ),
];

/// Windows-version hints for each BITS format-version tag. Informational
/// only; never consulted by the parser.
pub const WINVER: [(u8, &str); 6] = [
    (0, "NT 5.1"),
    (1, "NT 5.2"),
    (2, "NT 6.0"),
    (3, "NT 6.1"),
    (4, "NT 6.2"),
    (5, "NT 6.3"),
];

/// Padding, in bytes, between `other_time0` and `other_time1` in `METADATA`.
///
/// Fixed at 14 in every BITS version observed (NT 5.1-6.3); parameterized
/// here in case a future version diverges.
pub const METADATA_PAD_LEN: usize = 14;
