use clap::Parser;

/// Extracts BITS job records from a `qmgr*.dat` queue file, or from a raw
/// disk image when `--sample` is given.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Queue file, or disk image when `--sample` is used.
    pub input: std::path::PathBuf,

    /// Destination CSV file.
    pub output: std::path::PathBuf,

    /// Force the job delimiter instead of picking the most frequent one,
    /// as 32 hex characters (16 bytes).
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<[u8; 16]>,

    /// Run in disk-sampler mode: treat `input` as a raw image and scan it
    /// for this hex-encoded byte pattern.
    #[arg(long, value_parser = parse_hex_pattern)]
    pub sample: Option<Vec<u8>>,

    /// Sampler half-width, in KiB, kept around each pattern hit.
    #[arg(long, default_value_t = 4096)]
    pub radiance: u64,

    /// Raise log verbosity (info, then debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_hex_pattern(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("pattern must have an even number of hex digits".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

fn parse_delimiter(s: &str) -> Result<[u8; 16], String> {
    let bytes = parse_hex_pattern(s)?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| format!("delimiter must be 32 hex characters (16 bytes), got {}", v.len()))
}
