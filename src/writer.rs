//! CSV flattener: one row per file transfer (or one all-default row when a
//! job carries no files), fixed column order, ported from
//! `original_source/bits/writer.py`'s `DEFAULT_VALUES`/`flattener`/
//! `write_csv`.

use std::io::Write;

use crate::bits::job::{File, Job};
use crate::error::Result;

pub const COLUMNS: [&str; 24] = [
    "job_id",
    "name",
    "desc",
    "type",
    "priority",
    "sid",
    "state",
    "cmd",
    "args",
    "file_count",
    "file_id",
    "dest_fn",
    "src_fn",
    "tmp_fn",
    "download_size",
    "transfer_size",
    "drive",
    "vol_guid",
    "ctime",
    "mtime",
    "other_time0",
    "other_time1",
    "other_time2",
    "carved",
];

fn opt_string(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn opt_display<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn opt_timestamp(v: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    v.map(|ts| ts.to_rfc3339()).unwrap_or_default()
}

fn opt_size(v: Option<u64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "-1".to_string(),
    }
}

/// Flattens one job into its output rows: one per file, or a single
/// all-default-file row when the job has none.
fn flatten(job: &Job) -> Vec<[String; 24]> {
    let empty = File::default();
    let files: Vec<&File> = if job.files.is_empty() {
        vec![&empty]
    } else {
        job.files.iter().collect()
    };

    files
        .into_iter()
        .enumerate()
        .map(|(index, f)| {
            [
                opt_string(&job.job_id),
                opt_string(&job.name),
                opt_string(&job.desc),
                opt_display(&job.job_type),
                opt_display(&job.priority),
                opt_string(&job.sid),
                opt_display(&job.state),
                opt_string(&job.cmd),
                opt_string(&job.args),
                job.file_count.map(|n| n.to_string()).unwrap_or_else(|| "0".to_string()),
                index.to_string(),
                opt_string(&f.dest_fn),
                opt_string(&f.src_fn),
                opt_string(&f.tmp_fn),
                opt_size(f.download_size),
                opt_size(f.transfer_size),
                opt_string(&f.drive),
                opt_string(&f.vol_guid),
                opt_timestamp(&job.ctime),
                opt_timestamp(&job.mtime),
                opt_timestamp(&job.other_time0),
                opt_timestamp(&job.other_time1),
                opt_timestamp(&job.other_time2),
                job.carved.to_string(),
            ]
        })
        .collect()
}

/// Writes `jobs` to `out` as CSV with a header row, in [`COLUMNS`] order.
pub fn write_csv<W: Write>(out: W, jobs: &[Job]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(COLUMNS)?;
    for job in jobs {
        for row in flatten(job) {
            w.write_record(&row)?;
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::job::{File, JobType};

    #[test]
    fn job_with_no_files_yields_one_default_row() {
        let job = Job::default();
        let rows = flatten(&job);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][9], "0"); // file_count
        assert_eq!(rows[0][14], "-1"); // download_size
        assert_eq!(rows[0][15], "-1"); // transfer_size
        assert_eq!(rows[0][23], "false"); // carved
    }

    #[test]
    fn job_with_files_yields_one_row_per_file() {
        let mut job = Job::default();
        job.job_type = Some(JobType::Download);
        job.file_count = Some(2);
        job.files = vec![
            File {
                dest_fn: Some("a".into()),
                ..File::default()
            },
            File {
                dest_fn: Some("b".into()),
                ..File::default()
            },
        ];
        let rows = flatten(&job);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][11], "a");
        assert_eq!(rows[1][11], "b");
        assert_eq!(rows[0][3], "download");
    }

    #[test]
    fn write_csv_emits_header_and_rows() {
        let job = Job::default();
        let mut buf = Vec::new();
        write_csv(&mut buf, std::slice::from_ref(&job)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("job_id,name,desc,type"));
        assert!(lines.next().is_some());
    }
}
