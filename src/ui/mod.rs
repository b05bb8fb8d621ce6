mod progress;

use std::collections::BTreeMap;
use std::fmt;
use crate::core::task::{DownloadRecord, DownloadState};
pub use progress::{describe_record, format_progress, record_line};

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("✗ {}", message);
}

/// 按状态统计的记录摘要
#[derive(Debug, Default)]
pub struct RecordSummary {
    pub total: usize,
    pub downloaded_bytes: u64,
    pub by_state: BTreeMap<i32, usize>,
}

impl RecordSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DownloadRecord>) -> Self {
        let mut summary = RecordSummary::default();
        for record in records {
            summary.total += 1;
            summary.downloaded_bytes =
                summary.downloaded_bytes.saturating_add(record.downloaded_bytes());
            *summary.by_state.entry(record.state().code()).or_insert(0) += 1;
        }
        summary
    }

    pub fn count(&self, state: DownloadState) -> usize {
        self.by_state.get(&state.code()).copied().unwrap_or(0)
    }
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n记录摘要:")?;
        writeln!(f, "总任务数: {}", self.total)?;
        writeln!(f, "已下载: {}", format_size(self.downloaded_bytes))?;
        for state in DownloadState::ALL {
            let count = self.count(state);
            if count > 0 {
                writeln!(f, "{}: {}", state, count)?;
            }
        }
        Ok(())
    }
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
