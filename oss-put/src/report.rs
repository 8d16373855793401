//! Plain-text summary printed at the end of a run.

use std::time::Duration;

use oss_put_core::UploadStats;

pub fn render(stats: &UploadStats, bucket: &str, elapsed: Duration) -> String {
    let mut out = format!(
        "\n=== Upload Summary ===\n\
         - bucket: {bucket}\n\
         - total folder count: {}\n\
         - total file count: {}\n\
         - total size: {:.2} MB\n\
         - total time: {:.2} s\n",
        stats.folder_count,
        stats.file_count,
        stats.total_bytes as f64 / 1024.0 / 1024.0,
        elapsed.as_secs_f64(),
    );

    if stats.has_failures() {
        out.push_str(&format!("Failed uploads: {}\n", stats.failed_files.len()));
        for path in &stats.failed_files {
            out.push_str(&format!("  - {}\n", path.display()));
        }
    }
    out
}
