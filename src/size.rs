//! Size measurement and parsing helpers.

use crate::error::{Result, SweeperError};
use std::path::Path;
use walkdir::WalkDir;

/// Sum of file sizes under `path`, without following symlinks.
///
/// Unreadable entries are skipped. A path that does not exist measures 0.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Parse a size string like "100MB" or "1.5GiB" into bytes.
///
/// Units are binary multiples; `KB` and `KiB` both mean 1024 bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    let upper = s.trim().to_uppercase();

    const UNITS: &[(&str, u64)] = &[
        ("TIB", 1 << 40),
        ("GIB", 1 << 30),
        ("MIB", 1 << 20),
        ("KIB", 1 << 10),
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
        ("B", 1),
    ];

    let (num_str, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((upper.as_str(), 1));

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| SweeperError::InvalidSize(s.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SweeperError::InvalidSize(s.to_string()));
    }

    Ok((value * multiplier as f64) as u64)
}
