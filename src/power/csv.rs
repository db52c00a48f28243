//! Helpers for the CSV layout returned by POWER
//!
//! POWER prefixes its CSV with a metadata block delimited by
//! `-BEGIN HEADER-` / `-END HEADER-` lines, followed by a column header row.

const BEGIN_HEADER: &str = "-BEGIN HEADER-";
const END_HEADER: &str = "-END HEADER-";

/// Lines outside the metadata block, trimmed, blank lines dropped
pub fn body_lines(csv: &str) -> impl Iterator<Item = &str> {
    let mut skipping = false;
    csv.lines().map(str::trim).filter(move |line| {
        if *line == BEGIN_HEADER {
            skipping = true;
            return false;
        }
        if *line == END_HEADER {
            skipping = false;
            return false;
        }
        !skipping && !line.is_empty()
    })
}

/// Number of data rows, excluding metadata and the column header
#[must_use]
pub fn data_row_count(csv: &str) -> usize {
    body_lines(csv).count().saturating_sub(1)
}
