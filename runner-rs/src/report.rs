//! Placeholder substitution for the published report page.

use serde::Serialize;

use crate::RunnerError;

pub const STATS_PLACEHOLDER: &str = "{{ stats }}";
pub const DATE_PLACEHOLDER: &str = "{{ date }}";

/// `YYYYMMDD` as `YYYY-MM-DD`.
pub fn format_date(date: u32) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date / 10_000,
        date / 100 % 100,
        date % 100
    )
}

/// Substitute the stats JSON and the report date into `template`.
pub fn render_template<T: Serialize + ?Sized>(
    template: &str,
    stats: &T,
    date: u32,
) -> Result<String, RunnerError> {
    let stats = serde_json::to_string(stats)?;
    Ok(template
        .replace(STATS_PLACEHOLDER, &stats)
        .replace(DATE_PLACEHOLDER, &format_date(date)))
}
