use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

use super::FileCandidate;

/// Newest first
pub fn sort_by_modified_desc(files: &mut [FileCandidate]) {
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
}

/// Drop files modified after `up_to` (midnight UTC at the start of that day)
/// or before `now` minus `last_months`. A file failing either check is
/// excluded.
pub fn filter_by_date(
    files: Vec<FileCandidate>,
    up_to: Option<NaiveDate>,
    last_months: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<FileCandidate> {
    let ceiling = up_to.map(|date| date.and_time(NaiveTime::MIN).and_utc());
    let floor = last_months.and_then(|months| now.checked_sub_months(Months::new(months)));

    files
        .into_iter()
        .filter(|file| {
            if let Some(ceiling) = ceiling {
                if file.modified > ceiling {
                    return false;
                }
            }
            if let Some(floor) = floor {
                if file.modified < floor {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Keep the first `n`; applied after sorting and date filters
pub fn limit(mut files: Vec<FileCandidate>, n: Option<usize>) -> Vec<FileCandidate> {
    if let Some(n) = n {
        files.truncate(n);
    }
    files
}
