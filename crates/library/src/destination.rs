//! Date resolution and destination path planning.
//!
//! Turns a classified item into the folder it belongs in:
//!
//! ```text
//! {root}/{yyyy}/{MM}/{dd}
//! /Camera/2023/03/30
//! /Camera - Video/2023/04/02
//! ```

use crate::category::FileCategory;
use crate::organize::error::{ErrorKind, Result};
use drivesort_storage::RemoteItem;
use std::fmt;
use time::{Date, UtcOffset};

/// Calendar date to file `item` under, in the given local offset.
///
/// The "taken" timestamp is authoritative whenever the service extracted one
/// (for photos and videos alike); otherwise the creation timestamp is used.
///
/// # Errors
/// [`MissingTimestamp`](ErrorKind::MissingTimestamp) if the item has neither,
/// or if shifting it into `offset` leaves the representable date range or
/// lands before year 0 (no four-digit year folder exists for it).
pub fn resolve_date(item: &RemoteItem, offset: UtcOffset) -> Result<Date> {
    let timestamp = item.taken.or(item.created);
    timestamp
        .and_then(|ts| ts.checked_to_offset(offset))
        .map(|ts| ts.date())
        .filter(|date| date.year() >= 0)
        .ok_or_else(|| exn::Exn::from(ErrorKind::MissingTimestamp(item.name.clone())))
}

/// Destination folder for an organized item.
///
/// Always `{root}/{yyyy}/{MM}/{dd}` with `root` one of
/// [`PHOTO_ROOT`](crate::PHOTO_ROOT) or [`VIDEO_ROOT`](crate::VIDEO_ROOT).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationPath(String);

impl DestinationPath {
    /// ```
    /// use drivesort_library::{DestinationPath, FileCategory};
    /// use time::{Date, Month};
    ///
    /// let date = Date::from_calendar_date(2023, Month::April, 2).unwrap();
    /// let path = DestinationPath::new(FileCategory::Video, date);
    /// assert_eq!(path.as_str(), "/Camera - Video/2023/04/02");
    /// ```
    pub fn new(category: FileCategory, date: Date) -> Self {
        Self(format!(
            "{}/{:04}/{:02}/{:02}",
            category.root(),
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DestinationPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
