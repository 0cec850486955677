//! File classification by MIME type.

use drivesort_storage::RemoteItem;
use std::fmt;

/// Root folder for photos (and anything that is neither photo nor video).
pub const PHOTO_ROOT: &str = "/Camera";
/// Root folder for videos.
pub const VIDEO_ROOT: &str = "/Camera - Video";

/// Broad kind of a remote file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Photo,
    Video,
    Unknown,
}

impl FileCategory {
    /// Classify a MIME type by its top-level type (the part before `/`),
    /// ignoring case and surrounding whitespace. Anything malformed is
    /// [`Unknown`](Self::Unknown).
    ///
    /// ```
    /// use drivesort_library::FileCategory;
    ///
    /// assert_eq!(FileCategory::from_mime("image/heic"), FileCategory::Photo);
    /// assert_eq!(FileCategory::from_mime("Video/MP4"), FileCategory::Video);
    /// assert_eq!(FileCategory::from_mime("application/pdf"), FileCategory::Unknown);
    /// assert_eq!(FileCategory::from_mime("image"), FileCategory::Unknown);
    /// ```
    pub fn from_mime(mime: &str) -> Self {
        let Some((kind, _)) = mime.trim().split_once('/') else {
            return Self::Unknown;
        };
        let kind = kind.trim();
        if kind.eq_ignore_ascii_case("image") {
            Self::Photo
        } else if kind.eq_ignore_ascii_case("video") {
            Self::Video
        } else {
            Self::Unknown
        }
    }

    /// Top-level folder this category is filed under.
    pub fn root(&self) -> &'static str {
        match self {
            Self::Photo => PHOTO_ROOT,
            Self::Video => VIDEO_ROOT,
            // Unknown files land with the photos; nothing else gets a bucket.
            Self::Unknown => PHOTO_ROOT,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Unknown => "unknown",
        })
    }
}

/// Classify a remote item. Items without a MIME type are
/// [`Unknown`](FileCategory::Unknown).
pub fn classify(item: &RemoteItem) -> FileCategory {
    item.mime_type.as_deref().map(FileCategory::from_mime).unwrap_or(FileCategory::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image/jpeg", FileCategory::Photo)]
    #[case("image/heic", FileCategory::Photo)]
    #[case("IMAGE/PNG", FileCategory::Photo)]
    #[case("Image/", FileCategory::Photo)]
    #[case("  image/jpeg ", FileCategory::Photo)]
    #[case("video /mp4", FileCategory::Video)]
    #[case("video/mp4", FileCategory::Video)]
    #[case("VIDEO/quicktime", FileCategory::Video)]
    #[case("audio/mpeg", FileCategory::Unknown)]
    #[case("application/octet-stream", FileCategory::Unknown)]
    #[case("imagery/png", FileCategory::Unknown)]
    #[case("image", FileCategory::Unknown)]
    #[case("", FileCategory::Unknown)]
    #[case("/jpeg", FileCategory::Unknown)]
    fn test_from_mime(#[case] mime: &str, #[case] expected: FileCategory) {
        assert_eq!(FileCategory::from_mime(mime), expected);
    }

    #[rstest]
    #[case(FileCategory::Photo, "/Camera")]
    #[case(FileCategory::Video, "/Camera - Video")]
    #[case(FileCategory::Unknown, "/Camera")]
    fn test_root(#[case] category: FileCategory, #[case] expected: &str) {
        assert_eq!(category.root(), expected);
    }

    #[test]
    fn test_classify_without_mime() {
        let mut item = RemoteItem::file("1", "a.bin", "image/png");
        item.mime_type = None;
        assert_eq!(classify(&item), FileCategory::Unknown);
    }

    #[test]
    fn test_classify_agrees_with_prefix() {
        let mimes = ["image/png", "Image/Gif", "video/x-msvideo", "text/plain", "imagevideo", "vIdEo/webm"];
        for mime in mimes {
            let lower = mime.to_ascii_lowercase();
            let item = RemoteItem::file("1", "x", mime);
            let expected = if lower.starts_with("image/") {
                FileCategory::Photo
            } else if lower.starts_with("video/") {
                FileCategory::Video
            } else {
                FileCategory::Unknown
            };
            assert_eq!(classify(&item), expected, "{mime}");
        }
    }
}
