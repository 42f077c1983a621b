//! File and folder records produced by listings.

use crate::services::hierarchy::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Media type used when the extension is not in the table.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// A file as seen by callers of the hierarchy manager.
///
/// `url` is minted per listing and expires; never persist it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub key: String,
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// A folder: a store prefix ending in `/`, or the empty string for root.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderRecord {
    pub path: String,
    pub name: String,
}

impl FolderRecord {
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = paths::folder_name(&path).to_string();
        Self { path, name }
    }
}

/// Immediate children of one prefix.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub prefix: String,
    pub files: Vec<ObjectRecord>,
    pub folders: Vec<FolderRecord>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    pub fn file(&self, name: &str) -> Option<&ObjectRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn folder(&self, name: &str) -> Option<&FolderRecord> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Keep the files of `kind` and order them by `sort`. Folders are left
    /// in listing order.
    pub fn sorted_filtered(mut self, sort: SortKey, order: SortOrder, kind: FileKind) -> Self {
        self.files.retain(|file| kind.matches(&file.media_type));
        self.files.sort_by(|a, b| {
            let ordering = sort.compare(a, b);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        self
    }
}

/// File attribute a listing is ordered by.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
}

impl SortKey {
    fn compare(self, a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
        match self {
            SortKey::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            SortKey::Date => a.last_modified.cmp(&b.last_modified),
            SortKey::Size => a.size.cmp(&b.size),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Coarse media category used to filter listings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    All,
    Image,
    Video,
    Audio,
    Document,
}

impl FileKind {
    pub fn matches(self, media_type: &str) -> bool {
        match self {
            FileKind::All => true,
            FileKind::Image => media_type.starts_with("image/"),
            FileKind::Video => media_type.starts_with("video/"),
            FileKind::Audio => media_type.starts_with("audio/"),
            FileKind::Document => ["pdf", "doc", "xls", "ppt", "text"]
                .iter()
                .any(|needle| media_type.contains(needle)),
        }
    }
}

/// Media type guessed from the file extension. Unknown extensions map to
/// [`DEFAULT_MEDIA_TYPE`].
pub fn media_type_for(name: &str) -> String {
    let extension = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MEDIA_TYPE.to_string(),
    };

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" | "gif" | "webp" => format!("image/{}", extension),
        "mp4" | "webm" | "ogg" => format!("video/{}", extension),
        "mp3" | "wav" => format!("audio/{}", extension),
        "pdf" => "application/pdf".to_string(),
        _ => DEFAULT_MEDIA_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_table() {
        assert_eq!(media_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(media_type_for("a.b.png"), "image/png");
        assert_eq!(media_type_for("clip.webm"), "video/webm");
        assert_eq!(media_type_for("song.wav"), "audio/wav");
        assert_eq!(media_type_for("report.pdf"), "application/pdf");
        assert_eq!(media_type_for("archive.tar.gz"), DEFAULT_MEDIA_TYPE);
        assert_eq!(media_type_for("README"), DEFAULT_MEDIA_TYPE);
    }

    fn file(name: &str, size: u64, minutes_ago: i64) -> ObjectRecord {
        ObjectRecord {
            key: format!("docs/{}", name),
            name: name.to_string(),
            last_modified: Utc::now() - chrono::Duration::minutes(minutes_ago),
            size,
            url: String::new(),
            media_type: media_type_for(name),
        }
    }

    fn sample() -> Listing {
        Listing {
            prefix: "docs/".to_string(),
            files: vec![
                file("beta.png", 300, 5),
                file("Alpha.pdf", 100, 1),
                file("gamma.mp3", 200, 10),
            ],
            folders: vec![FolderRecord::from_path("docs/z/"), FolderRecord::from_path("docs/a/")],
        }
    }

    fn names(listing: &Listing) -> Vec<&str> {
        listing.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_sort_by_name() {
        let asc = sample().sorted_filtered(SortKey::Name, SortOrder::Asc, FileKind::All);
        assert_eq!(names(&asc), ["Alpha.pdf", "beta.png", "gamma.mp3"]);
        // folders keep listing order
        assert_eq!(asc.folders[0].name, "z");

        let desc = sample().sorted_filtered(SortKey::Name, SortOrder::Desc, FileKind::All);
        assert_eq!(names(&desc), ["gamma.mp3", "beta.png", "Alpha.pdf"]);
    }

    #[test]
    fn test_sort_by_date() {
        let asc = sample().sorted_filtered(SortKey::Date, SortOrder::Asc, FileKind::All);
        assert_eq!(names(&asc), ["gamma.mp3", "beta.png", "Alpha.pdf"]);

        let desc = sample().sorted_filtered(SortKey::Date, SortOrder::Desc, FileKind::All);
        assert_eq!(names(&desc), ["Alpha.pdf", "beta.png", "gamma.mp3"]);
    }

    #[test]
    fn test_sort_by_size() {
        let asc = sample().sorted_filtered(SortKey::Size, SortOrder::Asc, FileKind::All);
        assert_eq!(names(&asc), ["Alpha.pdf", "gamma.mp3", "beta.png"]);

        let desc = sample().sorted_filtered(SortKey::Size, SortOrder::Desc, FileKind::All);
        assert_eq!(names(&desc), ["beta.png", "gamma.mp3", "Alpha.pdf"]);
    }

    #[test]
    fn test_filter_by_kind() {
        let images = sample().sorted_filtered(SortKey::Name, SortOrder::Asc, FileKind::Image);
        assert_eq!(names(&images), ["beta.png"]);
        let audio = sample().sorted_filtered(SortKey::Name, SortOrder::Asc, FileKind::Audio);
        assert_eq!(names(&audio), ["gamma.mp3"]);
        let video = sample().sorted_filtered(SortKey::Name, SortOrder::Asc, FileKind::Video);
        assert!(video.files.is_empty());
        assert_eq!(video.folders.len(), 2);
    }

    #[test]
    fn test_document_kind() {
        for media_type in [
            "application/pdf",
            "application/vnd.oasis.opendocument.text",
            "application/x-doc",
            "application/vnd.ms-excel.sheet.xlsx",
            "application/vnd.ms-powerpoint.ppt",
            "text/plain",
        ] {
            assert!(FileKind::Document.matches(media_type), "{}", media_type);
        }
        assert!(!FileKind::Document.matches("image/png"));
        assert!(!FileKind::Document.matches(DEFAULT_MEDIA_TYPE));
        assert!(FileKind::All.matches(DEFAULT_MEDIA_TYPE));
    }

    #[test]
    fn test_folder_record_from_path() {
        let folder = FolderRecord::from_path("photos/2025/");
        assert_eq!(folder.name, "2025");
        assert_eq!(folder.path, "photos/2025/");

        let root = FolderRecord::from_path("");
        assert_eq!(root.name, "");
    }
}
