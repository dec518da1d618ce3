// Database models - Scan records
use serde::{Deserialize, Serialize};

/// Where the image behind a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Camera,
    Gallery,
}

impl CaptureSource {
    pub fn from_gallery_flag(from_gallery: bool) -> Self {
        if from_gallery {
            Self::Gallery
        } else {
            Self::Camera
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Camera => "Camera capture",
            Self::Gallery => "Gallery import",
        }
    }
}

/// A saved scan or import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    /// Opaque reference to the image; the store never touches the bytes
    pub image_ref: String,
    /// Raw comma-separated tags as entered
    pub tags: String,
    pub from_gallery: bool,
    /// Milliseconds since the Unix epoch, set once at insert
    pub captured_at: i64,
}

impl ScanRecord {
    pub fn source(&self) -> CaptureSource {
        CaptureSource::from_gallery_flag(self.from_gallery)
    }

    /// Parsed tags, trimmed and without empty entries
    pub fn tag_list(&self) -> Vec<String> {
        crate::tags::parse_tag_list(&self.tags)
    }
}

/// Insert payload; `id` and `captured_at` are assigned by the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewScanRecord {
    pub image_ref: String,
    pub tags: String,
    pub from_gallery: bool,
}

impl NewScanRecord {
    pub fn new(image_ref: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            image_ref: image_ref.into(),
            tags: tags.into(),
            from_gallery: false,
        }
    }

    pub fn from_gallery(mut self, from_gallery: bool) -> Self {
        self.from_gallery = from_gallery;
        self
    }
}
