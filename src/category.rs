use std::fmt;

/// Fixed file classification keyed by lowercase extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Notes,
    Images,
    Audio,
    Video,
    Canvas,
    Bases,
    Pdf,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 8] = [
        Self::Notes,
        Self::Images,
        Self::Audio,
        Self::Video,
        Self::Canvas,
        Self::Bases,
        Self::Pdf,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Images => "images",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Canvas => "canvas",
            Self::Bases => "bases",
            Self::Pdf => "pdf",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total mapping; unknown extensions are [`FileCategory::Other`].
pub fn extension_to_category(ext: &str) -> FileCategory {
    match ext.to_ascii_lowercase().as_str() {
        "md" => FileCategory::Notes,
        "avif" | "bmp" | "gif" | "ico" | "jpeg" | "jpg" | "png" | "raw" | "svg" | "tif"
        | "tiff" | "webp" => FileCategory::Images,
        "aac" | "aif" | "aifc" | "aiff" | "flac" | "m4a" | "mp3" | "ogg" | "wav" | "webm" => {
            FileCategory::Audio
        }
        "avi" | "mov" | "mkv" | "mp4" => FileCategory::Video,
        "canvas" => FileCategory::Canvas,
        "base" => FileCategory::Bases,
        "pdf" => FileCategory::Pdf,
        _ => FileCategory::Other,
    }
}
