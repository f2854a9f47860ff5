//! Uploaded files and where they live in the media tree.

use thiserror::Error;

/// A post never holds more attachments than this.
pub const MAX_POST_FILES: usize = 3;

const FILE_STEM_MAX_LEN: usize = 64;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum MediaKind {
    ProfilePicture,
    PostImage,
    PostVideo,
    PostFile,
}

impl MediaKind {
    #[must_use]
    pub fn directory(self) -> &'static str {
        match self {
            MediaKind::ProfilePicture => "profile_pics",
            MediaKind::PostImage => "post_images",
            MediaKind::PostVideo => "post_videos",
            MediaKind::PostFile => "post_files",
        }
    }

    #[must_use]
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::ProfilePicture | MediaKind::PostImage => {
                &["jpg", "jpeg", "png", "gif", "webp", "bmp"]
            }
            MediaKind::PostVideo => &["mp4", "mov", "avi", "webm"],
            MediaKind::PostFile => &["pdf", "docx", "txt", "zip", "rar"],
        }
    }

    /// Returns the lower-cased extension of `file_name` if this kind accepts it.
    pub fn check_extension(self, file_name: &str) -> Result<String, DisallowedExtensionError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default();

        if self.allowed_extensions().contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(DisallowedExtensionError {
                kind: self,
                extension,
            })
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("File extension {extension:?} is not allowed for {kind:?}, expected one of {allowed:?}", allowed = .kind.allowed_extensions())]
pub struct DisallowedExtensionError {
    pub kind: MediaKind,
    pub extension: String,
}

/// Path of a stored file, relative to the media root, e.g. `post_files/0f3a..._report.pdf`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MediaPath(String);

impl MediaPath {
    /// Picks a fresh, collision-resistant path for an upload named `original_name`.
    pub fn for_upload(kind: MediaKind, original_name: &str) -> Result<Self, DisallowedExtensionError> {
        let extension = kind.check_extension(original_name)?;
        let stem = sanitize_stem(original_name);
        let unique: u64 = rand::random();

        Ok(Self(format!(
            "{}/{unique:016x}_{stem}.{extension}",
            kind.directory()
        )))
    }

    /// Wraps a path read back from storage.
    #[must_use]
    pub fn from_stored(path: String) -> Self {
        Self(path)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

fn sanitize_stem(file_name: &str) -> String {
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = base_name
        .rsplit_once('.')
        .map_or(base_name, |(stem, _)| stem);

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(FILE_STEM_MAX_LEN)
        .collect();

    if sanitized.is_empty() {
        "file".to_owned()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use crate::model::media::{MediaKind, MediaPath, sanitize_stem};

    #[test]
    fn attachment_extensions() {
        for legal in ["report.pdf", "Thesis.DOCX", "notes.txt", "a.b.zip", "x.rar"] {
            assert!(MediaKind::PostFile.check_extension(legal).is_ok(), "{legal}");
        }
        for illegal in ["script.exe", "pdf", "archive.tar.gz", "noextension", "image.png"] {
            assert!(MediaKind::PostFile.check_extension(illegal).is_err(), "{illegal}");
        }
    }

    #[test]
    fn video_extensions() {
        assert_eq!(MediaKind::PostVideo.check_extension("clip.MOV").unwrap(), "mov");
        assert!(MediaKind::PostVideo.check_extension("clip.mkv").is_err());
    }

    #[test]
    fn upload_paths_stay_inside_their_directory() {
        let path = MediaPath::for_upload(MediaKind::PostFile, "../../etc/pass wd.txt").unwrap();

        assert!(path.get().starts_with("post_files/"));
        assert!(path.get().ends_with("_pass_wd.txt"));
        assert!(!path.get().contains(".."));
    }

    #[test]
    fn upload_paths_are_unique() {
        let first = MediaPath::for_upload(MediaKind::PostImage, "cat.png").unwrap();
        let second = MediaPath::for_upload(MediaKind::PostImage, "cat.png").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn upload_names_lead_with_hex_digits() {
        let path = MediaPath::for_upload(MediaKind::PostFile, "Report.PDF").unwrap();
        let name = path.get().strip_prefix("post_files/").unwrap();
        let (unique, rest) = name.split_once('_').unwrap();

        assert_eq!(unique.len(), 16);
        assert!(unique.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(rest, "Report.pdf");
    }

    #[test]
    fn stems() {
        assert_eq!(sanitize_stem("résumé.pdf"), "r_sum_");
        assert_eq!(sanitize_stem(".pdf"), "file");
        assert_eq!(sanitize_stem("C:\\Users\\me\\notes.txt"), "notes");
    }
}
