//! Downloading preview data streams to local disk.

use bytes::Bytes;
use image::ImageReader;
use std::io::{self, Cursor, Write};
use std::sync::Arc;
use vitrine_core::{CachedMedia, ClientResult, MediaEntry, MediaKind};

use crate::{absent, ApiClient};

const TEMP_PREFIX: &str = "vitrine-";

impl ApiClient {
    /// Downloads the playback preview of a resolved entry and attaches it.
    ///
    /// Images are measured and the measured size replaces the one reported by
    /// the API. A failed download leaves the entry without a file. Entries
    /// that already carry a file are returned as they are.
    pub async fn preload_media(&self, entry_id: &str) -> ClientResult<Option<Arc<MediaEntry>>> {
        let Some(entry) = self.registry.media_entries.find(entry_id) else {
            return Ok(None);
        };
        if entry.file.is_some() {
            return Ok(Some(entry));
        }
        let Some(url) = entry.file_url().map(str::to_string) else {
            tracing::warn!(entry_id = %entry_id, "No preview to preload");
            return Ok(Some(entry));
        };

        let Some(data) = absent(self.fetch_bytes(&url).await)? else {
            tracing::warn!(entry_id = %entry_id, url = %url, "Failed to preload media");
            return Ok(Some(entry));
        };

        let kind = entry.kind().unwrap_or(MediaKind::Image);
        let stored = tokio::task::spawn_blocking(move || store(data, kind))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result);
        let file = match stored {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    entry_id = %entry_id,
                    error = %e,
                    "Failed to store preloaded media"
                );
                return Ok(Some(entry));
            }
        };

        tracing::debug!(
            entry_id = %entry_id,
            path = %file.path.display(),
            bytes = file.byte_len,
            "Media preloaded"
        );
        Ok(self
            .registry
            .media_entries
            .update(entry_id, |e| e.set_file(file)))
    }
}

/// Writes `data` to a temporary file that outlives the process handle and
/// measures it when it is an image.
pub fn store(data: Bytes, kind: MediaKind) -> io::Result<CachedMedia> {
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(kind.cache_suffix())
        .tempfile()?;
    temp.write_all(&data)?;
    temp.flush()?;
    let (_, path) = temp.keep().map_err(|e| e.error)?;

    let dimensions = match kind {
        MediaKind::Image | MediaKind::Document => measure(&data),
        MediaKind::Video | MediaKind::Audio => None,
    };
    Ok(CachedMedia {
        path,
        byte_len: data.len() as u64,
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    })
}

/// Pixel size of an encoded image, `None` when the format is not recognized.
pub fn measure(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn measures_png() {
        assert_eq!(measure(&png(7, 3)), Some((7, 3)));
        assert_eq!(measure(b"not an image"), None);
    }

    #[test]
    fn store_keeps_file_on_disk() {
        let data = Bytes::from(png(4, 9));
        let file = store(data.clone(), MediaKind::Image).unwrap();

        assert_eq!(file.width_height(), Some((4, 9)));
        assert_eq!(file.byte_len, data.len() as u64);
        assert_eq!(std::fs::read(file.path()).unwrap(), data.to_vec());
        assert!(file.path().to_string_lossy().ends_with(".jpg"));

        file.delete().unwrap();
        assert!(!file.path().exists());
    }

    #[test]
    fn videos_are_not_measured() {
        let file = store(Bytes::from_static(b"\0\0\0\x18ftypmp42"), MediaKind::Video).unwrap();
        assert_eq!(file.width_height(), None);
        file.delete().unwrap();
    }
}
