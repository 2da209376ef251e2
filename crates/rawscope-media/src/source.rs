//! The decoded-frame entry point: one open file plus decode settings.
//!
//! A request for a frame goes cache → raw read → unpack to 4:4:4 →
//! convert to RGB24 → cache insert, with RGB24 sources read straight
//! through. All sources opened with [`VideoSource::open`] share the
//! process-wide cache.

use crate::cache::{FrameCache, FrameKey};
use crate::convert::{to_rgb24, ColorMatrix};
use crate::reader::RawVideoFile;
use crate::unpack::{to_yuv444, ChromaInterpolation, Yuv444Frame};
use parking_lot::{Mutex, RwLock};
use rawscope_core::{PixelFormat, RawScopeError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
struct DecodeSettings {
    interpolation: ChromaInterpolation,
    matrix: ColorMatrix,
}

#[derive(Default)]
struct DecodeScratch {
    raw: Vec<u8>,
    yuv: Yuv444Frame,
}

/// An open raw video file with decode settings and a frame cache.
pub struct VideoSource {
    reader: RawVideoFile,
    cache: Arc<FrameCache>,
    settings: RwLock<DecodeSettings>,
    /// Reusable raw/intermediate buffers, checked out per decode.
    scratch: Mutex<Vec<DecodeScratch>>,
    key_path: Arc<str>,
}

impl VideoSource {
    /// Open a file against the process-wide frame cache.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_cache(path, FrameCache::shared())
    }

    /// Open a file against a caller-supplied cache.
    pub fn open_with_cache<P: AsRef<Path>>(path: P, cache: Arc<FrameCache>) -> Result<Self> {
        let reader = RawVideoFile::open(path)?;
        let key_path: Arc<str> = Arc::from(reader.path().to_string_lossy().as_ref());
        Ok(Self {
            reader,
            cache,
            settings: RwLock::new(DecodeSettings::default()),
            scratch: Mutex::new(Vec::new()),
            key_path,
        })
    }

    /// Fetch one frame as RGB24 bytes, decoding on a cache miss.
    ///
    /// A frame that lies wholly past the end of the file is refused with
    /// [`RawScopeError::SizeMismatch`]; a partially available final frame
    /// decodes zero-padded with a warning.
    pub fn get_one_frame(
        &self,
        frame_index: u32,
        width: u32,
        height: u32,
        src_format: PixelFormat,
    ) -> Result<Arc<Vec<u8>>> {
        if src_format == PixelFormat::Unknown {
            return Err(RawScopeError::UnknownFormat(src_format));
        }

        let key = FrameKey {
            path: self.key_path.clone(),
            index: frame_index,
        };
        let cost = PixelFormat::Rgb24.bytes_per_frame(width, height) >> 20;
        let settings = *self.settings.read();

        self.cache.get_or_decode(key, cost, || {
            let mut scratch = self.scratch.lock().pop().unwrap_or_default();
            let result =
                self.decode_frame(&mut scratch, frame_index, width, height, src_format, settings);
            self.scratch.lock().push(scratch);
            result
        })
    }

    fn decode_frame(
        &self,
        scratch: &mut DecodeScratch,
        frame_index: u32,
        width: u32,
        height: u32,
        src_format: PixelFormat,
        settings: DecodeSettings,
    ) -> Result<Vec<u8>> {
        let bytes_per_frame = src_format.bytes_per_frame(width, height);
        let read =
            self.reader
                .read_frames(&mut scratch.raw, frame_index, 1, width, height, src_format)?;
        if read == 0 {
            return Err(RawScopeError::SizeMismatch {
                expected: bytes_per_frame,
                actual: 0,
            });
        }
        if read < bytes_per_frame {
            warn!(
                frame = frame_index,
                read,
                expected = bytes_per_frame,
                "decoding partially available frame"
            );
        }

        if src_format == PixelFormat::Rgb24 {
            return Ok(scratch.raw[..bytes_per_frame].to_vec());
        }

        to_yuv444(
            &scratch.raw[..bytes_per_frame],
            src_format,
            width,
            height,
            settings.interpolation,
            &mut scratch.yuv,
        )?;
        let mut rgb = Vec::new();
        to_rgb24(&scratch.yuv, settings.matrix, &mut rgb)?;
        Ok(rgb)
    }

    /// Select the 4:2:0 chroma reconstruction filter.
    pub fn set_interpolation(&self, mode: ChromaInterpolation) {
        self.settings.write().interpolation = mode;
    }

    /// Select the YUV to RGB matrix.
    pub fn set_color_matrix(&self, matrix: ColorMatrix) {
        self.settings.write().matrix = matrix;
    }

    /// Drop every frame in the cache this source uses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// The cache this source decodes into.
    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    /// Size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.reader.file_size()
    }

    /// The final component of the file path.
    pub fn file_name(&self) -> String {
        self.reader.file_name()
    }

    /// Canonical path of the open file.
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// File creation time as `YYYY-MM-DD HH:MM:SS`, when available.
    pub fn created_time(&self) -> Option<String> {
        self.reader.created_time()
    }

    /// File modification time as `YYYY-MM-DD HH:MM:SS`.
    pub fn modified_time(&self) -> Option<String> {
        self.reader.modified_time()
    }

    /// How many whole frames of the given geometry the file holds.
    pub fn frame_count(&self, width: u32, height: u32, format: PixelFormat) -> u64 {
        self.reader.frame_count(width, height, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).expect("failed to create test file");
        f.write_all(data).unwrap();
        path
    }

    fn private_source(path: &Path, budget_mb: usize) -> VideoSource {
        VideoSource::open_with_cache(path, Arc::new(FrameCache::new(budget_mb))).unwrap()
    }

    #[test]
    fn test_gray_frame_to_rgb() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_file(&tmp, "gray.yuv", &[16, 235, 126, 0]);
        let source = private_source(&path, 64);

        let rgb = source.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        assert_eq!(
            &**rgb,
            &[0, 0, 0, 254, 254, 254, 128, 128, 128, 0, 0, 0]
        );
    }

    #[test]
    fn test_uyvy_frame_to_rgb() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_file(&tmp, "clip.uyvy", &[128, 16, 128, 235]);
        let source = private_source(&path, 64);

        let rgb = source.get_one_frame(0, 2, 1, PixelFormat::Uyvy422).unwrap();
        assert_eq!(&**rgb, &[0, 0, 0, 254, 254, 254]);
    }

    #[test]
    fn test_rgb24_passthrough() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let path = write_file(&tmp, "frames.rgb", &data);
        let source = private_source(&path, 64);

        let rgb = source.get_one_frame(1, 1, 2, PixelFormat::Rgb24).unwrap();
        assert_eq!(&**rgb, &[7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_cache_hit_returns_same_frame() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_file(&tmp, "gray.yuv", &[10, 20, 30, 40]);
        let source = private_source(&path, 64);

        let a = source.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        let b = source.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.cache().len(), 1);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let data: Vec<u8> = (0..24).map(|i| (i * 11) as u8).collect();
        let path = write_file(&tmp, "i420.yuv", &data);
        let source = private_source(&path, 64);

        let first = source
            .get_one_frame(0, 4, 4, PixelFormat::YCbCr420Planar8)
            .unwrap()
            .to_vec();
        source.clear_cache();
        let second = source
            .get_one_frame(0, 4, 4, PixelFormat::YCbCr420Planar8)
            .unwrap()
            .to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_settings_change_output() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        // One 4x4 4:2:0 frame with strong chroma.
        let mut data = vec![126u8; 16];
        data.extend_from_slice(&[64, 192, 192, 64]); // U
        data.extend_from_slice(&[200; 4]); // V
        let path = write_file(&tmp, "i420.yuv", &data);
        let source = private_source(&path, 64);

        let bt601 = source
            .get_one_frame(0, 4, 4, PixelFormat::YCbCr420Planar8)
            .unwrap()
            .to_vec();

        source.clear_cache();
        source.set_color_matrix(ColorMatrix::Bt709);
        let bt709 = source
            .get_one_frame(0, 4, 4, PixelFormat::YCbCr420Planar8)
            .unwrap()
            .to_vec();
        assert_ne!(bt601, bt709);

        source.clear_cache();
        source.set_interpolation(ChromaInterpolation::Interstitial);
        let interstitial = source
            .get_one_frame(0, 4, 4, PixelFormat::YCbCr420Planar8)
            .unwrap()
            .to_vec();
        assert_ne!(bt709, interstitial);
    }

    #[test]
    fn test_frame_past_eof_refused() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_file(&tmp, "gray.yuv", &[0; 4]);
        let source = private_source(&path, 64);

        let err = source.get_one_frame(3, 2, 2, PixelFormat::Gray8);
        assert!(matches!(err, Err(RawScopeError::SizeMismatch { .. })));
    }

    #[test]
    fn test_partial_tail_frame_decodes() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        // Six bytes: frame 1 of a 2x2 Gray8 stream is half missing.
        let path = write_file(&tmp, "gray.yuv", &[1, 2, 3, 4, 90, 91]);
        let source = private_source(&path, 64);

        let rgb = source.get_one_frame(1, 2, 2, PixelFormat::Gray8).unwrap();
        assert_eq!(rgb.len(), 12);
        // Missing samples read as Y=0.
        assert_eq!(&rgb[6..], &[0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_format_refused() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let path = write_file(&tmp, "gray.yuv", &[0; 4]);
        let source = private_source(&path, 64);
        let err = source.get_one_frame(0, 2, 2, PixelFormat::Unknown);
        assert!(matches!(err, Err(RawScopeError::UnknownFormat(_))));
    }

    #[test]
    fn test_two_sources_share_a_cache() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        let cache = Arc::new(FrameCache::new(64));
        let path_a = write_file(&tmp, "a.yuv", &[100; 4]);
        let path_b = write_file(&tmp, "b.yuv", &[200; 4]);
        let a = VideoSource::open_with_cache(&path_a, cache.clone()).unwrap();
        let b = VideoSource::open_with_cache(&path_b, cache.clone()).unwrap();

        a.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        b.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        assert_eq!(cache.len(), 2);

        // Same index, different files: distinct entries.
        let fa = a.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        let fb = b.get_one_frame(0, 2, 2, PixelFormat::Gray8).unwrap();
        assert_ne!(&**fa, &**fb);
    }
}
