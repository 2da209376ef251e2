//! Indexed frame reads from flat, headerless video files.
//!
//! A raw file is nothing but frames back to back; width, height and pixel
//! format come from the caller. The reader turns a frame index into a
//! byte offset and performs a best-effort read: running off the end of
//! the file is reported through the returned byte count, not an error.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rawscope_core::{PixelFormat, RawScopeError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// A raw video file opened for indexed frame access.
///
/// The seek+read pair is serialized internally, so one reader can be
/// shared between the foreground decoder and a prefetch worker.
pub struct RawVideoFile {
    file: Mutex<File>,
    path: PathBuf,
}

impl RawVideoFile {
    /// Open a raw video file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let path = path.canonicalize()?;
        info!(path = %path.display(), "opened raw video file");
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Read `count` frames starting at `first_index` into `dst`.
    ///
    /// `dst` is grown to `count * bytes_per_frame` if needed and the
    /// unread tail is zeroed on a short read. Returns the number of bytes
    /// actually read; the caller detects truncation by comparing it
    /// against the requested length.
    pub fn read_frames(
        &self,
        dst: &mut Vec<u8>,
        first_index: u32,
        count: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<usize> {
        let bytes_per_frame = format.bytes_per_frame(width, height);
        if bytes_per_frame == 0 {
            return Err(RawScopeError::UnknownFormat(format));
        }

        let total = bytes_per_frame * count as usize;
        if dst.len() < total {
            dst.resize(total, 0);
        }

        let offset = first_index as u64 * bytes_per_frame as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut read = 0;
        while read < total {
            match file.read(&mut dst[read..total]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        drop(file);

        if read < total {
            warn!(
                path = %self.path.display(),
                requested = total,
                read,
                "short read, zero-filling tail"
            );
            dst[read..total].fill(0);
        }

        Ok(read)
    }

    /// Current size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// The final component of the file path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Canonical path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File creation time as `YYYY-MM-DD HH:MM:SS`, when the platform
    /// records one.
    pub fn created_time(&self) -> Option<String> {
        let meta = std::fs::metadata(&self.path).ok()?;
        meta.created().ok().map(format_timestamp)
    }

    /// File modification time as `YYYY-MM-DD HH:MM:SS`.
    pub fn modified_time(&self) -> Option<String> {
        let meta = std::fs::metadata(&self.path).ok()?;
        meta.modified().ok().map(format_timestamp)
    }

    /// How many whole frames of the given geometry the file holds.
    pub fn frame_count(&self, width: u32, height: u32, format: PixelFormat) -> u64 {
        let bytes_per_frame = format.bytes_per_frame(width, height) as u64;
        if bytes_per_frame == 0 {
            return 0;
        }
        self.file_size() / bytes_per_frame
    }
}

fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
