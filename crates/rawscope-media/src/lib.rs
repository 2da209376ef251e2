//! RawScope Media - raw video I/O and decoding
//!
//! This crate handles:
//! - Indexed frame reads from flat, headerless files
//! - Unpacking any supported pixel layout to planar 4:4:4
//! - Fixed-point YUV to RGB conversion (BT.601 / BT.709)
//! - A budgeted, process-shared cache of decoded frames
//! - Background prefetching of frame ranges

pub mod cache;
pub mod convert;
pub mod prefetch;
pub mod reader;
pub mod source;
pub mod unpack;

pub use cache::{FrameCache, FrameKey};
pub use convert::{to_rgb24, to_rgb24_with_depth, ColorMatrix};
pub use prefetch::{CancelFlag, PrefetchJob, PrefetchReport, Prefetcher};
pub use reader::RawVideoFile;
pub use source::VideoSource;
pub use unpack::{to_yuv444, ChromaInterpolation, SampleBuf, Yuv444Frame};
