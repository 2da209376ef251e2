//! Pixel format tags and the format descriptor registry.
//!
//! Every raw layout RawScope can read is identified by a [`PixelFormat`]
//! tag. The registry maps each tag to an immutable [`FormatInfo`]
//! descriptor: sample depth, average bits per pixel as a fraction, chroma
//! subsampling, and whether the components are stored planar or packed.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Identifier for a raw frame layout.
///
/// The set is closed: sizing queries on [`PixelFormat::Unknown`] return 0
/// so callers can detect tags they must refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Unknown,
    /// 8-bit RGBA, packed (alpha ignored on decode).
    Rgb32,
    /// 8-bit RGB, packed.
    Rgb24,
    /// 8-bit BGR, packed.
    Bgr24,
    /// 4:1:1 Y'CbCr, 8-bit planar.
    YCbCr411Planar8,
    /// 4:2:0 Y'CbCr, 8-bit planar.
    YCbCr420Planar8,
    /// 4:2:2 Y'CbCr, 8-bit planar.
    YCbCr422Planar8,
    /// 4:2:2 U-Y-V-Y, 8-bit packed.
    Uyvy422,
    /// 4:2:2 Y'CbCr, 10-bit packed in little-endian 32-bit words.
    YCbCr422Packed10,
    /// 4:4:4 Y'CbCr, 8-bit planar.
    YCbCr444Planar8,
    /// 4:4:4 Y'CbCr, 12-bit little-endian planar.
    YCbCr444Planar12Le,
    /// 4:4:4 Y'CbCr, 12-bit big-endian planar.
    YCbCr444Planar12Be,
    /// 4:4:4 Y'CbCr, 16-bit little-endian planar.
    YCbCr444Planar16Le,
    /// 4:4:4 Y'CbCr, 16-bit big-endian planar.
    YCbCr444Planar16Be,
    /// 4:4:4 Y'CbCr, 12-bit host-order planar.
    YCbCr444Planar12Native,
    /// 4:4:4 Y'CbCr, 12-bit byte-swapped planar.
    YCbCr444Planar12Swapped,
    /// 4:4:4 Y'CbCr, 16-bit host-order planar.
    YCbCr444Planar16Native,
    /// 4:4:4 Y'CbCr, 16-bit byte-swapped planar.
    YCbCr444Planar16Swapped,
    /// Luma only, 8-bit.
    Gray8,
    /// G-B-R planes, 12 bits stored in 16-bit little-endian words.
    Gbr12In16Le,
    /// 4:2:0 Y'CbCr, 10 bits stored in 16-bit little-endian words, planar.
    YCbCr420Planar10Le,
    /// 4:2:2 Y'CrCb (Cr plane before Cb), 8-bit planar.
    YCrCb422Planar8,
    /// 4:4:4 Y'CrCb (Cr plane before Cb), 8-bit planar.
    YCrCb444Planar8,
    /// 4:2:2 U-Y-V-Y, 10-bit packed in big-endian 32-bit words (v210-like).
    Uyvy422Packed10,
}

/// Immutable descriptor for one pixel format.
///
/// `bits_per_pixel_nominator / bits_per_pixel_denominator` is the exact
/// average number of bits per pixel. A subsampling factor of 0 means the
/// format has no chroma planes at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub name: &'static str,
    pub bits_per_sample: u32,
    pub bits_per_pixel_nominator: u32,
    pub bits_per_pixel_denominator: u32,
    pub subsampling_horizontal: u32,
    pub subsampling_vertical: u32,
    pub planar: bool,
}

const fn info(
    name: &'static str,
    bits_per_sample: u32,
    bpp_nom: u32,
    bpp_den: u32,
    sub_h: u32,
    sub_v: u32,
    planar: bool,
) -> FormatInfo {
    FormatInfo {
        name,
        bits_per_sample,
        bits_per_pixel_nominator: bpp_nom,
        bits_per_pixel_denominator: bpp_den,
        subsampling_horizontal: sub_h,
        subsampling_vertical: sub_v,
        planar,
    }
}

impl PixelFormat {
    /// Look up the descriptor for this tag.
    pub const fn info(self) -> FormatInfo {
        match self {
            Self::Unknown => info("Unknown", 0, 0, 0, 0, 0, false),
            Self::Rgb32 => info("RGBA 8-bit packed", 8, 32, 1, 1, 1, false),
            Self::Rgb24 => info("RGB 8-bit packed", 8, 24, 1, 1, 1, false),
            Self::Bgr24 => info("BGR 8-bit packed", 8, 24, 1, 1, 1, false),
            Self::YCbCr411Planar8 => info("4:1:1 Y'CbCr 8-bit planar", 8, 12, 1, 4, 1, true),
            Self::YCbCr420Planar8 => info("4:2:0 Y'CbCr 8-bit planar", 8, 12, 1, 2, 2, true),
            Self::YCbCr422Planar8 => info("4:2:2 Y'CbCr 8-bit planar", 8, 16, 1, 2, 1, true),
            Self::Uyvy422 => info("4:2:2 UYVY 8-bit packed", 8, 16, 1, 2, 1, false),
            Self::YCbCr422Packed10 => {
                info("4:2:2 Y'CbCr 10-bit packed (LE)", 10, 128, 6, 2, 1, false)
            }
            Self::YCbCr444Planar8 => info("4:4:4 Y'CbCr 8-bit planar", 8, 24, 1, 1, 1, true),
            Self::YCbCr444Planar12Le => info("4:4:4 Y'CbCr 12-bit planar (LE)", 12, 48, 1, 1, 1, true),
            Self::YCbCr444Planar12Be => info("4:4:4 Y'CbCr 12-bit planar (BE)", 12, 48, 1, 1, 1, true),
            Self::YCbCr444Planar16Le => info("4:4:4 Y'CbCr 16-bit planar (LE)", 16, 48, 1, 1, 1, true),
            Self::YCbCr444Planar16Be => info("4:4:4 Y'CbCr 16-bit planar (BE)", 16, 48, 1, 1, 1, true),
            Self::YCbCr444Planar12Native => {
                info("4:4:4 Y'CbCr 12-bit planar (native)", 12, 48, 1, 1, 1, true)
            }
            Self::YCbCr444Planar12Swapped => {
                info("4:4:4 Y'CbCr 12-bit planar (swapped)", 12, 48, 1, 1, 1, true)
            }
            Self::YCbCr444Planar16Native => {
                info("4:4:4 Y'CbCr 16-bit planar (native)", 16, 48, 1, 1, 1, true)
            }
            Self::YCbCr444Planar16Swapped => {
                info("4:4:4 Y'CbCr 16-bit planar (swapped)", 16, 48, 1, 1, 1, true)
            }
            Self::Gray8 => info("Luma-only 8-bit", 8, 8, 1, 0, 0, true),
            Self::Gbr12In16Le => info("GBR 12-in-16-bit planar (LE)", 12, 48, 1, 1, 1, true),
            Self::YCbCr420Planar10Le => {
                info("4:2:0 Y'CbCr 10-in-16-bit planar (LE)", 10, 24, 1, 2, 2, true)
            }
            Self::YCrCb422Planar8 => info("4:2:2 Y'CrCb 8-bit planar", 8, 16, 1, 2, 1, true),
            Self::YCrCb444Planar8 => info("4:4:4 Y'CrCb 8-bit planar", 8, 24, 1, 1, 1, true),
            Self::Uyvy422Packed10 => {
                info("4:2:2 UYVY 10-bit packed (BE)", 10, 128, 6, 2, 1, true)
            }
        }
    }

    /// Bits per sample, or 0 for `Unknown`.
    #[inline]
    pub const fn bits_per_sample(self) -> u32 {
        self.info().bits_per_sample
    }

    /// Luma samples per chroma sample horizontally (0 = no chroma).
    #[inline]
    pub const fn horizontal_subsampling(self) -> u32 {
        self.info().subsampling_horizontal
    }

    /// Luma samples per chroma sample vertically (0 = no chroma).
    #[inline]
    pub const fn vertical_subsampling(self) -> u32 {
        self.info().subsampling_vertical
    }

    /// Whether components are stored as separate planes.
    #[inline]
    pub const fn is_planar(self) -> bool {
        self.info().planar
    }

    /// Whether the Cr plane precedes the Cb plane in memory.
    #[inline]
    pub const fn is_chroma_swapped(self) -> bool {
        matches!(self, Self::YCrCb422Planar8 | Self::YCrCb444Planar8)
    }

    /// Bytes used for one sample in the unpacked 4:4:4 buffer: 1 for 8-bit
    /// sources, 2 for everything deeper.
    #[inline]
    pub const fn sample_bytes(self) -> usize {
        if self.bits_per_sample() <= 8 {
            1
        } else {
            2
        }
    }

    /// Size in bytes of one raw frame of `width`×`height` pixels, or 0 if
    /// the format cannot be sized (`Unknown`).
    ///
    /// A pixel count that does not divide the bits-per-pixel denominator is
    /// rounded up to the next full group, and a bit count that does not
    /// divide 8 is rounded up to the next byte; both cases are logged and
    /// callers must tolerate the trailing padding.
    pub fn bytes_per_frame(self, width: u32, height: u32) -> usize {
        let fmt = self.info();
        if fmt.bits_per_pixel_denominator == 0 {
            return 0;
        }

        let num_samples = width as usize * height as usize;
        let remainder = num_samples % fmt.bits_per_pixel_denominator as usize;
        let mut bits = num_samples / fmt.bits_per_pixel_denominator as usize;
        if remainder == 0 {
            bits *= fmt.bits_per_pixel_nominator as usize;
        } else {
            warn!(
                pixel_format = %self,
                "pixel count not divisible by bpp denominator, rounding up"
            );
            bits = (bits + 1) * fmt.bits_per_pixel_nominator as usize;
        }
        if bits % 8 != 0 {
            warn!(pixel_format = %self, "bit count not divisible by 8, rounding up");
            bits += 8;
        }

        bits / 8
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_sizable_format() -> impl Strategy<Value = PixelFormat> {
        prop_oneof![
            Just(PixelFormat::Rgb32),
            Just(PixelFormat::Rgb24),
            Just(PixelFormat::YCbCr411Planar8),
            Just(PixelFormat::YCbCr420Planar8),
            Just(PixelFormat::YCbCr422Planar8),
            Just(PixelFormat::Uyvy422),
            Just(PixelFormat::YCbCr422Packed10),
            Just(PixelFormat::YCbCr444Planar8),
            Just(PixelFormat::YCbCr444Planar16Le),
            Just(PixelFormat::Gray8),
            Just(PixelFormat::YCbCr420Planar10Le),
            Just(PixelFormat::Uyvy422Packed10),
        ]
    }

    proptest! {
        /// For aligned pixel counts the frame holds at least the exact bit
        /// budget and at most 7 bits of byte padding on top of it.
        #[test]
        fn prop_frame_size_tight(
            fmt in arb_sizable_format(),
            w in 1u32..512,
            h in 1u32..512,
        ) {
            let fi = fmt.info();
            let n = w as usize * h as usize;
            prop_assume!(n % fi.bits_per_pixel_denominator as usize == 0);

            let exact_bits =
                n / fi.bits_per_pixel_denominator as usize * fi.bits_per_pixel_nominator as usize;
            let bytes = fmt.bytes_per_frame(w, h);
            prop_assert!(bytes * 8 >= exact_bits);
            prop_assert!(bytes * 8 - exact_bits < 8);
        }

        /// Sizing never depends on which of two equal-area shapes is used
        /// when both are group-aligned.
        #[test]
        fn prop_frame_size_area_only(fmt in arb_sizable_format(), w in 1u32..128, h in 1u32..128) {
            let fi = fmt.info();
            let n = w as usize * h as usize;
            prop_assume!(n % fi.bits_per_pixel_denominator as usize == 0);
            prop_assert_eq!(fmt.bytes_per_frame(w, h), fmt.bytes_per_frame(h, w));
        }
    }
}
