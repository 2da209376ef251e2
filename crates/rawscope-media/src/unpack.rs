//! Unpacking and chroma upsampling to planar 4:4:4.
//!
//! Every supported raw layout is normalized here into one intermediate
//! form: three concatenated Y, Cb, Cr planes of full luma resolution.
//! 8-bit sources stay in 8-bit lanes; deeper sources are left-justified
//! into 16-bit lanes (10-bit data shifted up by 6, 12-bit by 4), which
//! makes every high-depth stream numerically a 16-bit stream.

use rawscope_core::{PixelFormat, RawScopeError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Chroma sample positioning assumed when upsampling 4:2:0 material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChromaInterpolation {
    /// Chroma sited vertically midway between two luma lines.
    #[default]
    BiLinear,
    /// Chroma sited at the center of each 2x2 luma block.
    Interstitial,
}

/// Sample storage of an unpacked 4:4:4 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleBuf {
    /// 8-bit lanes.
    B8(Vec<u8>),
    /// 16-bit lanes (10/12-bit payloads left-justified).
    B16(Vec<u16>),
}

/// A planar 4:4:4 frame: Y, Cb, Cr planes of `width * height` samples
/// each, stored back to back in one buffer.
///
/// The buffer is reused across decode calls; [`to_yuv444`] resizes it as
/// needed without reallocating when the capacity already suffices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Yuv444Frame {
    width: usize,
    height: usize,
    samples: SampleBuf,
}

impl Default for Yuv444Frame {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            samples: SampleBuf::B8(Vec::new()),
        }
    }
}

impl Yuv444Frame {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from existing planes (Y, Cb, Cr concatenated,
    /// `3 * width * height` samples). Returns `None` when the buffer
    /// length does not match the dimensions.
    pub fn from_samples(width: usize, height: usize, samples: SampleBuf) -> Option<Self> {
        let n = 3 * width * height;
        let fits = match &samples {
            SampleBuf::B8(buf) => buf.len() == n,
            SampleBuf::B16(buf) => buf.len() == n,
        };
        fits.then_some(Self {
            width,
            height,
            samples,
        })
    }

    /// Luma width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Luma height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Samples per plane.
    pub fn luma_len(&self) -> usize {
        self.width * self.height
    }

    /// The underlying sample storage.
    pub fn samples(&self) -> &SampleBuf {
        &self.samples
    }

    /// The Y, Cb, Cr planes of an 8-bit frame.
    pub fn planes8(&self) -> Option<(&[u8], &[u8], &[u8])> {
        let n = self.luma_len();
        match &self.samples {
            SampleBuf::B8(buf) if buf.len() >= 3 * n => {
                let (y, rest) = buf.split_at(n);
                let (u, v) = rest.split_at(n);
                Some((y, u, v))
            }
            _ => None,
        }
    }

    /// The Y, Cb, Cr planes of a 16-bit-lane frame.
    pub fn planes16(&self) -> Option<(&[u16], &[u16], &[u16])> {
        let n = self.luma_len();
        match &self.samples {
            SampleBuf::B16(buf) if buf.len() >= 3 * n => {
                let (y, rest) = buf.split_at(n);
                let (u, v) = rest.split_at(n);
                Some((y, u, v))
            }
            _ => None,
        }
    }

    fn prepare8(&mut self, w: usize, h: usize) -> &mut [u8] {
        self.width = w;
        self.height = h;
        if !matches!(self.samples, SampleBuf::B8(_)) {
            self.samples = SampleBuf::B8(Vec::new());
        }
        let SampleBuf::B8(buf) = &mut self.samples else {
            unreachable!()
        };
        buf.resize(3 * w * h, 0);
        buf
    }

    fn prepare16(&mut self, w: usize, h: usize) -> &mut [u16] {
        self.width = w;
        self.height = h;
        if !matches!(self.samples, SampleBuf::B16(_)) {
            self.samples = SampleBuf::B16(Vec::new());
        }
        let SampleBuf::B16(buf) = &mut self.samples else {
            unreachable!()
        };
        buf.resize(3 * w * h, 0);
        buf
    }
}

/// Unpack a raw frame into planar 4:4:4.
///
/// `src` must hold at least `fmt.bytes_per_frame(width, height)` bytes.
/// Chroma planes are upsampled to full resolution; for 4:2:0 8-bit
/// material the reconstruction filter is selected by `mode`, everything
/// else replicates the nearest chroma sample. Y'CrCb layouts are emitted
/// in Cb-then-Cr order like all the others.
pub fn to_yuv444(
    src: &[u8],
    fmt: PixelFormat,
    width: u32,
    height: u32,
    mode: ChromaInterpolation,
    dst: &mut Yuv444Frame,
) -> Result<()> {
    let info = fmt.info();
    if info.bits_per_pixel_denominator == 0 {
        return Err(RawScopeError::UnknownFormat(fmt));
    }

    let w = width as usize;
    let h = height as usize;
    let hss = info.subsampling_horizontal as usize;
    let vss = info.subsampling_vertical as usize;
    let cw = if hss == 0 { 0 } else { w / hss };
    let ch = if vss == 0 { 0 } else { h / vss };
    if w == 0 || h == 0 || (hss > 0 && (cw == 0 || ch == 0)) {
        return Err(RawScopeError::InvalidDimensions {
            width,
            height,
            format: fmt,
        });
    }

    let expected = fmt.bytes_per_frame(width, height);
    if src.len() < expected {
        return Err(RawScopeError::SizeMismatch {
            expected,
            actual: src.len(),
        });
    }

    let len = w * h;
    match fmt {
        PixelFormat::Gray8 => {
            let dst = dst.prepare8(w, h);
            dst[..len].copy_from_slice(&src[..len]);
            dst[len..].fill(128);
        }
        PixelFormat::Uyvy422 => unpack_uyvy422(src, dst.prepare8(w, h), w, h),
        PixelFormat::Uyvy422Packed10 => {
            unpack_packed10(src, dst.prepare16(w, h), len, decode_group_be)
        }
        PixelFormat::YCbCr422Packed10 => {
            unpack_packed10(src, dst.prepare16(w, h), len, decode_group_le)
        }
        PixelFormat::YCbCr420Planar8 => {
            let dst = dst.prepare8(w, h);
            match mode {
                ChromaInterpolation::BiLinear => upsample_420_bilinear(src, dst, w, h, cw, ch),
                ChromaInterpolation::Interstitial => {
                    upsample_420_interstitial(src, dst, w, h, cw, ch)
                }
            }
        }
        PixelFormat::YCbCr420Planar10Le => {
            unpack_420_planar10_le(src, dst.prepare16(w, h), w, h, cw, ch)
        }
        PixelFormat::YCbCr444Planar12Swapped | PixelFormat::YCbCr444Planar16Swapped => {
            unpack_swab16(src, dst.prepare16(w, h))
        }
        f if f.is_planar() && f.bits_per_sample() == 8 => {
            let dst = dst.prepare8(w, h);
            unpack_planar8_nearest(src, dst, w, h, cw, ch, hss, vss, f.is_chroma_swapped());
        }
        PixelFormat::YCbCr444Planar12Le | PixelFormat::YCbCr444Planar16Le
        | PixelFormat::Gbr12In16Le => {
            let shift = 16 - info.bits_per_sample;
            unpack_planar16(src, dst.prepare16(w, h), shift, u16::from_le_bytes);
        }
        PixelFormat::YCbCr444Planar12Be | PixelFormat::YCbCr444Planar16Be => {
            let shift = 16 - info.bits_per_sample;
            unpack_planar16(src, dst.prepare16(w, h), shift, u16::from_be_bytes);
        }
        PixelFormat::YCbCr444Planar12Native | PixelFormat::YCbCr444Planar16Native => {
            let shift = 16 - info.bits_per_sample;
            unpack_planar16(src, dst.prepare16(w, h), shift, u16::from_ne_bytes);
        }
        _ => return Err(RawScopeError::UnknownFormat(fmt)),
    }

    Ok(())
}

fn split3_mut<T>(buf: &mut [T], len: usize) -> (&mut [T], &mut [T], &mut [T]) {
    let (y, rest) = buf.split_at_mut(len);
    let (u, v) = rest.split_at_mut(len);
    (y, u, v)
}

// ── Packed 8-bit 4:2:2 ──────────────────────────────────────────

fn unpack_uyvy422(src: &[u8], dst: &mut [u8], w: usize, h: usize) {
    let len = w * h;
    let (dst_y, dst_u, dst_v) = split3_mut(dst, len);
    dst_y
        .par_chunks_exact_mut(w)
        .zip(dst_u.par_chunks_exact_mut(w))
        .zip(dst_v.par_chunks_exact_mut(w))
        .enumerate()
        .for_each(|(row, ((ry, ru), rv))| {
            let src_row = &src[2 * row * w..2 * (row + 1) * w];
            for x in 0..w {
                ry[x] = src_row[2 * x + 1];
                let pair = 2 * (x & !1);
                ru[x] = src_row[pair];
                rv[x] = if pair + 2 < src_row.len() {
                    src_row[pair + 2]
                } else {
                    src_row[pair]
                };
            }
        });
}

// ── Packed 10-bit 4:2:2 ─────────────────────────────────────────
//
// Four 32-bit words carry six pixels: six luma samples and three chroma
// pairs, each pair shared by two adjacent pixels. All fields end up
// left-justified in 16-bit lanes.

fn decode_group_be(group: &[u8]) -> ([u16; 6], [u16; 6], [u16; 6]) {
    let word = |i: usize| {
        u32::from_be_bytes([group[4 * i], group[4 * i + 1], group[4 * i + 2], group[4 * i + 3]])
    };
    let mut ys = [0u16; 6];
    let mut us = [0u16; 6];
    let mut vs = [0u16; 6];

    let v0 = word(0);
    vs[0] = ((v0 & 0xffc0_0000) >> 16) as u16;
    vs[1] = vs[0];
    ys[0] = ((v0 & 0x003f_f000) >> 6) as u16;
    us[0] = ((v0 & 0x0000_0ffc) << 4) as u16;
    us[1] = us[0];

    let v1 = word(1);
    ys[1] = ((v1 & 0xffc0_0000) >> 16) as u16;
    vs[2] = ((v1 & 0x003f_f000) >> 6) as u16;
    vs[3] = vs[2];
    ys[2] = ((v1 & 0x0000_0ffc) << 4) as u16;

    let v2 = word(2);
    us[2] = ((v2 & 0xffc0_0000) >> 16) as u16;
    us[3] = us[2];
    ys[3] = ((v2 & 0x003f_f000) >> 6) as u16;
    vs[4] = ((v2 & 0x0000_0ffc) << 4) as u16;
    vs[5] = vs[4];

    let v3 = word(3);
    ys[4] = ((v3 & 0xffc0_0000) >> 16) as u16;
    us[4] = ((v3 & 0x003f_f000) >> 6) as u16;
    us[5] = us[4];
    ys[5] = ((v3 & 0x0000_0ffc) << 4) as u16;

    (ys, us, vs)
}

fn decode_group_le(group: &[u8]) -> ([u16; 6], [u16; 6], [u16; 6]) {
    let word = |i: usize| {
        u32::from_le_bytes([group[4 * i], group[4 * i + 1], group[4 * i + 2], group[4 * i + 3]])
    };
    let mut ys = [0u16; 6];
    let mut us = [0u16; 6];
    let mut vs = [0u16; 6];

    let v0 = word(0);
    vs[0] = ((v0 & 0x3ff0_0000) >> 14) as u16;
    vs[1] = vs[0];
    ys[0] = ((v0 & 0x000f_fc00) >> 4) as u16;
    us[0] = ((v0 & 0x0000_03ff) << 6) as u16;
    us[1] = us[0];

    let v1 = word(1);
    ys[1] = ((v1 & 0x0000_03ff) << 6) as u16;
    us[2] = ((v1 & 0x000f_fc00) >> 4) as u16;
    us[3] = us[2];
    ys[2] = ((v1 & 0x3ff0_0000) >> 14) as u16;

    let v2 = word(2);
    us[4] = ((v2 & 0x3ff0_0000) >> 14) as u16;
    us[5] = us[4];
    ys[3] = ((v2 & 0x000f_fc00) >> 4) as u16;
    vs[2] = ((v2 & 0x0000_03ff) << 6) as u16;
    vs[3] = vs[2];

    let v3 = word(3);
    ys[4] = ((v3 & 0x0000_03ff) << 6) as u16;
    vs[4] = ((v3 & 0x000f_fc00) >> 4) as u16;
    vs[5] = vs[4];
    ys[5] = ((v3 & 0x3ff0_0000) >> 14) as u16;

    (ys, us, vs)
}

fn unpack_packed10<D>(src: &[u8], dst: &mut [u16], luma_len: usize, decode: D)
where
    D: Fn(&[u8]) -> ([u16; 6], [u16; 6], [u16; 6]) + Sync,
{
    let (dst_y, dst_u, dst_v) = split3_mut(dst, luma_len);
    dst_y
        .par_chunks_mut(6)
        .zip(dst_u.par_chunks_mut(6))
        .zip(dst_v.par_chunks_mut(6))
        .zip(src.par_chunks(16))
        .for_each(|(((gy, gu), gv), group)| {
            let (ys, us, vs) = decode(group);
            gy.copy_from_slice(&ys[..gy.len()]);
            gu.copy_from_slice(&us[..gu.len()]);
            gv.copy_from_slice(&vs[..gv.len()]);
        });
}

// ── 4:2:0 8-bit upsampling ──────────────────────────────────────

fn bilinear_row(src_row: &[u8], dst_row: &mut [u8]) {
    let cw = src_row.len();
    let w = dst_row.len();
    dst_row[0] = src_row[0];
    for i in 0..cw - 1 {
        dst_row[i * 2 + 1] = ((src_row[i] as u32 + src_row[i + 1] as u32 + 1) >> 1) as u8;
        dst_row[i * 2 + 2] = src_row[i + 1];
    }
    dst_row[w - 1] = dst_row[w - 2];
}

fn upsample_plane_bilinear(srcp: &[u8], dstp: &mut [u8], w: usize, h: usize, cw: usize, ch: usize) {
    bilinear_row(&srcp[..cw], &mut dstp[..w]);

    let middle = &mut dstp[w..(2 * ch - 1) * w];
    middle
        .par_chunks_exact_mut(2 * w)
        .enumerate()
        .for_each(|(j, rows)| {
            let (top, bot) = rows.split_at_mut(w);
            let src_top = &srcp[j * cw..(j + 1) * cw];
            let src_bot = &srcp[(j + 1) * cw..(j + 2) * cw];
            top[0] = ((3 * src_top[0] as u32 + src_bot[0] as u32 + 2) >> 2) as u8;
            bot[0] = ((src_top[0] as u32 + 3 * src_bot[0] as u32 + 2) >> 2) as u8;
            for i in 0..cw - 1 {
                let tl = src_top[i] as u32;
                let tr = src_top[i + 1] as u32;
                let bl = src_bot[i] as u32;
                let br = src_bot[i + 1] as u32;
                top[i * 2 + 1] = ((6 * tl + 6 * tr + 2 * bl + 2 * br + 8) >> 4) as u8;
                bot[i * 2 + 1] = ((2 * tl + 2 * tr + 6 * bl + 6 * br + 8) >> 4) as u8;
                top[i * 2 + 2] = ((3 * tr + br + 2) >> 2) as u8;
                bot[i * 2 + 2] = ((tr + 3 * br + 2) >> 2) as u8;
            }
            top[w - 1] = top[w - 2];
            bot[w - 1] = bot[w - 2];
        });

    let last = (h - 1) * w;
    let src_last = (ch - 1) * cw;
    bilinear_row(&srcp[src_last..src_last + cw], &mut dstp[last..last + w]);
}

fn upsample_420_bilinear(src: &[u8], dst: &mut [u8], w: usize, h: usize, cw: usize, ch: usize) {
    let len = w * h;
    let cl = cw * ch;
    let (dst_y, dst_u, dst_v) = split3_mut(dst, len);
    dst_y.copy_from_slice(&src[..len]);
    upsample_plane_bilinear(&src[len..len + cl], dst_u, w, h, cw, ch);
    upsample_plane_bilinear(&src[len + cl..len + 2 * cl], dst_v, w, h, cw, ch);
}

fn interstitial_row(src_row: &[u8], dst_row: &mut [u8]) {
    let cw = src_row.len();
    let w = dst_row.len();
    dst_row[0] = src_row[0];
    for i in 0..cw - 1 {
        let a = src_row[i] as u32;
        let b = src_row[i + 1] as u32;
        dst_row[i * 2 + 1] = ((3 * a + b + 2) >> 2) as u8;
        dst_row[i * 2 + 2] = ((a + 3 * b + 2) >> 2) as u8;
    }
    dst_row[w - 1] = src_row[cw - 1];
}

fn upsample_plane_interstitial(
    srcp: &[u8],
    dstp: &mut [u8],
    w: usize,
    h: usize,
    cw: usize,
    ch: usize,
) {
    interstitial_row(&srcp[..cw], &mut dstp[..w]);

    let middle = &mut dstp[w..(2 * ch - 1) * w];
    middle
        .par_chunks_exact_mut(2 * w)
        .enumerate()
        .for_each(|(j, rows)| {
            let (top, bot) = rows.split_at_mut(w);
            let src_top = &srcp[j * cw..(j + 1) * cw];
            let src_bot = &srcp[(j + 1) * cw..(j + 2) * cw];
            top[0] = ((3 * src_top[0] as u32 + src_bot[0] as u32 + 2) >> 2) as u8;
            bot[0] = ((src_top[0] as u32 + 3 * src_bot[0] as u32 + 2) >> 2) as u8;
            for i in 0..cw - 1 {
                let tl = src_top[i] as u32;
                let tr = src_top[i + 1] as u32;
                let bl = src_bot[i] as u32;
                let br = src_bot[i + 1] as u32;
                top[i * 2 + 1] = ((9 * tl + 3 * tr + 3 * bl + br + 8) >> 4) as u8;
                bot[i * 2 + 1] = ((3 * tl + tr + 9 * bl + 3 * br + 8) >> 4) as u8;
                top[i * 2 + 2] = ((3 * tl + 9 * tr + bl + 3 * br + 8) >> 4) as u8;
                bot[i * 2 + 2] = ((tl + 3 * tr + 3 * bl + 9 * br + 8) >> 4) as u8;
            }
            let ct = src_top[cw - 1] as u32;
            let cb = src_bot[cw - 1] as u32;
            top[w - 1] = ((3 * ct + cb + 2) >> 2) as u8;
            bot[w - 1] = ((ct + 3 * cb + 2) >> 2) as u8;
        });

    let last = (h - 1) * w;
    let src_last = (ch - 1) * cw;
    interstitial_row(&srcp[src_last..src_last + cw], &mut dstp[last..last + w]);
}

fn upsample_420_interstitial(src: &[u8], dst: &mut [u8], w: usize, h: usize, cw: usize, ch: usize) {
    let len = w * h;
    let cl = cw * ch;
    let (dst_y, dst_u, dst_v) = split3_mut(dst, len);
    dst_y.copy_from_slice(&src[..len]);
    upsample_plane_interstitial(&src[len..len + cl], dst_u, w, h, cw, ch);
    upsample_plane_interstitial(&src[len + cl..len + 2 * cl], dst_v, w, h, cw, ch);
}

// ── Planar 8-bit sample-and-hold ────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn unpack_planar8_nearest(
    src: &[u8],
    dst: &mut [u8],
    w: usize,
    h: usize,
    cw: usize,
    ch: usize,
    hss: usize,
    vss: usize,
    chroma_swapped: bool,
) {
    let len = w * h;
    let cl = cw * ch;
    let (dst_y, dst_u, dst_v) = split3_mut(dst, len);
    dst_y.copy_from_slice(&src[..len]);

    let (src_u, src_v) = if chroma_swapped {
        (&src[len + cl..len + 2 * cl], &src[len..len + cl])
    } else {
        (&src[len..len + cl], &src[len + cl..len + 2 * cl])
    };

    let pow2 = hss.is_power_of_two() && vss.is_power_of_two();
    let h_shift = hss.trailing_zeros();
    let v_shift = vss.trailing_zeros();

    dst_u
        .par_chunks_exact_mut(w)
        .zip(dst_v.par_chunks_exact_mut(w))
        .enumerate()
        .for_each(|(row, (ru, rv))| {
            let sy = (if pow2 { row >> v_shift } else { row / vss }).min(ch - 1);
            let su = &src_u[sy * cw..(sy + 1) * cw];
            let sv = &src_v[sy * cw..(sy + 1) * cw];
            if pow2 {
                for x in 0..w {
                    let sx = (x >> h_shift).min(cw - 1);
                    ru[x] = su[sx];
                    rv[x] = sv[sx];
                }
            } else {
                for x in 0..w {
                    let sx = (x / hss).min(cw - 1);
                    ru[x] = su[sx];
                    rv[x] = sv[sx];
                }
            }
        });
}

// ── Planar high bit depth ───────────────────────────────────────

fn unpack_420_planar10_le(src: &[u8], dst: &mut [u16], w: usize, h: usize, cw: usize, ch: usize) {
    let len = w * h;
    let cl = cw * ch;
    let (dst_y, dst_u, dst_v) = split3_mut(dst, len);
    let src_y = &src[..2 * len];
    let src_u = &src[2 * len..2 * (len + cl)];
    let src_v = &src[2 * (len + cl)..2 * (len + 2 * cl)];
    let le16 = |p: &[u8], i: usize| u16::from_le_bytes([p[2 * i], p[2 * i + 1]]);

    dst_y
        .par_chunks_exact_mut(w)
        .zip(dst_u.par_chunks_exact_mut(w))
        .zip(dst_v.par_chunks_exact_mut(w))
        .enumerate()
        .for_each(|(row, ((ry, ru), rv))| {
            let sy = (row / 2).min(ch - 1);
            for x in 0..w {
                let sx = (x / 2).min(cw - 1);
                ry[x] = le16(src_y, row * w + x) << 6;
                ru[x] = le16(src_u, sy * cw + sx) << 6;
                rv[x] = le16(src_v, sy * cw + sx) << 6;
            }
        });
}

/// Byte-pair swap over the whole frame, the `swab(3)` treatment the
/// "swapped" planar formats receive. No depth shift is applied.
fn unpack_swab16(src: &[u8], dst: &mut [u16]) {
    dst.par_iter_mut()
        .zip(src.par_chunks_exact(2))
        .for_each(|(lane, pair)| {
            *lane = u16::from_ne_bytes([pair[1], pair[0]]);
        });
}

fn unpack_planar16<F>(src: &[u8], dst: &mut [u16], shift: u32, load: F)
where
    F: Fn([u8; 2]) -> u16 + Sync,
{
    dst.par_iter_mut()
        .zip(src.par_chunks_exact(2))
        .for_each(|(lane, pair)| {
            *lane = load([pair[0], pair[1]]) << shift;
        });
}
