//! Benchmarks for the rawscope-media decode pipeline.
//!
//! Run with: cargo bench -p rawscope-media

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rawscope_core::PixelFormat;
use rawscope_media::{
    to_rgb24, to_yuv444, ChromaInterpolation, ColorMatrix, Yuv444Frame,
};

const W: u32 = 640;
const H: u32 = 360;

fn raw_frame(format: PixelFormat) -> Vec<u8> {
    let len = format.bytes_per_frame(W, H);
    (0..len).map(|i| (i * 31) as u8).collect()
}

fn bench_unpack(c: &mut Criterion) {
    let i420 = raw_frame(PixelFormat::YCbCr420Planar8);
    let uyvy = raw_frame(PixelFormat::Uyvy422);
    let v210 = raw_frame(PixelFormat::YCbCr422Packed10);
    let mut out = Yuv444Frame::new();

    c.bench_function("to_yuv444_420_bilinear_640x360", |bencher| {
        bencher.iter(|| {
            to_yuv444(
                black_box(&i420),
                PixelFormat::YCbCr420Planar8,
                W,
                H,
                ChromaInterpolation::BiLinear,
                &mut out,
            )
            .unwrap()
        });
    });

    c.bench_function("to_yuv444_420_interstitial_640x360", |bencher| {
        bencher.iter(|| {
            to_yuv444(
                black_box(&i420),
                PixelFormat::YCbCr420Planar8,
                W,
                H,
                ChromaInterpolation::Interstitial,
                &mut out,
            )
            .unwrap()
        });
    });

    c.bench_function("to_yuv444_uyvy_640x360", |bencher| {
        bencher.iter(|| {
            to_yuv444(
                black_box(&uyvy),
                PixelFormat::Uyvy422,
                W,
                H,
                ChromaInterpolation::BiLinear,
                &mut out,
            )
            .unwrap()
        });
    });

    c.bench_function("to_yuv444_packed10_le_640x360", |bencher| {
        bencher.iter(|| {
            to_yuv444(
                black_box(&v210),
                PixelFormat::YCbCr422Packed10,
                W,
                H,
                ChromaInterpolation::BiLinear,
                &mut out,
            )
            .unwrap()
        });
    });
}

fn bench_convert(c: &mut Criterion) {
    let i420 = raw_frame(PixelFormat::YCbCr420Planar8);
    let p10 = raw_frame(PixelFormat::YCbCr420Planar10Le);
    let mut yuv8 = Yuv444Frame::new();
    let mut yuv16 = Yuv444Frame::new();
    to_yuv444(
        &i420,
        PixelFormat::YCbCr420Planar8,
        W,
        H,
        ChromaInterpolation::BiLinear,
        &mut yuv8,
    )
    .unwrap();
    to_yuv444(
        &p10,
        PixelFormat::YCbCr420Planar10Le,
        W,
        H,
        ChromaInterpolation::BiLinear,
        &mut yuv16,
    )
    .unwrap();
    let mut rgb = Vec::new();

    c.bench_function("to_rgb24_8bit_640x360", |bencher| {
        bencher.iter(|| to_rgb24(black_box(&yuv8), ColorMatrix::Bt601, &mut rgb).unwrap());
    });

    c.bench_function("to_rgb24_16bit_640x360", |bencher| {
        bencher.iter(|| to_rgb24(black_box(&yuv16), ColorMatrix::Bt601, &mut rgb).unwrap());
    });
}

criterion_group!(benches, bench_unpack, bench_convert);
criterion_main!(benches);
