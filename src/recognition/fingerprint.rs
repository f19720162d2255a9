//! DCT 感知哈希
//!
//! 灰度 -> 缩放到 hash_size*highfreq_factor 的正方形 -> 二维 DCT-II
//! -> 取左上角 hash_size*hash_size 的低频块 -> 与中位数比较得到 bit。

use std::f64::consts::PI;

use anyhow::{anyhow, Result};
use image::imageops::{resize, FilterType};
use image::{DynamicImage, GrayImage, Luma};

use crate::config::{FingerprintArgs, CONFIG};
use crate::models::fingerprint::{Fingerprint, FINGERPRINT_BITS};
use crate::my_utils::math::median;

/// 使用全局配置计算指纹
pub fn fingerprint(image: &DynamicImage) -> Result<Fingerprint> {
    fingerprint_with(image, &CONFIG.fingerprint)
}

pub fn fingerprint_with(image: &DynamicImage, args: &FingerprintArgs) -> Result<Fingerprint> {
    let hash_size = args.hash_size as usize;
    if hash_size == 0 || hash_size * hash_size > FINGERPRINT_BITS {
        return Err(anyhow!("hash size {hash_size} does not fit in {FINGERPRINT_BITS} bits"));
    }
    if args.highfreq_factor == 0 {
        return Err(anyhow!("highfreq factor must be positive"));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!("cannot fingerprint empty image"));
    }
    let size = args.hash_size * args.highfreq_factor;

    let gray = luma_601(image);
    let small = resize(&gray, size, size, FilterType::Lanczos3);
    let low = low_frequency_dct(&small, hash_size);
    let med = median(&low).ok_or_else(|| anyhow!("empty dct block"))?;

    Fingerprint::from_bits(low.iter().map(|&v| v > med))
}

/// ITU-R 601 权重的灰度图
fn luma_601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let l = (p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000;
        Luma([l as u8])
    })
}

/// 只计算二维 DCT-II 的前 k*k 个系数，按行展开。
/// 未归一化，整体比例不影响和中位数的比较。
fn low_frequency_dct(img: &GrayImage, k: usize) -> Vec<f64> {
    let n = img.width() as usize;
    let basis: Vec<Vec<f64>> = (0..k)
        .map(|u| {
            (0..n)
                .map(|i| (PI * u as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos())
                .collect()
        })
        .collect();

    // 先沿列方向(纵向频率)，再沿行方向
    let mut vertical = vec![vec![0f64; n]; k];
    for (u, row) in vertical.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let mut sum = 0f64;
            for i in 0..n {
                sum += basis[u][i] * img.get_pixel(j as u32, i as u32)[0] as f64;
            }
            *cell = sum;
        }
    }

    let mut out = Vec::with_capacity(k * k);
    for row in vertical.iter() {
        for v in 0..k {
            let sum: f64 = row.iter().zip(basis[v].iter()).map(|(a, b)| a * b).sum();
            out.push(sum);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scene(w: u32, h: u32, shift: i32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            let base: i32 = if (x / 40 + y / 60) % 2 == 0 { 60 } else { 170 };
            let v = (base + (x as i32 * 40 / w as i32) + shift).clamp(0, 255) as u8;
            Rgb([v, v, v])
        }))
    }

    /// 粗网格随机值双线性插值出来的平滑纹理
    fn texture(w: u32, h: u32) -> DynamicImage {
        let cell_value = |cx: u32, cy: u32| -> f32 {
            let s = (cx.wrapping_mul(73856093) ^ cy.wrapping_mul(19349663))
                .wrapping_mul(1103515245)
                .wrapping_add(12345);
            ((s >> 16) % 200 + 28) as f32
        };
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            let fx = x as f32 / 40.0;
            let fy = y as f32 / 40.0;
            let (cx, cy) = (fx.floor() as u32, fy.floor() as u32);
            let (tx, ty) = (fx.fract(), fy.fract());
            let top = cell_value(cx, cy) * (1.0 - tx) + cell_value(cx + 1, cy) * tx;
            let bottom = cell_value(cx, cy + 1) * (1.0 - tx) + cell_value(cx + 1, cy + 1) * tx;
            let v = (top * (1.0 - ty) + bottom * ty) as u8;
            Rgb([v, v / 2 + 40, 255 - v])
        }))
    }

    fn invert(img: &DynamicImage) -> DynamicImage {
        let mut rgb = img.to_rgb8();
        for p in rgb.pixels_mut() {
            *p = Rgb([255 - p[0], 255 - p[1], 255 - p[2]]);
        }
        DynamicImage::ImageRgb8(rgb)
    }

    #[test]
    fn test_deterministic() {
        let img = scene(300, 420, 0);
        let a = fingerprint_with(&img, &FingerprintArgs::default()).unwrap();
        let b = fingerprint_with(&img, &FingerprintArgs::default()).unwrap();
        assert_eq!(a, b);
        // 256 bit，与中位数比较，大约一半为1
        let ones = a.count_ones();
        assert!((100..=156).contains(&ones), "{ones}");
    }

    #[test]
    fn test_brightness_shift_is_close() {
        let args = FingerprintArgs::default();
        let a = fingerprint_with(&scene(300, 420, 0), &args).unwrap();
        let b = fingerprint_with(&scene(300, 420, 12), &args).unwrap();
        assert!(a.hamming(&b) <= 8, "{}", a.hamming(&b));
    }

    #[test]
    fn test_rescaled_copy_is_close() {
        let args = FingerprintArgs::default();
        let img = texture(476, 664);
        let bigger = DynamicImage::ImageRgb8(resize(&img.to_rgb8(), 952, 1328, FilterType::Triangle));
        let a = fingerprint_with(&img, &args).unwrap();
        let b = fingerprint_with(&bigger, &args).unwrap();
        assert!(a.hamming(&b) <= 32, "{}", a.hamming(&b));
    }

    #[test]
    fn test_inverted_is_far() {
        let args = FingerprintArgs::default();
        let img = scene(300, 420, 0);
        let a = fingerprint_with(&img, &args).unwrap();
        let b = fingerprint_with(&invert(&img), &args).unwrap();
        assert!(a.hamming(&b) > 128, "{}", a.hamming(&b));
    }

    #[test]
    fn test_smaller_hash_size() {
        let args = FingerprintArgs { hash_size: 8, highfreq_factor: 4 };
        let fp = fingerprint_with(&scene(100, 100, 0), &args).unwrap();
        // 64 bit 右对齐，高位全为0
        assert!((64..256).all(|i| !fp.bit(i)));
    }

    #[test]
    fn test_invalid_args() {
        let img = scene(50, 50, 0);
        assert!(fingerprint_with(&img, &FingerprintArgs { hash_size: 17, highfreq_factor: 4 }).is_err());
        assert!(fingerprint_with(&img, &FingerprintArgs { hash_size: 16, highfreq_factor: 0 }).is_err());
        assert!(fingerprint_with(&DynamicImage::new_rgb8(0, 3), &FingerprintArgs::default()).is_err());
    }
}
