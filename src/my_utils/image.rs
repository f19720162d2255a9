use image::imageops::{resize, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::config::NormalizeArgs;
use crate::error::{DetectionError, DetectionResult};
use crate::models::engine_rec::NormalizedImage;

/// 归一化：缩放到工作宽度，只在亮度通道上做 CLAHE，色度保持不变
pub fn normalize(image: &DynamicImage, args: &NormalizeArgs) -> DetectionResult<NormalizedImage> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(DetectionError::InvalidImage(format!("empty image {w}x{h}")));
    }
    if args.target_width == 0 {
        return Err(DetectionError::InvalidImage("target width is 0".to_string()));
    }
    let scale = args.target_width as f32 / w as f32;
    // 高度只由宽度比例推出
    let target_h = ((h as f32 * scale) as u32).max(1);
    let resized = resize(&image.to_rgb8(), args.target_width, target_h, FilterType::Triangle);
    let rgb = equalize_luma(&resized, args.clahe_clip_limit, args.clahe_tiles);
    Ok(NormalizedImage { rgb, scale })
}

/// rgb -> YCbCr 的亮度分量
fn luma_of(p: &Rgb<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

/// 亮度通道均衡后转回rgb
pub fn equalize_luma(img: &RgbImage, clip_limit: f32, tiles: u32) -> RgbImage {
    let luma = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([luma_of(img.get_pixel(x, y)).round().clamp(0.0, 255.0) as u8])
    });
    let equalized = clahe(&luma, clip_limit, tiles);

    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
        let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
        let y_new = equalized.get_pixel(x, y)[0] as f32;
        let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        Rgb([
            to_u8(y_new + 1.402 * (cr - 128.0)),
            to_u8(y_new - 0.344136 * (cb - 128.0) - 0.714136 * (cr - 128.0)),
            to_u8(y_new + 1.772 * (cb - 128.0)),
        ])
    })
}

/// 限制对比度的自适应直方图均衡
/// 每块单独算映射表，块之间做双线性插值
pub fn clahe(img: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tiles_x = tiles.clamp(1, w) as usize;
    let tiles_y = tiles.clamp(1, h) as usize;
    let x_edges: Vec<u32> = (0..=tiles_x).map(|i| (i as u64 * w as u64 / tiles_x as u64) as u32).collect();
    let y_edges: Vec<u32> = (0..=tiles_y).map(|i| (i as u64 * h as u64 / tiles_y as u64) as u32).collect();

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; 256];
            for y in y_edges[ty]..y_edges[ty + 1] {
                for x in x_edges[tx]..x_edges[tx + 1] {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x_edges[tx + 1] - x_edges[tx]) * (y_edges[ty + 1] - y_edges[ty]);
            luts[ty * tiles_x + tx] = tile_lut(&mut hist, area, clip_limit);
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    GrayImage::from_fn(w, h, |x, y| {
        let v = img.get_pixel(x, y)[0] as usize;
        let txf = (x as f32 + 0.5) / tile_w - 0.5;
        let tyf = (y as f32 + 0.5) / tile_h - 0.5;
        let tx1 = txf.floor();
        let ty1 = tyf.floor();
        let xa = txf - tx1;
        let ya = tyf - ty1;
        let clamp_x = |t: f32| (t.max(0.0) as usize).min(tiles_x - 1);
        let clamp_y = |t: f32| (t.max(0.0) as usize).min(tiles_y - 1);
        let (x1, x2) = (clamp_x(tx1), clamp_x(tx1 + 1.0));
        let (y1, y2) = (clamp_y(ty1), clamp_y(ty1 + 1.0));
        let lut = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = lut(x1, y1) * (1.0 - xa) + lut(x2, y1) * xa;
        let bottom = lut(x1, y2) * (1.0 - xa) + lut(x2, y2) * xa;
        Luma([(top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8])
    })
}

/// 裁剪直方图并把超出部分平均分回去，再求累积映射
fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let batch = excess / 256;
        let residual = (excess - batch * 256) as usize;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }
    let scale = 255.0 / area as f32;
    let mut sum = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        sum += bin;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = (60 + (x + y) % 40) as u8;
            Rgb([v, v / 2 + 20, 200 - v])
        })
    }

    #[test]
    fn test_normalize_width_and_scale() {
        let img = DynamicImage::ImageRgb8(gradient(1600, 1000));
        let normalized = normalize(&img, &NormalizeArgs::default()).unwrap();
        assert_eq!(normalized.rgb.dimensions(), (800, 500));
        assert_eq!(normalized.scale, 0.5);

        let small = DynamicImage::ImageRgb8(gradient(400, 333));
        let normalized = normalize(&small, &NormalizeArgs::default()).unwrap();
        assert_eq!(normalized.rgb.dimensions(), (800, 666));
    }

    #[test]
    fn test_normalize_empty_image() {
        let img = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(
            normalize(&img, &NormalizeArgs::default()),
            Err(DetectionError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([100 + (x % 16) as u8]));
        let out = clahe(&img, 40.0, 2);
        let (min, max) = out.pixels().fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        assert!(max - min > 16);
    }

    #[test]
    fn test_equalize_keeps_gray_gray() {
        let img = RgbImage::from_fn(32, 32, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgb([v, v, v])
        });
        let out = equalize_luma(&img, 2.0, 4);
        for p in out.pixels() {
            assert!((p[0] as i16 - p[1] as i16).abs() <= 1);
            assert!((p[1] as i16 - p[2] as i16).abs() <= 1);
        }
    }
}
