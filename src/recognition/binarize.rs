use image::imageops::grayscale;
use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::{filter3x3, separable_filter_equal};

use crate::config::BinarizeArgs;
use crate::models::engine_rec::{BinarizedImage, NormalizedImage};
use crate::models::variant::BinarizePolicy;

/// 3x3 高斯核 [1,2,1]^T [1,2,1] / 16
const GAUSSIAN_3X3: [f32; 9] = [
    0.0625, 0.125, 0.0625,
    0.125, 0.25, 0.125,
    0.0625, 0.125, 0.0625,
];

/// 灰度 + 3x3 高斯模糊 + 按策略二值化，前景为255
pub fn binarize(normalized: &NormalizedImage, policy: BinarizePolicy, args: &BinarizeArgs) -> BinarizedImage {
    let gray = grayscale(&normalized.rgb);
    let blurred = if args.gaussian_blur { blur3x3(&gray) } else { gray };
    binarize_gray(&blurred, policy, args)
}

/// 对已经模糊过的灰度图二值化
pub fn binarize_gray(blurred: &GrayImage, policy: BinarizePolicy, args: &BinarizeArgs) -> BinarizedImage {
    match policy {
        BinarizePolicy::Otsu => {
            let level = otsu_level(blurred);
            BinarizedImage { gray: threshold(blurred, level), threshold: Some(level) }
        }
        BinarizePolicy::Binary => BinarizedImage {
            gray: threshold(blurred, args.fixed_threshold),
            threshold: Some(args.fixed_threshold),
        },
        BinarizePolicy::BinaryOtsu => {
            // 两个条件都满足才算前景，等价于取较大的阈值
            let level = otsu_level(blurred).max(args.fixed_threshold);
            BinarizedImage { gray: threshold(blurred, level), threshold: Some(level) }
        }
        BinarizePolicy::Adaptive => BinarizedImage {
            gray: adaptive_gaussian_threshold(blurred, args.adaptive_block_size, args.adaptive_offset),
            threshold: None,
        },
    }
}

pub fn blur3x3(gray: &GrayImage) -> GrayImage {
    filter3x3::<Luma<u8>, f32, u8>(gray, &GAUSSIAN_3X3)
}

/// 窗口大小换算成高斯核 sigma
fn block_sigma(block_size: u32) -> f32 {
    let k = block_size.max(3) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
}

/// 正好 block_size 个抽头的归一化一维高斯核，block_size 取奇数
fn gaussian_kernel(block_size: u32) -> Vec<f32> {
    let size = block_size.max(3) | 1;
    let sigma = block_sigma(size);
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// 局部高斯加权均值减去偏移作为每个像素的阈值
pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let local_mean = separable_filter_equal(gray, &gaussian_kernel(block_size));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0] as i16;
        let t = local_mean.get_pixel(x, y)[0] as i16 - offset;
        if v > t { Luma([255u8]) } else { Luma([0u8]) }
    })
}
