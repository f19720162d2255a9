//! 卡片分割与透视摆正
//!
//! 在二值图(工作分辨率)上找卡片四边形，按比例映射回原图后
//! 在原图上做透视变换，得到固定大小的卡片图。

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;

use crate::config::SegmentArgs;
use crate::error::{DetectionError, DetectionResult};
use crate::models::card::Quadrilateral;
use crate::models::engine_rec::BinarizedImage;
use crate::my_utils::math::{approximate_closed_polygon, is_convex, order_corners};

/// 在二值图上确定卡片边界的方法
pub trait CardBoundaryStrategy: Send + Sync {
    fn locate(&self, binarized: &GrayImage, args: &SegmentArgs) -> DetectionResult<Quadrilateral>;
}

/// 面积第二大的轮廓就是卡片，最大的那个默认是整幅画面的边框。
/// 要求调用方保证背景占满画面。
#[derive(Debug, Default, Clone, Copy)]
pub struct SecondLargestContour;

/// 不接触画面边界的轮廓里，取最大的凸四边形
#[derive(Debug, Default, Clone, Copy)]
pub struct LargestQuadrilateral;

impl CardBoundaryStrategy for SecondLargestContour {
    fn locate(&self, binarized: &GrayImage, args: &SegmentArgs) -> DetectionResult<Quadrilateral> {
        let contours = ranked_contours(binarized);
        if contours.len() < 2 {
            return Err(DetectionError::SegmentationFailure(format!(
                "found {} contours, need at least 2",
                contours.len()
            )));
        }
        quad_from_contour(&contours[1].points, args)
    }
}

impl CardBoundaryStrategy for LargestQuadrilateral {
    fn locate(&self, binarized: &GrayImage, args: &SegmentArgs) -> DetectionResult<Quadrilateral> {
        let (w, h) = binarized.dimensions();
        let contours = ranked_contours(binarized);
        for contour in contours.iter() {
            if touches_border(&contour.points, w, h) {
                continue;
            }
            let Ok(quad) = quad_from_contour(&contour.points, args) else {
                continue;
            };
            if is_convex(&quad.corners) {
                return Ok(quad);
            }
        }
        Err(DetectionError::SegmentationFailure(format!(
            "no convex quadrilateral among {} contours",
            contours.len()
        )))
    }
}

/// 所有轮廓(外边界和孔洞)按面积降序，面积相同保持原顺序
pub fn ranked_contours(binarized: &GrayImage) -> Vec<Contour<i32>> {
    let contours: Vec<Contour<i32>> = find_contours(binarized);
    let mut with_area: Vec<(f64, Contour<i32>)> = contours
        .into_iter()
        .map(|c| (contour_area(&c.points).abs(), c))
        .collect();
    with_area.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    with_area.into_iter().map(|(_, c)| c).collect()
}

fn touches_border(points: &[Point<i32>], w: u32, h: u32) -> bool {
    let (max_x, max_y) = (w as i32 - 1, h as i32 - 1);
    points.iter().any(|p| p.x <= 0 || p.y <= 0 || p.x >= max_x || p.y >= max_y)
}

/// 轮廓按周长的固定比例做多边形拟合，必须正好得到4个点
pub fn quad_from_contour(points: &[Point<i32>], args: &SegmentArgs) -> DetectionResult<Quadrilateral> {
    let perimeter = arc_length(points, true);
    let epsilon = args.approx_epsilon_ratio * perimeter;
    let polygon = approximate_closed_polygon(points, epsilon);
    if polygon.len() != 4 {
        return Err(DetectionError::SegmentationFailure(format!(
            "contour approximated to {} points instead of 4",
            polygon.len()
        )));
    }
    order_corners(&polygon)
        .ok_or_else(|| DetectionError::SegmentationFailure("corner ordering failed".to_string()))
}

/// 把四边形区域透视变换到固定大小的卡片图
pub fn rectify(source: &RgbImage, quad: &Quadrilateral, args: &SegmentArgs) -> DetectionResult<RgbImage> {
    let (w, h) = (args.card_width, args.card_height);
    if w == 0 || h == 0 {
        return Err(DetectionError::InvalidImage(format!("card size {w}x{h}")));
    }
    let corners = quad.corners.map(|c| Point::new(c.x, c.y));
    if contour_area(&corners).abs() < 1.0 {
        return Err(DetectionError::SegmentationFailure(format!(
            "degenerate quadrilateral {:?}",
            quad.corners
        )));
    }
    let (wf, hf) = ((w - 1) as f32, (h - 1) as f32);
    let dst = [(0.0, 0.0), (wf, 0.0), (wf, hf), (0.0, hf)];
    let projection = Projection::from_control_points(quad.as_tuples(), dst).ok_or_else(|| {
        DetectionError::SegmentationFailure(format!("degenerate quadrilateral {:?}", quad.corners))
    })?;
    let mut out = RgbImage::new(w, h);
    warp_into(source, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
    Ok(out)
}

/// 二值图上定位，原图上取像素。
/// scale 是工作图相对原图的缩放比例。
pub fn segment(
    binarized: &BinarizedImage,
    original: &RgbImage,
    scale: f32,
    strategy: &dyn CardBoundaryStrategy,
    args: &SegmentArgs,
) -> DetectionResult<RgbImage> {
    if scale <= 0.0 {
        return Err(DetectionError::InvalidImage(format!("invalid scale {scale}")));
    }
    let quad = strategy.locate(&binarized.gray, args)?;
    let quad = quad.scaled(1.0 / scale);
    log::debug!("card corners in source image: {:?}", quad.corners);
    rectify(original, &quad, args)
}
