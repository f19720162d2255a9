use std::cmp::Ordering;

use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

use crate::models::card::{CardPoint, Quadrilateral};

pub trait HasCoordinates {
    fn get_coordinates(&self) -> (f32, f32);
}

impl HasCoordinates for Point<i32> {
    fn get_coordinates(&self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

impl HasCoordinates for CardPoint {
    fn get_coordinates(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// 欧氏距离
pub fn euclidean_distance(point1: (f32, f32), point2: (f32, f32)) -> f32 {
    let dx = point2.0 - point1.0;
    let dy = point2.1 - point1.1;

    (dx.powi(2) + dy.powi(2)).sqrt()
}

/// 按 key 取最值，key 相同时用坐标字典序决定，
/// 这样结果只和点集有关，和点的排列顺序无关
fn select_by_key<T, F>(points: &[T], key: F, want_max: bool) -> CardPoint
where
    T: HasCoordinates,
    F: Fn(f32, f32) -> f32,
{
    let mut best = points[0].get_coordinates();
    for point in points.iter().skip(1) {
        let p = point.get_coordinates();
        let ord = key(p.0, p.1)
            .partial_cmp(&key(best.0, best.1))
            .unwrap_or(Ordering::Equal)
            .then_with(|| p.0.partial_cmp(&best.0).unwrap_or(Ordering::Equal))
            .then_with(|| p.1.partial_cmp(&best.1).unwrap_or(Ordering::Equal));
        let better = if want_max { ord == Ordering::Greater } else { ord == Ordering::Less };
        if better {
            best = p;
        }
    }
    CardPoint::new(best.0, best.1)
}

/// 四个点排成 [lt, rt, rd, ld]
/// 左上 x+y 最小、右下 x+y 最大、右上 y-x 最小、左下 y-x 最大
pub fn order_corners<T: HasCoordinates>(points: &[T]) -> Option<Quadrilateral> {
    if points.len() != 4 {
        return None;
    }
    let lt = select_by_key(points, |x, y| x + y, false);
    let rd = select_by_key(points, |x, y| x + y, true);
    let rt = select_by_key(points, |x, y| y - x, false);
    let ld = select_by_key(points, |x, y| y - x, true);
    Some(Quadrilateral { corners: [lt, rt, rd, ld] })
}

/// 多边形是否为凸且不自交(所有转向同号)
pub fn is_convex<T: HasCoordinates>(points: &[T]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0f64;
    for i in 0..n {
        let (x0, y0) = points[i].get_coordinates();
        let (x1, y1) = points[(i + 1) % n].get_coordinates();
        let (x2, y2) = points[(i + 2) % n].get_coordinates();
        let cross = (x1 - x0) as f64 * (y2 - y1) as f64 - (y1 - y0) as f64 * (x2 - x1) as f64;
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let origin = origin.get_coordinates();
    let mut index = 0;
    let mut dmax = -1f32;
    for (i, p) in points.iter().enumerate() {
        let d = euclidean_distance(origin, p.get_coordinates());
        if d > dmax {
            dmax = d;
            index = i;
        }
    }
    index
}

/// 闭合轮廓的多边形拟合。
/// 先找两个相距最远的点把轮廓切成两段，再分别做 Douglas-Peucker，
/// 这样拟合结果不依赖轮廓的起点。
pub fn approximate_closed_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    // approximate_polygon_dp 要求 epsilon 大于0
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.to_vec();
    }
    let a = farthest_from(contour, contour[0]);
    let b = farthest_from(contour, contour[a]);
    if a == b {
        return vec![contour[a]];
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };

    let second: Vec<Point<i32>> = contour[hi..]
        .iter()
        .chain(contour[..=lo].iter())
        .copied()
        .collect();
    let first = approximate_polygon_dp(&contour[lo..=hi], epsilon, false);
    let second = approximate_polygon_dp(&second, epsilon, false);

    // first: lo..hi，second: hi..lo，去掉second首尾的重复点
    let mut out = first;
    if second.len() > 2 {
        out.extend_from_slice(&second[1..second.len() - 1]);
    }
    out.dedup();
    out
}

/// 中位数，偶数个时取中间两个的均值
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::geometry::arc_length;

    fn rect_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in x0..x1 { pts.push(Point::new(x, y0)); }
        for y in y0..y1 { pts.push(Point::new(x1, y)); }
        for x in (x0 + 1..=x1).rev() { pts.push(Point::new(x, y1)); }
        for y in (y0 + 1..=y1).rev() { pts.push(Point::new(x0, y)); }
        pts
    }

    #[test]
    fn test_order_corners_permutation_invariant() {
        let pts = [
            CardPoint::new(120.0, 40.0),
            CardPoint::new(410.0, 75.0),
            CardPoint::new(380.0, 520.0),
            CardPoint::new(95.0, 490.0),
        ];
        let expected = order_corners(&pts).unwrap();
        assert_eq!(expected.lt(), pts[0]);
        assert_eq!(expected.rt(), pts[1]);
        assert_eq!(expected.rd(), pts[2]);
        assert_eq!(expected.ld(), pts[3]);
        for shift in 0..4 {
            let mut rotated = pts;
            rotated.rotate_left(shift);
            assert_eq!(order_corners(&rotated).unwrap(), expected);
            rotated.reverse();
            assert_eq!(order_corners(&rotated).unwrap(), expected);
        }
        assert!(order_corners(&pts[..3]).is_none());
    }

    #[test]
    fn test_order_corners_tie_is_deterministic() {
        // 菱形，左上有两个点的 x+y 相等
        let pts = [
            CardPoint::new(50.0, 0.0),
            CardPoint::new(100.0, 50.0),
            CardPoint::new(50.0, 100.0),
            CardPoint::new(0.0, 50.0),
        ];
        let expected = order_corners(&pts).unwrap();
        for shift in 1..4 {
            let mut rotated = pts;
            rotated.rotate_left(shift);
            assert_eq!(order_corners(&rotated).unwrap(), expected);
        }
    }

    #[test]
    fn test_convexity() {
        let square = [
            CardPoint::new(0.0, 0.0),
            CardPoint::new(10.0, 0.0),
            CardPoint::new(10.0, 10.0),
            CardPoint::new(0.0, 10.0),
        ];
        assert!(is_convex(&square));
        let bowtie = [square[0], square[2], square[1], square[3]];
        assert!(!is_convex(&bowtie));
        let flat = [square[0], square[1], CardPoint::new(20.0, 0.0)];
        assert!(!is_convex(&flat));
    }

    #[test]
    fn test_approximate_rectangle_contour() {
        let contour = rect_contour(10, 20, 210, 320);
        let eps = 0.01 * arc_length(&contour, true);
        let poly = approximate_closed_polygon(&contour, eps);
        assert_eq!(poly.len(), 4);
        // 换一个起点结果不变
        let mut shifted = contour.clone();
        shifted.rotate_left(137);
        let again = order_corners(&approximate_closed_polygon(&shifted, eps)).unwrap();
        let quad = order_corners(&poly).unwrap();
        assert_eq!(quad.lt(), CardPoint::new(10.0, 20.0));
        assert_eq!(quad.rt(), CardPoint::new(210.0, 20.0));
        assert_eq!(quad.rd(), CardPoint::new(210.0, 320.0));
        assert_eq!(quad.ld(), CardPoint::new(10.0, 320.0));
        assert_eq!(again, quad);
    }

    #[test]
    fn test_zero_epsilon_keeps_contour() {
        let contour = rect_contour(0, 0, 5, 5);
        assert_eq!(approximate_closed_polygon(&contour, 0.0), contour);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
