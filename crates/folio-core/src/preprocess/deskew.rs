//! Skew estimation and correction.
//!
//! The skew of a page is read off the minimum-area rectangle enclosing its
//! foreground (non-zero) pixels. Pixels are taken as `(row, column)` pairs,
//! so the rectangle angle is measured in that frame and mapped to a
//! correction in `(-45, 45]` degrees, positive meaning counter-clockwise.

use image::{GrayImage, Luma};

/// Corrections smaller than this are treated as no skew at all.
const SKEW_EPSILON: f64 = 1e-6;

/// Bicubic kernel sharpness.
const CUBIC_A: f64 = -0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Rectangle of minimum area around a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: Point,
    /// Extent along the edge direction.
    pub width: f64,
    /// Extent along the edge normal.
    pub height: f64,
    /// Direction of the supporting edge, degrees in `(-180, 180]`.
    pub angle_degrees: f64,
}

impl RotatedRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Foreground pixels as `(row, column)` points.
///
/// Only the leftmost and rightmost pixel of each row are returned; interior
/// pixels never lie on the convex hull.
pub fn foreground_points(mask: &GrayImage) -> Vec<Point> {
    let w = mask.width() as usize;
    let mut points = Vec::new();
    if w == 0 {
        return points;
    }
    for (row, line) in mask.as_raw().chunks_exact(w).enumerate() {
        let first = line.iter().position(|&v| v != 0);
        let last = line.iter().rposition(|&v| v != 0);
        if let (Some(first), Some(last)) = (first, last) {
            points.push(Point::new(row as f64, first as f64));
            if last != first {
                points.push(Point::new(row as f64, last as f64));
            }
        }
    }
    points
}

/// Convex hull in counter-clockwise order, collinear points dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Minimum-area enclosing rectangle, or `None` for fewer than two distinct
/// points.
///
/// One side of the optimal rectangle is always collinear with a hull edge,
/// so each edge is tried in turn.
pub fn min_area_rect(points: &[Point]) -> Option<RotatedRect> {
    let hull = convex_hull(points);
    if hull.len() < 2 {
        return None;
    }

    let mut best: Option<RotatedRect> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let edge = b.sub(a);
        let len = edge.dot(edge).sqrt();
        if len == 0.0 {
            continue;
        }
        let u = Point::new(edge.x / len, edge.y / len);
        let n = Point::new(-u.y, u.x);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_n, mut max_n) = (f64::INFINITY, f64::NEG_INFINITY);
        for &p in &hull {
            let rel = p.sub(a);
            let pu = rel.dot(u);
            let pn = rel.dot(n);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_n = min_n.min(pn);
            max_n = max_n.max(pn);
        }

        let width = max_u - min_u;
        let height = max_n - min_n;
        let mid_u = (min_u + max_u) / 2.0;
        let mid_n = (min_n + max_n) / 2.0;
        let rect = RotatedRect {
            center: Point::new(
                a.x + u.x * mid_u + n.x * mid_n,
                a.y + u.y * mid_u + n.y * mid_n,
            ),
            width,
            height,
            angle_degrees: u.y.atan2(u.x).to_degrees(),
        };
        if best.map_or(true, |b| rect.area() < b.area()) {
            best = Some(rect);
        }
    }
    best
}

/// Rotation in degrees (counter-clockwise positive) that straightens the
/// foreground of `mask`. Returns `0.0` for an empty mask.
pub fn skew_angle(mask: &GrayImage) -> f64 {
    let points = foreground_points(mask);
    let Some(rect) = min_area_rect(&points) else {
        return 0.0;
    };
    correction_from_rect_angle(rect.angle_degrees)
}

/// Map a rectangle edge angle to a correction in `(-45, 45]`.
fn correction_from_rect_angle(angle_degrees: f64) -> f64 {
    // Fold into [-90, 0): every rectangle has an edge there.
    let a = angle_degrees.rem_euclid(90.0) - 90.0;
    let theta = if a < -45.0 { -(90.0 + a) } else { -a };
    if theta.abs() < SKEW_EPSILON {
        0.0
    } else {
        theta
    }
}

/// Rotate `page` about its centre by `degrees` counter-clockwise.
///
/// Output keeps the input size. Bicubic sampling; out-of-range samples
/// take the nearest edge pixel. A zero angle returns the page unchanged.
pub fn rotate(page: &GrayImage, degrees: f64) -> GrayImage {
    if degrees == 0.0 || page.width() == 0 || page.height() == 0 {
        return page.clone();
    }
    let (w, h) = page.dimensions();
    let cx = f64::from(w / 2);
    let cy = f64::from(h / 2);
    let (sin, cos) = degrees.to_radians().sin_cos();

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let dy = f64::from(y) - cy;
        for x in 0..w {
            let dx = f64::from(x) - cx;
            let sx = cos * dx - sin * dy + cx;
            let sy = sin * dx + cos * dy + cy;
            out.put_pixel(x, y, Luma([sample_bicubic(page, sx, sy)]));
        }
    }
    out
}

fn cubic_weights(t: f64) -> [f64; 4] {
    let a = CUBIC_A;
    let w0 = ((a * (t + 1.0) - 5.0 * a) * (t + 1.0) + 8.0 * a) * (t + 1.0) - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let s = 1.0 - t;
    let w2 = ((a + 2.0) * s - (a + 3.0)) * s * s + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

fn sample_bicubic(page: &GrayImage, sx: f64, sy: f64) -> u8 {
    let (w, h) = (page.width() as i64, page.height() as i64);
    let x0 = sx.floor();
    let y0 = sy.floor();
    let wx = cubic_weights(sx - x0);
    let wy = cubic_weights(sy - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);
    let src = page.as_raw();

    let mut acc = 0.0;
    for (j, wyj) in wy.iter().enumerate() {
        let py = (y0 - 1 + j as i64).clamp(0, h - 1) as usize;
        let row = &src[py * w as usize..(py + 1) * w as usize];
        let mut row_acc = 0.0;
        for (i, wxi) in wx.iter().enumerate() {
            let px = (x0 - 1 + i as i64).clamp(0, w - 1) as usize;
            row_acc += wxi * f64::from(row[px]);
        }
        acc += wyj * row_acc;
    }
    acc.round().clamp(0.0, 255.0) as u8
}
