#![allow(dead_code)]

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const BACKGROUND: u8 = 128;

/// Cluttered planar target: overlapping rectangles and discs
pub fn synthetic_model(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::from_pixel(width, height, Luma([60]));

    for _ in 0..90 {
        let x = rng.gen_range(-20..width as i32);
        let y = rng.gen_range(-20..height as i32);
        let w = rng.gen_range(8..56);
        let h = rng.gen_range(8..56);
        let v = rng.gen_range(0..=255u8);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Luma([v]));
    }
    for _ in 0..25 {
        let cx = rng.gen_range(0..width as i32);
        let cy = rng.gen_range(0..height as i32);
        let r = rng.gen_range(4..18);
        let v = rng.gen_range(0..=255u8);
        draw_filled_circle_mut(&mut img, (cx, cy), r, Luma([v]));
    }
    img
}

/// Independent uniform noise per pixel
pub fn noise_frame(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]))
}

/// Rotate 90° clockwise: model `(x, y)` lands on `(h - 1 - y, x)`
pub fn rotate_cw(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(h, w, |u, v| *img.get_pixel(v, h - 1 - u))
}

/// Halve both dimensions with 2×2 box averaging
pub fn halve(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width() / 2, img.height() / 2);
    GrayImage::from_fn(w, h, |x, y| {
        let sum: u32 = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(dx, dy)| img.get_pixel(2 * x + dx, 2 * y + dy)[0] as u32)
            .sum();
        Luma([((sum + 2) / 4) as u8])
    })
}

/// Paste `img` onto a flat canvas with its top-left at `(ox, oy)`
pub fn paste(img: &GrayImage, width: u32, height: u32, ox: u32, oy: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    for (x, y, p) in img.enumerate_pixels() {
        if x + ox < width && y + oy < height {
            canvas.put_pixel(x + ox, y + oy, *p);
        }
    }
    canvas
}

fn bilinear(img: &GrayImage, x: f64, y: f64) -> Option<f64> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f64 || y > (h - 1) as f64 {
        return None;
    }
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (dx, dy) = (x - x0 as f64, y - y0 as f64);
    let p = |x, y| img.get_pixel(x, y)[0] as f64;
    let top = p(x0, y0) * (1.0 - dx) + p(x1, y0) * dx;
    let bottom = p(x0, y1) * (1.0 - dx) + p(x1, y1) * dx;
    Some(top * (1.0 - dy) + bottom * dy)
}

/// Render `model` into a `width` × `height` frame through `h` (model → frame)
pub fn warp(model: &GrayImage, h: &Matrix3<f64>, width: u32, height: u32) -> GrayImage {
    let inv = h.try_inverse().expect("invertible test homography");
    GrayImage::from_fn(width, height, |u, v| {
        let q = inv * Vector3::new(u as f64, v as f64, 1.0);
        let value = bilinear(model, q[0] / q[2], q[1] / q[2]).unwrap_or(BACKGROUND as f64);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

pub fn apply(h: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    let q = h * Vector3::new(p[0], p[1], 1.0);
    [q[0] / q[2], q[1] / q[2]]
}

pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}
