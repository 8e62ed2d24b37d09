//! 分割结果的可视化辅助: 叠加与轮廓.

use crate::error::PrepError;
use crate::PrepResult;
use image::{Rgb, RgbImage};
use itertools::izip;
use ndarray::{Array2, ArrayView2, Axis, Zip};

/// 把分割投影叠加到图像上: `seg` 非 0 的像素染成纯红, 其余像素不变.
///
/// `seg` 的形状必须为 `(img.height(), img.width())`.
pub fn overlay(img: &RgbImage, seg: ArrayView2<f64>) -> PrepResult<RgbImage> {
    let (h, w) = (img.height() as usize, img.width() as usize);
    if seg.dim() != (h, w) {
        let (sh, sw) = seg.dim();
        return Err(PrepError::shape((h, w, 3), (sh, sw, 3)));
    }
    let mut out = img.clone();
    for ((r, c), &s) in seg.indexed_iter() {
        if s != 0.0 {
            out.put_pixel(c as u32, r as u32, Rgb([255, 0, 0]));
        }
    }
    Ok(out)
}

/// 沿 `axis` 的数值梯度. 内部为中心差分, 两端为单侧差分; 长度不足 2 时为 0.
fn gradient(a: ArrayView2<f64>, axis: Axis) -> Array2<f64> {
    let n = a.len_of(axis);
    let mut g = Array2::zeros(a.dim());
    if n < 2 {
        return g;
    }
    for (mut out, lane) in izip!(g.lanes_mut(axis), a.lanes(axis)) {
        out[0] = lane[1] - lane[0];
        out[n - 1] = lane[n - 1] - lane[n - 2];
        for i in 1..n - 1 {
            out[i] = (lane[i + 1] - lane[i - 1]) / 2.0;
        }
    }
    g
}

/// 基于梯度幅值的轮廓提取: 梯度不为 0 的像素为 255, 其余为 0.
pub fn contours(img: ArrayView2<f64>) -> Array2<u8> {
    let gx = gradient(img, Axis(0));
    let gy = gradient(img, Axis(1));
    Zip::from(&gx)
        .and(&gy)
        .map_collect(|&x, &y| if x * x + y * y != 0.0 { 255 } else { 0 })
}
