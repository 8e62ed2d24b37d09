//! 体数据在 (第 0 维, 第 1 维) 平面内的旋转.
//!
//! 第 2 维 (头脚方向) 不受影响. 输出平面尺寸会扩大以容纳旋转后的全部内容,
//! 旋转时不做裁剪. 采样使用双线性插值, 超出原数据范围的位置填 0.

use crate::data::Volume;
use ndarray::{s, Array3, ArrayView3, Zip};

/// 整数倍 90 度时返回精确的 `(cos, sin)`, 避免在边界上产生舍入误差.
fn cos_sin_deg(angle: f64) -> (f64, f64) {
    let a = angle.rem_euclid(360.0);
    match a {
        a if a == 0.0 => (1.0, 0.0),
        a if a == 90.0 => (0.0, 1.0),
        a if a == 180.0 => (-1.0, 0.0),
        a if a == 270.0 => (0.0, -1.0),
        a => {
            let r = a.to_radians();
            (r.cos(), r.sin())
        }
    }
}

/// 平面内的仿射采样参数.
///
/// 输出位置 `(p, q)` 对应输入的连续坐标
/// `(c p + s q + off0, -s p + c q + off1)`.
#[derive(Copy, Clone, Debug)]
struct PlaneTransform {
    cos: f64,
    sin: f64,
    offset: (f64, f64),
    out_shape: (usize, usize),
}

impl PlaneTransform {
    fn new(angle: f64, (n0, n1): (usize, usize)) -> Self {
        let (c, s) = cos_sin_deg(angle);
        let (f0, f1) = (n0 as f64, n1 as f64);

        // 四个角点旋转后的包围盒.
        let corners = [(0.0, 0.0), (0.0, f1), (f0, 0.0), (f0, f1)];
        let (mut lo0, mut hi0, mut lo1, mut hi1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for (a, b) in corners {
            let (r0, r1) = (c * a + s * b, -s * a + c * b);
            lo0 = lo0.min(r0);
            hi0 = hi0.max(r0);
            lo1 = lo1.min(r1);
            hi1 = hi1.max(r1);
        }
        let out_shape = ((hi0 - lo0 + 0.5) as usize, (hi1 - lo1 + 0.5) as usize);

        let out_center = (
            (out_shape.0 as f64 - 1.0) / 2.0,
            (out_shape.1 as f64 - 1.0) / 2.0,
        );
        let in_center = ((f0 - 1.0) / 2.0, (f1 - 1.0) / 2.0);
        let offset = (
            in_center.0 - (c * out_center.0 + s * out_center.1),
            in_center.1 - (-s * out_center.0 + c * out_center.1),
        );

        Self {
            cos: c,
            sin: s,
            offset,
            out_shape,
        }
    }

    #[inline]
    fn source(&self, p: usize, q: usize) -> (f64, f64) {
        let (p, q) = (p as f64, q as f64);
        (
            self.cos * p + self.sin * q + self.offset.0,
            -self.sin * p + self.cos * q + self.offset.1,
        )
    }
}

/// 双线性插值的四个邻点与权重.
#[derive(Copy, Clone, Debug)]
struct Bilinear {
    i0: usize,
    i1: usize,
    j0: usize,
    j1: usize,
    wi: f32,
    wj: f32,
}

impl Bilinear {
    const EPS: f64 = 1e-6;

    /// 连续坐标落在 `[0, n - 1]` 之外时返回 `None`.
    fn new((u, v): (f64, f64), (n0, n1): (usize, usize)) -> Option<Self> {
        let (m0, m1) = ((n0 - 1) as f64, (n1 - 1) as f64);
        if u < -Self::EPS || u > m0 + Self::EPS || v < -Self::EPS || v > m1 + Self::EPS {
            return None;
        }
        let (u, v) = (u.clamp(0.0, m0), v.clamp(0.0, m1));
        let (i0, j0) = (u.floor() as usize, v.floor() as usize);
        Some(Self {
            i0,
            i1: (i0 + 1).min(n0 - 1),
            j0,
            j1: (j0 + 1).min(n1 - 1),
            wi: (u - i0 as f64) as f32,
            wj: (v - j0 as f64) as f32,
        })
    }
}

/// 在 (第 0 维, 第 1 维) 平面内将数组旋转 `angle` 度, 输出尺寸足以容纳全部内容.
pub fn rotate_plane(volume: ArrayView3<f32>, angle: f64) -> Array3<f32> {
    let (n0, n1, nz) = volume.dim();
    if n0 == 0 || n1 == 0 || nz == 0 {
        return volume.to_owned();
    }
    let tf = PlaneTransform::new(angle, (n0, n1));
    let (o0, o1) = tf.out_shape;
    let mut out = Array3::<f32>::zeros((o0, o1, nz));

    for p in 0..o0 {
        for q in 0..o1 {
            let Some(b) = Bilinear::new(tf.source(p, q), (n0, n1)) else {
                continue;
            };
            let (wi, wj) = (b.wi, b.wj);
            Zip::from(out.slice_mut(s![p, q, ..]))
                .and(volume.slice(s![b.i0, b.j0, ..]))
                .and(volume.slice(s![b.i0, b.j1, ..]))
                .and(volume.slice(s![b.i1, b.j0, ..]))
                .and(volume.slice(s![b.i1, b.j1, ..]))
                .for_each(|o, &v00, &v01, &v10, &v11| {
                    let top = v00 * (1.0 - wj) + v01 * wj;
                    let bottom = v10 * (1.0 - wj) + v11 * wj;
                    *o = top * (1.0 - wi) + bottom * wi;
                });
        }
    }
    out
}

/// 旋转体数据. 旋转后的形状与原数据不同, 因此结果不携带几何信息.
#[inline]
pub fn rotate_volume(volume: &Volume, angle: f64) -> Volume {
    Volume::from_array(rotate_plane(volume.data(), angle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: (usize, usize, usize)) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(x, y, z)| (x * 100 + y * 10 + z) as f32)
    }

    #[test]
    fn test_zero_angle_is_identity() {
        let v = ramp((4, 6, 3));
        assert_eq!(rotate_plane(v.view(), 0.0), v);
        assert_eq!(rotate_plane(v.view(), 360.0), v);
    }

    #[test]
    fn test_quarter_turn_swaps_extents() {
        let v = ramp((4, 6, 3));
        let r = rotate_plane(v.view(), 90.0);
        assert_eq!(r.dim(), (6, 4, 3));
        // 输入坐标为 (q, 5 - p).
        for ((p, q, z), &val) in r.indexed_iter() {
            assert_eq!(val, v[(q, 5 - p, z)]);
        }

        let r = rotate_plane(v.view(), -90.0);
        assert_eq!(r.dim(), (6, 4, 3));
        for ((p, q, z), &val) in r.indexed_iter() {
            assert_eq!(val, v[(3 - q, p, z)]);
        }
    }

    #[test]
    fn test_half_turn() {
        let v = ramp((3, 5, 2));
        let r = rotate_plane(v.view(), 180.0);
        assert_eq!(r.dim(), (3, 5, 2));
        for ((p, q, z), &val) in r.indexed_iter() {
            assert_eq!(val, v[(2 - p, 4 - q, z)]);
        }
    }

    #[test]
    fn test_oblique_grows_bounds_and_keeps_range() {
        let v = Array3::<f32>::from_elem((10, 10, 2), 3.0);
        let r = rotate_plane(v.view(), 45.0);
        // 10 * sqrt(2) + 0.5 -> 14.
        assert_eq!(r.dim(), (14, 14, 2));
        assert!(r.iter().all(|&x| (0.0..=3.0 + 1e-5).contains(&x)));
        // 中心仍在原数据内部.
        assert!((r[(7, 7, 0)] - 3.0).abs() < 1e-5);
        // 角落在原数据外部.
        assert_eq!(r[(0, 0, 1)], 0.0);
    }

    #[test]
    fn test_small_angle_keeps_through_axis() {
        let v = ramp((5, 5, 5));
        let r = rotate_plane(v.view(), 1.0);
        assert_eq!(r.dim(), (5, 5, 5));
        // 中心体素不动, 每个 z 层独立.
        for z in 0..5 {
            assert!((r[(2, 2, z)] - v[(2, 2, z)]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_rotate_volume() {
        let v = Volume::from_array(ramp((4, 6, 3)));
        let r = rotate_volume(&v, 90.0);
        assert_eq!(r.shape(), (6, 4, 3));
        assert!(r.geometry().is_none());
        assert_eq!(r.max(), v.max());
    }
}
