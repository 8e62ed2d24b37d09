//! 强度投影: 将三维体数据沿某一轴归约为二维图像.
//!
//! 处理顺序固定为: 截断 -> 归约 -> 除以最大值 -> (翻转) -> 逆时针旋转 90 度
//! -> (矢状面水平镜像) -> (最小-最大重缩放).

use crate::data::{ClipWindow, ProjectionImage};
use crate::PrepResult;
use ndarray::{ArrayView1, ArrayView3, Axis};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 投影视图方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewAxis {
    /// 冠状面, 沿第 1 维 (前后方向) 归约.
    Coronal,

    /// 矢状面, 沿第 0 维 (左右方向) 归约. 结果额外水平镜像.
    Sagittal,
}

impl ViewAxis {
    /// 归约所沿的数组轴.
    #[inline]
    pub const fn axis(&self) -> Axis {
        match self {
            ViewAxis::Coronal => Axis(1),
            ViewAxis::Sagittal => Axis(0),
        }
    }

    /// 输出目录名.
    pub const fn dir_name(&self) -> &'static str {
        match self {
            ViewAxis::Coronal => "coronal",
            ViewAxis::Sagittal => "saggital",
        }
    }
}

impl fmt::Display for ViewAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 归约统计量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Statistic {
    /// 最大值 (MIP).
    Maximum,

    /// 平均值.
    Mean,

    /// 总体标准差.
    Std,

    /// 求和 (SIP).
    Sum,
}

impl Statistic {
    /// 对一条 lane 计算统计量. 若给出 `clip`, 先截断每个体素.
    fn reduce(&self, lane: ArrayView1<f32>, clip: Option<ClipWindow>) -> f64 {
        let values = lane.iter().map(|&v| match clip {
            Some(w) => w.clamp(v) as f64,
            None => v as f64,
        });
        let n = lane.len() as f64;
        match self {
            Statistic::Maximum => values.fold(f64::NEG_INFINITY, f64::max),
            Statistic::Sum => values.sum(),
            Statistic::Mean => values.sum::<f64>() / n,
            Statistic::Std => {
                let mean = values.clone().sum::<f64>() / n;
                (values.map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
        }
    }
}

/// 单个通道的投影策略.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProjectionSpec {
    /// 归约统计量.
    pub statistic: Statistic,

    /// 归约前的强度截断窗口.
    pub clip: Option<ClipWindow>,

    /// 是否以最大值为轴翻转 (负片约定).
    pub invert: bool,

    /// 是否在最后做最小-最大重缩放.
    pub rescale: bool,
}

impl ProjectionSpec {
    /// PET 通道: 最大值投影, SUV 截断, 负片.
    #[inline]
    pub const fn suv(window: ClipWindow) -> Self {
        Self {
            statistic: Statistic::Maximum,
            clip: Some(window),
            invert: true,
            rescale: false,
        }
    }

    /// CT 通道: 求和投影, 可选截断, 负片.
    #[inline]
    pub const fn ct_sum(window: Option<ClipWindow>) -> Self {
        Self {
            statistic: Statistic::Sum,
            clip: window,
            invert: true,
            rescale: false,
        }
    }

    /// 仅归约和规范化, 不截断, 不翻转.
    #[inline]
    pub const fn plain(statistic: Statistic) -> Self {
        Self {
            statistic,
            clip: None,
            invert: false,
            rescale: false,
        }
    }

    /// 打开最小-最大重缩放.
    #[inline]
    pub const fn rescaled(mut self) -> Self {
        self.rescale = true;
        self
    }

    /// 设置是否翻转.
    #[inline]
    pub const fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }
}

/// 将 `volume` 沿 `view` 方向按 `spec` 投影.
///
/// 归约结果的最大值不是正有限数时返回 [`crate::PrepError::DegenerateProjection`].
pub fn project(
    volume: ArrayView3<f32>,
    view: ViewAxis,
    spec: &ProjectionSpec,
) -> PrepResult<ProjectionImage> {
    let reduced = volume.map_axis(view.axis(), |lane| spec.statistic.reduce(lane, spec.clip));
    let mut img = ProjectionImage::new(reduced).normalized()?;
    if spec.invert {
        img = img.inverted();
    }
    let img = orient(img, view);
    if spec.rescale {
        img.rescaled()
    } else {
        Ok(img)
    }
}

/// 分割掩码的投影: 最大值归约, 不截断, 不规范化, 不翻转, 仅调整方向.
pub fn project_mask(volume: ArrayView3<f32>, view: ViewAxis) -> ProjectionImage {
    let reduced = volume.map_axis(view.axis(), |lane| {
        Statistic::Maximum.reduce(lane, None)
    });
    orient(ProjectionImage::new(reduced), view)
}

/// 固定显示约定: 逆时针旋转 90 度, 矢状面再水平镜像.
fn orient(img: ProjectionImage, view: ViewAxis) -> ProjectionImage {
    let img = img.rot90_ccw();
    match view {
        ViewAxis::Coronal => img,
        ViewAxis::Sagittal => img.flipped_horizontal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrepError;
    use ndarray::{array, Array3};

    /// `v[x, y, z] = x + 10 y + 100 z + 1`.
    fn ramp() -> Array3<f32> {
        Array3::from_shape_fn((3, 4, 5), |(x, y, z)| (x + 10 * y + 100 * z + 1) as f32)
    }

    #[test]
    fn test_coronal_orientation() {
        let v = ramp();
        let spec = ProjectionSpec::plain(Statistic::Maximum);
        let img = project(v.view(), ViewAxis::Coronal, &spec).unwrap();
        // 归约后为 (x, z), 旋转后为 (z 倒序, x).
        assert_eq!(img.shape(), (5, 3));
        let max = 2.0 + 30.0 + 400.0 + 1.0;
        // 左上角: z 最大, x = 0, y 取最大.
        assert_eq!(img.array_view()[(0, 0)], (30.0 + 400.0 + 1.0) / max);
        assert_eq!(img.array_view()[(0, 2)], 1.0);
        assert_eq!(img.array_view()[(4, 0)], 31.0 / max);
    }

    #[test]
    fn test_sagittal_orientation() {
        let v = ramp();
        let spec = ProjectionSpec::plain(Statistic::Maximum);
        let img = project(v.view(), ViewAxis::Sagittal, &spec).unwrap();
        // 归约后为 (y, z), 旋转后为 (z 倒序, y), 镜像后列为 y 倒序.
        assert_eq!(img.shape(), (5, 4));
        let max = 433.0;
        assert_eq!(img.array_view()[(0, 0)], 1.0);
        assert_eq!(img.array_view()[(0, 3)], (2.0 + 400.0 + 1.0) / max);
        assert_eq!(img.array_view()[(4, 3)], 3.0 / max);
    }

    #[test]
    fn test_statistics() {
        let lane = array![1.0f32, 2.0, 3.0, 6.0];
        assert_eq!(Statistic::Maximum.reduce(lane.view(), None), 6.0);
        assert_eq!(Statistic::Sum.reduce(lane.view(), None), 12.0);
        assert_eq!(Statistic::Mean.reduce(lane.view(), None), 3.0);
        assert!((Statistic::Std.reduce(lane.view(), None) - 3.5f64.sqrt()).abs() < 1e-12);

        let w = ClipWindow::new(0.0, 2.5).unwrap();
        assert_eq!(Statistic::Maximum.reduce(lane.view(), Some(w)), 2.5);
        assert_eq!(Statistic::Sum.reduce(lane.view(), Some(w)), 8.0);
    }

    #[test]
    fn test_normalized_max_is_one() {
        let v = ramp();
        for stat in [Statistic::Maximum, Statistic::Mean, Statistic::Std, Statistic::Sum] {
            for view in [ViewAxis::Coronal, ViewAxis::Sagittal] {
                let img = project(v.view(), view, &ProjectionSpec::plain(stat)).unwrap();
                assert!((img.max().unwrap() - 1.0).abs() < 1e-12, "{stat:?} {view}");
            }
        }
    }

    #[test]
    fn test_invert_and_clip() {
        let v = Array3::from_shape_fn((2, 2, 2), |(x, _, _)| if x == 0 { 1.0 } else { 20.0 });
        let spec = ProjectionSpec::suv(ClipWindow::suv_visual());
        let img = project(v.view(), ViewAxis::Coronal, &spec).unwrap();
        // 截断后为 1 与 14, 规范化为 1/14 与 1, 翻转后为 13/14 与 0.
        assert_eq!(img.shape(), (2, 2));
        for row in img.array_view().rows() {
            assert!((row[0] - 13.0 / 14.0).abs() < 1e-12);
            assert_eq!(row[1], 0.0);
        }
    }

    #[test]
    fn test_rescale_after_invert() {
        let v = ramp();
        let img = project(
            v.view(),
            ViewAxis::Coronal,
            &ProjectionSpec::ct_sum(None).rescaled(),
        )
        .unwrap();
        assert_eq!(img.min(), Some(0.0));
        assert_eq!(img.max(), Some(1.0));
    }

    #[test]
    fn test_degenerate_input() {
        let zeros = Array3::<f32>::zeros((3, 3, 3));
        let spec = ProjectionSpec::suv(ClipWindow::suv_visual());
        assert!(matches!(
            project(zeros.view(), ViewAxis::Coronal, &spec),
            Err(PrepError::DegenerateProjection { .. })
        ));
        let negative = Array3::<f32>::from_elem((3, 3, 3), -5.0);
        let spec = ProjectionSpec::ct_sum(None);
        assert!(project(negative.view(), ViewAxis::Sagittal, &spec).is_err());
    }

    #[test]
    fn test_mask_projection_not_normalized() {
        let mut seg = Array3::<f32>::zeros((4, 4, 4));
        seg[(1, 2, 3)] = 1.0;
        let img = project_mask(seg.view(), ViewAxis::Coronal);
        assert_eq!(img.shape(), (4, 4));
        assert_eq!(img.max(), Some(1.0));
        // z = 3 -> 第 0 行, x = 1 -> 第 1 列.
        assert_eq!(img.array_view()[(0, 1)], 1.0);
        assert_eq!(img.array_view().sum(), 1.0);

        let empty = project_mask(Array3::<f32>::zeros((2, 2, 2)).view(), ViewAxis::Sagittal);
        assert_eq!(empty.max(), Some(0.0));
    }
}
