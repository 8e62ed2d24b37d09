//! 基于 CT HU 阈值的组织分割.
//!
//! 从 CT 体数据生成骨骼, 瘦组织, 脂肪组织, 空气四个二值掩码.
//! 各阈值区间独立定义, 因此掩码之间可能重叠, 也不保证覆盖所有体素.

use crate::consts::hu;
use crate::data::Volume;
use crate::error::PrepError;
use crate::{Idx3d, PrepResult};
use ndarray::{Array3, ArrayView3};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 组织类别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tissue {
    /// 骨骼.
    Bone,

    /// 瘦组织.
    Lean,

    /// 脂肪组织.
    Adipose,

    /// 空气.
    Air,
}

impl Tissue {
    /// 全部组织类别, 按惯用顺序排列.
    pub const ALL: [Tissue; 4] = [Tissue::Bone, Tissue::Lean, Tissue::Adipose, Tissue::Air];

    /// 简短名字, 用于通道命名.
    pub const fn name(&self) -> &'static str {
        match self {
            Tissue::Bone => "bone",
            Tissue::Lean => "lean",
            Tissue::Adipose => "adipose",
            Tissue::Air => "air",
        }
    }

    /// 保存通道体数据时使用的文件名后缀.
    pub const fn file_suffix(&self) -> &'static str {
        match self {
            Tissue::Bone => "bone",
            Tissue::Lean => "lean_tissue",
            Tissue::Adipose => "adipose_tissue",
            Tissue::Air => "air",
        }
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HU 闭区间 `[low, high]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HuRange {
    /// 下限.
    pub low: f32,

    /// 上限. 骨骼和空气不使用该值.
    pub high: f32,
}

impl HuRange {
    /// 构建区间. 必须有 `low <= high` 且均为有限数, 否则返回 `None`.
    pub fn new(low: f32, high: f32) -> Option<Self> {
        (low.is_finite() && high.is_finite() && low <= high).then_some(Self { low, high })
    }

    /// `low <= v <= high`.
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        self.low <= v && v <= self.high
    }
}

/// 四类组织的 HU 阈值.
///
/// - 骨骼: `v > bone.low`;
/// - 瘦组织: `lean.low <= v <= lean.high`;
/// - 脂肪: `adipose.low <= v <= adipose.high`;
/// - 空气: `v < air.low`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HuThresholds {
    /// 骨骼阈值, 仅使用 `low`.
    pub bone: HuRange,

    /// 瘦组织阈值.
    pub lean: HuRange,

    /// 脂肪组织阈值.
    pub adipose: HuRange,

    /// 空气阈值, 仅使用 `low`.
    pub air: HuRange,
}

impl Default for HuThresholds {
    fn default() -> Self {
        Self {
            bone: HuRange {
                low: hu::BONE_LOW,
                high: f32::MAX,
            },
            lean: HuRange {
                low: hu::LEAN_LOW,
                high: hu::LEAN_HIGH,
            },
            adipose: HuRange {
                low: hu::ADIPOSE_LOW,
                high: hu::ADIPOSE_HIGH,
            },
            air: HuRange {
                low: hu::AIR_LOW,
                high: hu::AIR_LOW,
            },
        }
    }
}

impl HuThresholds {
    /// 检查各阈值是否合法.
    pub fn validate(&self) -> PrepResult<()> {
        for (tissue, r) in [
            (Tissue::Bone, &self.bone),
            (Tissue::Lean, &self.lean),
            (Tissue::Adipose, &self.adipose),
            (Tissue::Air, &self.air),
        ] {
            if HuRange::new(r.low, r.high).is_none() {
                return Err(PrepError::InvalidConfig(format!(
                    "{tissue} HU range [{}, {}] is invalid",
                    r.low, r.high
                )));
            }
        }
        Ok(())
    }

    /// 判断 HU 值 `v` 是否属于组织 `tissue`.
    #[inline]
    pub fn accepts(&self, tissue: Tissue, v: f32) -> bool {
        match tissue {
            Tissue::Bone => v > self.bone.low,
            Tissue::Lean => self.lean.contains(v),
            Tissue::Adipose => self.adipose.contains(v),
            Tissue::Air => v < self.air.low,
        }
    }
}

/// 三维二值掩码, 值只可能为 0 或 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TissueMask {
    data: Array3<u8>,
}

impl TissueMask {
    /// 以谓词 `pred` 从体数据生成掩码.
    pub fn from_predicate<F: Fn(f32) -> bool>(volume: ArrayView3<f32>, pred: F) -> Self {
        Self {
            data: volume.mapv(|v| u8::from(pred(v))),
        }
    }

    /// 从标签体数据生成掩码: 非零体素为 1.
    #[inline]
    pub fn from_labels(labels: &Volume) -> Self {
        Self::from_predicate(labels.data(), |v| v != 0.0)
    }

    /// 获取数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 掩码为 1 的体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&m| m != 0).count()
    }

    /// 是否为全 0 掩码.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&m| m == 0)
    }
}

/// 四类组织的一组数据.
#[derive(Debug, Clone)]
pub struct PerTissue<T> {
    /// 骨骼.
    pub bone: T,

    /// 瘦组织.
    pub lean: T,

    /// 脂肪组织.
    pub adipose: T,

    /// 空气.
    pub air: T,
}

impl<T> PerTissue<T> {
    /// 以 `f` 逐类构建.
    pub fn from_fn<F: FnMut(Tissue) -> T>(mut f: F) -> Self {
        Self {
            bone: f(Tissue::Bone),
            lean: f(Tissue::Lean),
            adipose: f(Tissue::Adipose),
            air: f(Tissue::Air),
        }
    }

    /// 以 `f` 逐类构建, 遇到第一个错误即返回.
    pub fn try_from_fn<E, F: FnMut(Tissue) -> Result<T, E>>(mut f: F) -> Result<Self, E> {
        Ok(Self {
            bone: f(Tissue::Bone)?,
            lean: f(Tissue::Lean)?,
            adipose: f(Tissue::Adipose)?,
            air: f(Tissue::Air)?,
        })
    }

    /// 获取某一类组织对应的数据.
    #[inline]
    pub fn get(&self, tissue: Tissue) -> &T {
        match tissue {
            Tissue::Bone => &self.bone,
            Tissue::Lean => &self.lean,
            Tissue::Adipose => &self.adipose,
            Tissue::Air => &self.air,
        }
    }

    /// 按 [`Tissue::ALL`] 顺序迭代.
    pub fn iter(&self) -> impl Iterator<Item = (Tissue, &T)> {
        Tissue::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

/// 一个 CT 体数据对应的四个组织掩码.
pub type TissueMasks = PerTissue<TissueMask>;

/// 按照 `thresholds` 对 CT 体数据 `ct` 进行组织分割.
///
/// 纯逐体素操作, 不会失败. 区间比较均为显式比较, 因此落在窗口内的 0 HU 体素同样被视为组织.
pub fn segment(ct: &Volume, thresholds: &HuThresholds) -> TissueMasks {
    let data = ct.data();
    PerTissue::from_fn(|t| TissueMask::from_predicate(data, |v| thresholds.accepts(t, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn constant(value: f32, n: usize) -> Volume {
        Volume::from_array(Array3::from_elem((n, n, n), value))
    }

    #[test]
    fn test_bone_only_volume() {
        let th = HuThresholds {
            bone: HuRange::new(50.0, 50.0).unwrap(),
            lean: HuRange::new(-29.0, 49.0).unwrap(),
            adipose: HuRange::new(-190.0, -30.0).unwrap(),
            air: HuRange::new(-191.0, -191.0).unwrap(),
        };
        let m = segment(&constant(100.0, 10), &th);
        assert_eq!(m.bone.count(), 1000);
        assert!(m.lean.is_empty());
        assert!(m.adipose.is_empty());
        assert!(m.air.is_empty());
    }

    #[test]
    fn test_gap_between_windows_yields_no_tissue() {
        // 默认阈值下 (-30, -29) 与 (150, 200] 为空隙.
        let th = HuThresholds::default();
        for v in [-29.5, 175.0, 200.0] {
            let m = segment(&constant(v, 4), &th);
            for (t, mask) in m.iter() {
                assert!(mask.is_empty(), "{t} should be empty at {v} HU");
            }
        }
    }

    #[test]
    fn test_inclusive_bounds_and_zero_hu() {
        let th = HuThresholds {
            lean: HuRange::new(-10.0, 10.0).unwrap(),
            ..Default::default()
        };
        for v in [-10.0, 0.0, 10.0] {
            assert_eq!(segment(&constant(v, 2), &th).lean.count(), 8, "{v}");
        }
        assert!(segment(&constant(10.5, 2), &th).lean.is_empty());

        // 脂肪窗口同样是闭区间.
        let th = HuThresholds::default();
        assert_eq!(segment(&constant(hu::ADIPOSE_LOW, 2), &th).adipose.count(), 8);
        assert_eq!(segment(&constant(hu::ADIPOSE_HIGH, 2), &th).adipose.count(), 8);
    }

    #[test]
    fn test_strict_bone_and_air() {
        let th = HuThresholds::default();
        assert!(segment(&constant(hu::BONE_LOW, 2), &th).bone.is_empty());
        assert!(segment(&constant(hu::AIR_LOW, 2), &th).air.is_empty());
        assert_eq!(segment(&constant(-1000.0, 2), &th).air.count(), 8);
    }

    #[test]
    fn test_validate() {
        assert!(HuThresholds::default().validate().is_ok());
        let bad = HuThresholds {
            lean: HuRange {
                low: 10.0,
                high: -10.0,
            },
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(PrepError::InvalidConfig(_))));
    }
}
