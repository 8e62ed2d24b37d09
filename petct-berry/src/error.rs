//! 运行时错误.

use crate::Idx3d;
use std::io;
use thiserror::Error;

/// 组织分割、投影、旋转缓存过程中的运行时错误.
#[derive(Debug, Error)]
pub enum PrepError {
    /// 体数据 (或掩码) 之间的形状不一致.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// 期望形状.
        expected: Idx3d,
        /// 实际形状.
        found: Idx3d,
    },

    /// 投影结果的最大值不是正有限数, 无法规范化.
    #[error("degenerate projection: reduced maximum is {max}")]
    DegenerateProjection {
        /// 投影结果的最大值.
        max: f64,
    },

    /// 缺少期望的通道或文件.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// 某个角度的缓存只写入了部分通道.
    #[error("partial cache write at angle {angle}: {present}/{expected} channels present")]
    PartialCacheWrite {
        /// 角度 (度).
        angle: i32,
        /// 已存在的通道文件数.
        present: usize,
        /// 期望的通道文件数.
        expected: usize,
    },

    /// 裁剪边距超出了图像宽度.
    #[error("crop ({left}, {right}) does not fit image width {width}")]
    InvalidCrop {
        /// 图像宽度.
        width: usize,
        /// 左边距.
        left: usize,
        /// 右边距.
        right: usize,
    },

    /// 非法配置.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// 任务在开始前被取消.
    #[error("cancelled")]
    Cancelled,

    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// 读写 nifti 文件错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 写 npy 文件错误.
    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    /// 读 npy 文件错误.
    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    /// 读写 8-bit 图像错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl PrepError {
    /// 快捷构造 [`PrepError::ShapeMismatch`].
    #[inline]
    pub(crate) fn shape(expected: Idx3d, found: Idx3d) -> Self {
        Self::ShapeMismatch { expected, found }
    }
}
