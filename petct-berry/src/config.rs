//! 整条预处理流水线的配置.

use crate::consts::DISPLAY_CROP;
use crate::data::ClipWindow;
use crate::error::PrepError;
use crate::project::ViewAxis;
use crate::segment::HuThresholds;
use crate::sweep::SweepConfig;
use crate::PrepResult;
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 流水线配置. 所有字段都有默认值, 反序列化时缺省的字段取默认值.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// 组织分割阈值.
    pub thresholds: HuThresholds,

    /// PET 投影前的 SUV 截断窗口.
    pub suv_window: ClipWindow,

    /// CT 投影前的截断窗口. 默认不截断.
    pub ct_window: Option<ClipWindow>,

    /// 旋转扫描参数.
    pub sweep: SweepConfig,

    /// 单角度可视化需要生成的视图.
    pub views: Vec<ViewAxis>,

    /// 保存可视化图像时宽度方向两侧各裁掉的像素数.
    pub display_crop: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: HuThresholds::default(),
            suv_window: ClipWindow::suv_visual(),
            ct_window: None,
            sweep: SweepConfig::default(),
            views: vec![ViewAxis::Coronal, ViewAxis::Sagittal],
            display_crop: DISPLAY_CROP,
        }
    }
}

impl PipelineConfig {
    /// 检查配置是否合法.
    pub fn validate(&self) -> PrepResult<()> {
        self.thresholds.validate()?;
        self.sweep.validate()?;
        for w in std::iter::once(&self.suv_window).chain(&self.ct_window) {
            if ClipWindow::new(w.lower_bound(), w.upper_bound()).is_none() {
                return Err(PrepError::InvalidConfig(format!(
                    "window [{}, {}] is invalid",
                    w.lower_bound(),
                    w.upper_bound()
                )));
            }
        }
        if self.views.is_empty() {
            return Err(PrepError::InvalidConfig("no view type".into()));
        }
        if !self.views.iter().all_unique() {
            return Err(PrepError::InvalidConfig("duplicate view types".into()));
        }
        Ok(())
    }
}
