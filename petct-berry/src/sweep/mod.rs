//! 旋转投影扫描与按角度的磁盘缓存.
//!
//! 对每个角度: 把所有通道体数据在 (第 0 维, 第 1 维) 平面内旋转, 按各自的投影策略投影,
//! 在宽度方向裁剪, 最后原子地发布到缓存. 已完整缓存的角度会被跳过,
//! 因此中断后重新运行只会补算缺失的角度.
//!
//! ```no_run
//! use petct_berry::prelude::*;
//! use petct_berry::sweep::{CancelToken, RotationSweep, SweepConfig};
//!
//! # fn main() -> PrepResult<()> {
//! let suv = Volume::open("SUV.nii.gz")?;
//! let report = RotationSweep::new("cache", SweepConfig::default())
//!     .channel("SUV_MIP", &suv, ProjectionSpec::suv(ClipWindow::suv_visual()))
//!     .primary("SUV_MIP")
//!     .run(&CancelToken::new())?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod presets;

pub use cache::{AngleCache, CacheState, STALE_TEMP_AGE};

use crate::consts::{ANGLE_MAX, ANGLE_MIN, ANGLE_STEP, SWEEP_CROP};
use crate::data::{ProjectionImage, Volume};
use crate::error::PrepError;
use crate::project::{project, project_mask, ProjectionSpec, ViewAxis};
use crate::rotate::rotate_plane;
use crate::PrepResult;
use itertools::Itertools;
use log::{error, info, warn};
use ndarray::ArrayView3;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 旋转扫描参数.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SweepConfig {
    /// 起始角度 (度, 含).
    pub angle_min: i32,

    /// 终止角度 (度, 含).
    pub angle_max: i32,

    /// 角度步长 (度).
    pub angle_step: u32,

    /// 投影图像左侧裁掉的列数.
    pub crop_left: usize,

    /// 投影图像右侧裁掉的列数.
    pub crop_right: usize,

    /// 投影方向.
    pub view: ViewAxis,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            angle_min: ANGLE_MIN,
            angle_max: ANGLE_MAX,
            angle_step: ANGLE_STEP,
            crop_left: SWEEP_CROP,
            crop_right: SWEEP_CROP,
            view: ViewAxis::Coronal,
        }
    }
}

impl SweepConfig {
    /// 检查参数是否合法.
    pub fn validate(&self) -> PrepResult<()> {
        if self.angle_step == 0 {
            return Err(PrepError::InvalidConfig("angle step must be positive".into()));
        }
        if self.angle_min > self.angle_max {
            return Err(PrepError::InvalidConfig(format!(
                "angle range [{}, {}] is empty",
                self.angle_min, self.angle_max
            )));
        }
        Ok(())
    }

    /// 按步长迭代 `[angle_min, angle_max]` 内的所有角度.
    pub fn angles(&self) -> impl Iterator<Item = i32> {
        (self.angle_min..=self.angle_max).step_by(self.angle_step.max(1) as usize)
    }
}

/// 通道的投影方式.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ChannelKind {
    /// 按策略规范化投影.
    Projection(ProjectionSpec),

    /// 分割掩码投影, 只调整方向.
    Mask,
}

/// 参与扫描的一个通道.
#[derive(Debug, Clone)]
pub struct SweepChannel<'a> {
    name: String,
    volume: ArrayView3<'a, f32>,
    kind: ChannelKind,
}

impl SweepChannel<'_> {
    /// 通道名, 同时也是缓存子目录名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 投影方式.
    #[inline]
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// 把旋转 `angle` 度后的体数据投影为图像.
    fn render(&self, angle: i32, view: ViewAxis) -> PrepResult<ProjectionImage> {
        let rotated = rotate_plane(self.volume, angle as f64);
        match &self.kind {
            ChannelKind::Projection(spec) => project(rotated.view(), view, spec),
            ChannelKind::Mask => Ok(project_mask(rotated.view(), view)),
        }
    }
}

/// 协作式取消标志. 克隆体共享同一个标志.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 创建未取消的标志.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消. 正在处理的角度会完成, 之后的角度不再处理.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// 是否已请求取消.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 单个角度的处理结果.
#[derive(Debug)]
pub enum AngleOutcome {
    /// 新计算并发布.
    Computed,

    /// 缓存不完整, 已重新计算.
    Repaired,

    /// 已完整缓存, 跳过.
    Skipped,

    /// 计算或发布失败.
    Failed(PrepError),

    /// 因取消而未处理.
    Cancelled,
}

/// 一次扫描的汇总. 各列表按角度升序排列.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// 新计算的角度.
    pub computed: Vec<i32>,

    /// 修复了不完整缓存的角度.
    pub repaired: Vec<i32>,

    /// 跳过的角度.
    pub skipped: Vec<i32>,

    /// 失败的角度及原因.
    pub failed: Vec<(i32, PrepError)>,

    /// 因取消而未处理的角度.
    pub cancelled: Vec<i32>,
}

impl SweepReport {
    fn record(&mut self, angle: i32, outcome: AngleOutcome) {
        match outcome {
            AngleOutcome::Computed => self.computed.push(angle),
            AngleOutcome::Repaired => self.repaired.push(angle),
            AngleOutcome::Skipped => self.skipped.push(angle),
            AngleOutcome::Failed(e) => self.failed.push((angle, e)),
            AngleOutcome::Cancelled => self.cancelled.push(angle),
        }
    }

    /// 本次写入磁盘的角度数.
    #[inline]
    pub fn written(&self) -> usize {
        self.computed.len() + self.repaired.len()
    }

    /// 覆盖的角度总数.
    pub fn total(&self) -> usize {
        self.written() + self.skipped.len() + self.failed.len() + self.cancelled.len()
    }

    /// 没有失败也没有被取消的角度.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    /// 有角度因取消而未处理时返回 [`PrepError::Cancelled`].
    pub fn into_result(self) -> PrepResult<Self> {
        if self.cancelled.is_empty() {
            Ok(self)
        } else {
            Err(PrepError::Cancelled)
        }
    }
}

/// 旋转投影扫描任务. 以 builder 方式添加通道.
#[derive(Debug, Clone)]
pub struct RotationSweep<'a> {
    root: PathBuf,
    config: SweepConfig,
    channels: Vec<SweepChannel<'a>>,
    primary: Option<String>,
}

impl<'a> RotationSweep<'a> {
    /// 以缓存根目录 `root` 创建扫描任务.
    pub fn new<P: AsRef<Path>>(root: P, config: SweepConfig) -> Self {
        Self {
            root: root.as_ref().to_owned(),
            config,
            channels: vec![],
            primary: None,
        }
    }

    /// 添加一个规范化投影通道.
    pub fn channel(self, name: &str, volume: &'a Volume, spec: ProjectionSpec) -> Self {
        self.with_channel(name, volume, ChannelKind::Projection(spec))
    }

    /// 添加一个分割掩码通道.
    pub fn mask_channel(self, name: &str, volume: &'a Volume) -> Self {
        self.with_channel(name, volume, ChannelKind::Mask)
    }

    fn with_channel(mut self, name: &str, volume: &'a Volume, kind: ChannelKind) -> Self {
        self.channels.push(SweepChannel {
            name: name.to_string(),
            volume: volume.data(),
            kind,
        });
        self
    }

    /// 指定主通道. 主通道在每个角度中最后发布.
    pub fn primary(mut self, name: &str) -> Self {
        self.primary = Some(name.to_string());
        self
    }

    /// 扫描参数.
    #[inline]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// 已添加的通道.
    #[inline]
    pub fn channels(&self) -> &[SweepChannel<'a>] {
        &self.channels
    }

    /// 检查任务是否可以运行: 参数合法, 至少一个通道, 通道名不重复,
    /// 所有体数据形状一致, 且主通道存在.
    pub fn validate(&self) -> PrepResult<()> {
        self.config.validate()?;
        let Some(first) = self.channels.first() else {
            return Err(PrepError::MissingInput("sweep has no channel".into()));
        };
        if !self.channels.iter().map(|c| &c.name).all_unique() {
            return Err(PrepError::InvalidConfig("duplicate channel names".into()));
        }
        let expected = first.volume.dim();
        if let Some(c) = self.channels.iter().find(|c| c.volume.dim() != expected) {
            return Err(PrepError::shape(expected, c.volume.dim()));
        }
        match &self.primary {
            Some(p) if self.channels.iter().any(|c| &c.name == p) => Ok(()),
            Some(p) => Err(PrepError::MissingInput(format!("primary channel `{p}`"))),
            None => Err(PrepError::MissingInput("primary channel".into())),
        }
    }

    /// 校验并创建缓存目录.
    fn prepare(&self) -> PrepResult<AngleCache> {
        self.validate()?;
        let names = self.channels.iter().map(|c| c.name.as_str()).collect_vec();
        let primary = self.primary.as_deref().unwrap_or_default();
        let cache = AngleCache::new(&self.root, &names, primary);
        cache.prepare()?;
        Ok(cache)
    }

    /// 顺序处理所有角度.
    ///
    /// 任务本身不合法时直接返回 `Err`, 不处理任何角度. 单个角度的失败只记录在报告中.
    pub fn run(&self, cancel: &CancelToken) -> PrepResult<SweepReport> {
        let cache = self.prepare()?;
        let mut report = SweepReport::default();
        for angle in self.config.angles() {
            let outcome = if cancel.is_cancelled() {
                AngleOutcome::Cancelled
            } else {
                self.process_angle(&cache, angle)
            };
            report.record(angle, outcome);
        }
        self.log_summary(&report);
        Ok(report)
    }

    /// 处理一个角度: 检查缓存, 必要时计算并发布.
    pub fn process_angle(&self, cache: &AngleCache, angle: i32) -> AngleOutcome {
        let repair = match cache.state(angle) {
            CacheState::Complete => return AngleOutcome::Skipped,
            CacheState::Missing => false,
            CacheState::Partial(present) => {
                let e = PrepError::PartialCacheWrite {
                    angle,
                    present,
                    expected: self.channels.len(),
                };
                warn!("{e}; recomputing");
                true
            }
        };

        match self
            .render_angle(angle)
            .and_then(|images| cache.publish(angle, &images))
        {
            Ok(()) => {
                info!("angle {angle} published to {}", cache.root().display());
                if repair {
                    AngleOutcome::Repaired
                } else {
                    AngleOutcome::Computed
                }
            }
            Err(e) => {
                error!("angle {angle} failed: {e}");
                AngleOutcome::Failed(e)
            }
        }
    }

    /// 计算一个角度下所有通道的裁剪后投影, 不写盘.
    pub fn render_angle(&self, angle: i32) -> PrepResult<Vec<(&str, ProjectionImage)>> {
        let (left, right) = (self.config.crop_left, self.config.crop_right);
        self.channels
            .iter()
            .map(|c| {
                let img = c.render(angle, self.config.view)?.crop_width(left, right)?;
                Ok((c.name(), img))
            })
            .collect()
    }

    fn log_summary(&self, report: &SweepReport) {
        info!(
            "sweep {}: {} computed, {} repaired, {} skipped, {} failed, {} cancelled",
            self.root.display(),
            report.computed.len(),
            report.repaired.len(),
            report.skipped.len(),
            report.failed.len(),
            report.cancelled.len()
        );
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl RotationSweep<'_> {
    /// 借助 `rayon`, 并行地处理所有角度. 语义与 [`RotationSweep::run`] 相同.
    pub fn par_run(&self, cancel: &CancelToken) -> PrepResult<SweepReport> {
        let cache = self.prepare()?;
        let outcomes: Vec<(i32, AngleOutcome)> = self
            .config
            .angles()
            .collect_vec()
            .into_par_iter()
            .map(|angle| {
                let outcome = if cancel.is_cancelled() {
                    AngleOutcome::Cancelled
                } else {
                    self.process_angle(&cache, angle)
                };
                (angle, outcome)
            })
            .collect();

        let mut report = SweepReport::default();
        for (angle, outcome) in outcomes {
            report.record(angle, outcome);
        }
        self.log_summary(&report);
        Ok(report)
    }

    /// 并行地处理所有角度, 不可取消.
    #[inline]
    pub fn par_run_to_end(&self) -> PrepResult<SweepReport> {
        self.par_run(&CancelToken::new())
    }
}
