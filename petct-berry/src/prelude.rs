//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d, PrepError, PrepResult};

pub use crate::data::{ClipWindow, Geometry, ImgWriteVis, ProjectionImage, Volume};

pub use crate::channel::{extract, extract_all, TissueChannels};
pub use crate::segment::{
    segment, HuRange, HuThresholds, PerTissue, Tissue, TissueMask, TissueMasks,
};

pub use crate::project::{project, project_mask, ProjectionSpec, Statistic, ViewAxis};
pub use crate::rotate::rotate_volume;

pub use crate::sweep::presets::{ct_sweep, suv_sweep};
pub use crate::sweep::{CancelToken, RotationSweep, SweepConfig, SweepReport};

pub use crate::config::PipelineConfig;
pub use crate::render::PatientRenderer;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, ChannelPathMap, PatientRecord, PatientVolumes};
