//! 常用的两组旋转扫描: PET (SUV) 扫描与 CT 扫描.

use super::{RotationSweep, SweepConfig};
use crate::channel::TissueChannels;
use crate::consts::channel;
use crate::data::{ClipWindow, Volume};
use crate::project::ProjectionSpec;
use crate::segment::Tissue;
use std::path::Path;

/// PET 组织通道在缓存中的目录名.
pub const fn suv_channel_name(tissue: Tissue) -> &'static str {
    match tissue {
        Tissue::Bone => channel::SUV_BONE,
        Tissue::Lean => channel::SUV_LEAN,
        Tissue::Adipose => channel::SUV_ADIPOSE,
        Tissue::Air => channel::SUV_AIR,
    }
}

/// CT 组织通道在缓存中的目录名.
pub const fn ct_channel_name(tissue: Tissue) -> &'static str {
    match tissue {
        Tissue::Bone => channel::CT_BONE,
        Tissue::Lean => channel::CT_LEAN,
        Tissue::Adipose => channel::CT_ADIPOSE,
        Tissue::Air => channel::CT_AIR,
    }
}

/// PET 扫描: 整体 SUV 与四个组织通道均为截断后的负片 MIP, 另加病灶分割掩码.
///
/// 主通道为 [`channel::SUV_MIP`].
pub fn suv_sweep<'a, P: AsRef<Path>>(
    root: P,
    config: SweepConfig,
    suv: &'a Volume,
    channels: &'a TissueChannels,
    seg: &'a Volume,
    window: ClipWindow,
) -> RotationSweep<'a> {
    let spec = ProjectionSpec::suv(window);
    channels
        .iter()
        .fold(
            RotationSweep::new(root, config).channel(channel::SUV_MIP, suv, spec),
            |s, (t, v)| s.channel(suv_channel_name(t), v, spec),
        )
        .mask_channel(channel::SEG, seg)
        .primary(channel::SUV_MIP)
}

/// CT 扫描: 整体 CT 为负片 SIP, 四个组织通道额外做最小-最大重缩放.
///
/// 主通道为 [`channel::CT_MIP`].
pub fn ct_sweep<'a, P: AsRef<Path>>(
    root: P,
    config: SweepConfig,
    ct: &'a Volume,
    channels: &'a TissueChannels,
    window: Option<ClipWindow>,
) -> RotationSweep<'a> {
    let spec = ProjectionSpec::ct_sum(window);
    channels
        .iter()
        .fold(
            RotationSweep::new(root, config).channel(channel::CT_MIP, ct, spec),
            |s, (t, v)| s.channel(ct_channel_name(t), v, spec.rescaled()),
        )
        .primary(channel::CT_MIP)
}
