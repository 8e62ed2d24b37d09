//! 通道提取: 将组织掩码施加到 CT 或 PET 体数据上.

use crate::data::Volume;
use crate::error::PrepError;
use crate::segment::{PerTissue, Tissue, TissueMask, TissueMasks};
use crate::PrepResult;
use ndarray::{Array3, Zip};

/// 一个体数据在四类组织掩码下的通道体数据.
pub type TissueChannels = PerTissue<Volume>;

/// 逐体素计算 `volume * mask`, 掩码外的体素为 0. 结果继承 `volume` 的几何信息.
///
/// 两者形状必须完全一致, 否则返回 [`PrepError::ShapeMismatch`].
pub fn extract(volume: &Volume, mask: &TissueMask) -> PrepResult<Volume> {
    if volume.shape() != mask.shape() {
        return Err(PrepError::shape(volume.shape(), mask.shape()));
    }
    let mut data = Array3::<f32>::zeros(volume.shape());
    Zip::from(&mut data)
        .and(volume.data())
        .and(mask.data())
        .for_each(|o, &v, &m| *o = v * f32::from(m));
    volume.derive(data)
}

/// 对 `volume` 依次施加四个组织掩码.
pub fn extract_all(volume: &Volume, masks: &TissueMasks) -> PrepResult<TissueChannels> {
    PerTissue::try_from_fn(|t| extract(volume, masks.get(t)))
}

/// CT 通道求和投影前的预处理: 瘦组织, 脂肪, 空气通道减去各自的最小值, 骨骼通道不变.
pub fn shifted_for_sum(ct_channels: &TissueChannels) -> TissueChannels {
    PerTissue::from_fn(|t| match t {
        Tissue::Bone => ct_channels.bone.clone(),
        _ => ct_channels.get(t).shift_to_min(),
    })
}
