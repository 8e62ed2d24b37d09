//! 数据集操作: 病例记录, 体数据加载, 派生通道文件的路径映射与保存.

use crate::channel::TissueChannels;
use crate::data::{write_volume, Geometry};
use crate::error::PrepError;
use crate::segment::{PerTissue, Tissue};
use crate::PrepResult;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod generic;

pub use generic::{patient_loader, PatientLoader, PatientRecord, PatientVolumes};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 成像模态.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Modality {
    /// PET, 以 SUV 表示.
    Suv,

    /// 重采样到 PET 空间的 CT.
    Ct,
}

impl Modality {
    /// 原始数据集中该模态的文件名.
    pub const fn file_name(&self) -> &'static str {
        match self {
            Modality::Suv => "SUV.nii.gz",
            Modality::Ct => "CTres.nii.gz",
        }
    }

    /// 派生通道文件名前缀.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Modality::Suv => "SUV",
            Modality::Ct => "CT",
        }
    }
}

/// 派生组织通道文件名: `{prefix}_{后缀}.nii.gz`.
pub fn channel_file_name(prefix: &str, tissue: Tissue) -> String {
    format!("{prefix}_{}.nii.gz", tissue.file_suffix())
}

/// 源体数据路径到派生通道文件路径的映射.
///
/// 目录映射由调用方注入, 文件名按 [`channel_file_name`] 规则生成.
pub struct ChannelPathMap {
    map_dir: Box<dyn Fn(&Path) -> PathBuf + Send + Sync>,
}

impl fmt::Debug for ChannelPathMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChannelPathMap { .. }")
    }
}

impl ChannelPathMap {
    /// 以目录映射 `map_dir` 创建. `map_dir` 接收源文件所在目录, 返回派生文件所在目录.
    pub fn new<F>(map_dir: F) -> Self
    where
        F: Fn(&Path) -> PathBuf + Send + Sync + 'static,
    {
        Self {
            map_dir: Box::new(map_dir),
        }
    }

    /// 派生文件与源文件位于同一目录.
    pub fn in_place() -> Self {
        Self::new(Path::to_path_buf)
    }

    /// 将源目录中的前缀 `from` 替换为 `to`. 不以 `from` 开头的目录原样保留.
    pub fn with_prefix<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Self {
        let (from, to) = (from.as_ref().to_owned(), to.as_ref().to_owned());
        Self::new(move |dir| match dir.strip_prefix(&from) {
            Ok(rest) => to.join(rest),
            Err(_) => dir.to_owned(),
        })
    }

    /// 派生文件所在目录.
    pub fn map_dir(&self, source: &Path) -> PrepResult<PathBuf> {
        let dir = source
            .parent()
            .ok_or_else(|| PrepError::MissingInput(source.display().to_string()))?;
        Ok((self.map_dir)(dir))
    }

    /// `source` (某一模态的源文件) 对应的 `tissue` 通道文件路径.
    pub fn channel_path(
        &self,
        source: &Path,
        modality: Modality,
        tissue: Tissue,
    ) -> PrepResult<PathBuf> {
        Ok(self
            .map_dir(source)?
            .join(channel_file_name(modality.prefix(), tissue)))
    }

    /// 四个组织通道的文件路径.
    pub fn channel_paths(
        &self,
        source: &Path,
        modality: Modality,
    ) -> PrepResult<PerTissue<PathBuf>> {
        PerTissue::try_from_fn(|t| self.channel_path(source, modality, t))
    }
}

/// 将四个组织通道体数据写入 `dir/{prefix}_{后缀}.nii.gz`, 几何信息取自 `reference`.
///
/// 返回写出的文件路径.
pub fn save_tissue_channels<P: AsRef<Path>>(
    reference: Option<&Geometry>,
    channels: &TissueChannels,
    dir: P,
    prefix: &str,
) -> PrepResult<PerTissue<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    PerTissue::try_from_fn(|t| {
        let path = dir.join(channel_file_name(prefix, t));
        write_volume(reference, channels.get(t).data(), &path)?;
        Ok(path)
    })
}
