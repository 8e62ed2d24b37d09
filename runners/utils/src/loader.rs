//! 对 `petct-berry::dataset` 的更一层封装. 提供从环境变量确定的数据目录.

use petct_berry::dataset::{self, ChannelPathMap};
use petct_berry::{PrepError, PrepResult};
use std::env;
use std::path::PathBuf;

/// 原始数据集目录的环境变量.
pub const DATA_DIR_VAR: &str = "PETCT_DATA_DIR";

/// 派生通道文件目录的环境变量.
pub const DERIVED_DIR_VAR: &str = "PETCT_DERIVED_DIR";

/// 输出目录的环境变量.
pub const OUT_DIR_VAR: &str = "PETCT_OUT_DIR";

/// 若环境变量 `var` 非空则返回其值, 否则返回 `$HOME/dataset/{fallback}`.
fn dir_from_env_or_home(var: &str, fallback: &str) -> PrepResult<PathBuf> {
    match env::var(var) {
        Ok(d) if !d.is_empty() => Ok(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with([fallback])
            .ok_or_else(|| PrepError::MissingInput(format!("${var} or home directory"))),
    }
}

/// 获取原始 PET/CT 数据集目录.
///
/// 1. 若环境变量 `$PETCT_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/FDG-PET-CT-Lesions`.
pub fn data_dir_from_env_or_home() -> PrepResult<PathBuf> {
    dir_from_env_or_home(DATA_DIR_VAR, "FDG-PET-CT-Lesions")
}

/// 获取派生组织通道文件目录.
///
/// 1. 若环境变量 `$PETCT_DERIVED_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/3D_CT_SUV_Data`.
pub fn derived_dir_from_env_or_home() -> PrepResult<PathBuf> {
    dir_from_env_or_home(DERIVED_DIR_VAR, "3D_CT_SUV_Data")
}

/// 获取输出目录.
///
/// 1. 若环境变量 `$PETCT_OUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/petct-out`.
pub fn out_dir_from_env_or_home() -> PrepResult<PathBuf> {
    dir_from_env_or_home(OUT_DIR_VAR, "petct-out")
}

/// 把原始数据集目录下的病例目录映射到派生目录下的同名目录.
pub fn channel_path_map_from_env_or_home() -> PrepResult<ChannelPathMap> {
    Ok(ChannelPathMap::with_prefix(
        data_dir_from_env_or_home()?,
        derived_dir_from_env_or_home()?,
    ))
}
