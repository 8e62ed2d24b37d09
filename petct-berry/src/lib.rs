#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 PET/CT 多模态体数据的组织分割、通道提取与旋转投影缓存.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据统一按 `[x, y, z]` 组织, 同一病例的 CT, PET 与分割必须形状一致.
//!   形状不一致, 投影退化等情况均以 [`PrepError`] 返回, 不会 panic.
//! 2. 本 crate 不对结果的临床意义做任何保证.
//!
//! # 功能清单
//!
//! ### HU 阈值组织分割 ✅
//!
//! 从 CT 生成骨骼, 瘦组织, 脂肪, 空气四个二值掩码. 阈值区间显式比较, 0 HU 不被特殊对待.
//!
//! 实现位于 `petct-berry/src/segment.rs`.
//!
//! ### 通道提取 ✅
//!
//! 掩码与 CT 或 PET 逐体素相乘.
//!
//! 实现位于 `petct-berry/src/channel.rs`.
//!
//! ### 强度投影 ✅
//!
//! 最大值, 平均值, 标准差, 求和四种统计量; 截断, 规范化, 负片, 固定方向.
//!
//! 实现位于 `petct-berry/src/project.rs`.
//!
//! ### 旋转投影缓存 ✅
//!
//! 按角度旋转体数据并投影, 每个角度原子地写入磁盘, 可中断后续跑.
//! 打开 `rayon` feature 时支持按角度并行.
//!
//! 实现位于 `petct-berry/src/sweep`.
//!
//! ### 单角度可视化与拼图 ✅
//!
//! 实现位于 `petct-berry/src/render.rs` 与 `petct-berry/src/collage.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 本 crate 的通用返回类型.
pub type PrepResult<T> = Result<T, PrepError>;

/// 3D 体数据与 2D 投影图像基础数据结构.
mod data;

pub use data::{
    write_volume, ClipWindow, Geometry, ImgWriteVis, ProjectionImage, Volume,
};

mod error;

pub use error::PrepError;

pub mod consts;

pub mod segment;

pub mod channel;

pub mod project;

pub mod rotate;

pub mod sweep;

pub mod collage;

pub mod vis;

pub mod config;

pub mod render;

pub mod dataset;
pub mod prelude;
