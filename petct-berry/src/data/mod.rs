use std::fmt;
use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3, ShapeBuilder, Zip};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::PrepError;
use crate::{Idx3d, PrepResult};

pub mod projection;
pub mod window;

pub use projection::{ImgWriteVis, ProjectionImage};
pub use window::ClipWindow;

/// 体数据的几何信息句柄 (方向, 体素分辨率, 仿射矩阵等).
///
/// 本 crate 从不解读其中的内容, 仅在读写 nifti 文件时原样转发.
/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观, 因此我们将其分配到堆上.
#[derive(Clone)]
pub struct Geometry(Box<NiftiHeader>);

impl Geometry {
    /// 从参考 nifti 文件读取几何信息.
    pub fn from_reference<P: AsRef<Path>>(path: P) -> PrepResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        Ok(Self(Box::new(obj.header().clone())))
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("dim", &self.0.dim)
            .field("pixdim", &self.0.pixdim)
            .finish()
    }
}

/// 3D 体数据 (CT HU, PET SUV 或二值化后的分割), 值以 `f32` 保存.
///
/// 数据按 `[x, y, z]` 组织 (即 nifti 的自然轴序, 行优先存储):
/// 第 0 维为左右方向, 第 1 维为前后方向, 第 2 维为头脚方向.
/// 冠状面投影沿第 1 维进行, 矢状面投影沿第 0 维进行.
///
/// 所有变换都返回新的 `Volume`, 不就地修改数据.
#[derive(Debug, Clone)]
pub struct Volume {
    geometry: Option<Geometry>,
    data: Array3<f32>,
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Volume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 体数据. `path` 为文件的本地路径.
    /// 文件头作为几何信息句柄保存.
    pub fn open<P: AsRef<Path>>(path: P) -> PrepResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z, (1, ..)]. 体素个数数组.
        let [_, x, y, z, ..] = header.dim;
        let shape = (x as usize, y as usize, z as usize);

        // The nature of nifti data field layout: 第一维变化最快.
        let raw = obj.into_volume().into_ndarray::<f32>()?;
        let data = Array3::from_shape_vec(shape.f(), raw.into_raw_vec()).map_err(|_| {
            PrepError::MissingInput(format!(
                "`{}` is not a single 3D volume",
                path.as_ref().display()
            ))
        })?;
        let data = data.as_standard_layout().into_owned();
        debug_assert!(data.is_standard_layout());

        Ok(Self {
            geometry: Some(Geometry(header)),
            data,
        })
    }

    /// 从裸数组直接创建体数据, 不带几何信息.
    #[inline]
    pub fn from_array(data: Array3<f32>) -> Self {
        Self {
            geometry: None,
            data,
        }
    }

    /// 替换几何信息句柄.
    #[inline]
    pub fn with_geometry(mut self, geometry: Option<Geometry>) -> Self {
        self.geometry = geometry;
        self
    }

    /// 以 `self` 的几何信息包装新数组. 形状不一致时返回 `Err`.
    pub fn derive(&self, data: Array3<f32>) -> PrepResult<Self> {
        let found = data.dim();
        self.check_shape(found)?;
        Ok(Self {
            geometry: self.geometry.clone(),
            data,
        })
    }

    /// 几何信息句柄.
    #[inline]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// 将数据写入 `path`. 几何信息从打开时的参考文件头复制, 没有几何信息时使用默认文件头.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PrepResult<()> {
        write_volume(self.geometry.as_ref(), self.data.view(), path)
    }

    /// 获取数据形状 `(x, y, z)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 消费自我, 获得底层数组.
    #[inline]
    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// 检查形状是否为 `expected`.
    #[inline]
    pub fn check_shape(&self, found: Idx3d) -> PrepResult<()> {
        let expected = self.shape();
        if expected == found {
            Ok(())
        } else {
            Err(PrepError::shape(expected, found))
        }
    }

    /// 最小体素值. 空数据返回 `None`.
    pub fn min(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::min)
    }

    /// 最大体素值. 空数据返回 `None`.
    pub fn max(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }

    /// 对每个体素施加 `f`, 获得保留几何信息的新体数据.
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Volume {
        Self {
            geometry: self.geometry.clone(),
            data: self.data.mapv(f),
        }
    }

    /// 将所有体素减去最小值, 使其非负. 用于 CT 求和投影前的预处理.
    pub fn shift_to_min(&self) -> Volume {
        let min = self.min().unwrap_or(0.0);
        self.map(|v| v - min)
    }

    /// 二值化: 非零体素置 1, 其余置 0. 用于病灶分割标签.
    pub fn binarized(&self) -> Volume {
        self.map(|v| if v != 0.0 { 1.0 } else { 0.0 })
    }

    /// 逐体素相乘. 形状不一致时返回 `Err`, 不做广播.
    pub fn product(&self, other: &Volume) -> PrepResult<Volume> {
        self.check_shape(other.shape())?;
        let mut data = Array3::<f32>::zeros(self.shape());
        Zip::from(&mut data)
            .and(&self.data)
            .and(&other.data)
            .for_each(|o, &a, &b| *o = a * b);
        Ok(Self {
            geometry: self.geometry.clone(),
            data,
        })
    }
}

/// 将 `data` 写入 `path`, 几何信息从 `reference` 复制.
///
/// `reference` 为 `None` 时使用默认 nifti 文件头. 文件格式由扩展名决定 (`.nii` 或 `.nii.gz`).
pub fn write_volume<P: AsRef<Path>>(
    reference: Option<&Geometry>,
    data: ArrayView3<f32>,
    path: P,
) -> PrepResult<()> {
    match reference {
        Some(Geometry(header)) => WriterOptions::new(path.as_ref())
            .reference_header(header)
            .write_nifti(&data)?,
        None => WriterOptions::new(path.as_ref()).write_nifti(&data)?,
    }
    Ok(())
}
