//! 二维投影图像及其持久化存储.

use crate::error::PrepError;
use crate::{Idx2d, PrepResult};
use image::{Rgb, RgbImage};
use ndarray::{s, Array2, ArrayView2, Axis};
use ndarray_npy::{read_npy, write_npy};
use std::path::Path;

/// 三维体数据沿某一轴归约得到的二维图像, 行优先, 形状为 (高, 宽).
///
/// 经过规范化的图像像素一般位于 \[0, 1\].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionImage {
    data: Array2<f64>,
}

impl ProjectionImage {
    /// 直接初始化.
    #[inline]
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// 从 npy 文件读取.
    pub fn open_npy<P: AsRef<Path>>(path: P) -> PrepResult<Self> {
        Ok(Self::new(read_npy(path.as_ref())?))
    }

    /// 按原样保存为 npy 文件.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> PrepResult<()> {
        write_npy(path.as_ref(), &self.data)?;
        Ok(())
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// 消费自我, 获得底层数组.
    #[inline]
    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 最大像素值. 空图像返回 `None`.
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }

    /// 最小像素值. 空图像返回 `None`.
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// 除以全局最大值, 使最大值为 1.
    ///
    /// 最大值不是正有限数时返回 [`PrepError::DegenerateProjection`].
    pub fn normalized(mut self) -> PrepResult<Self> {
        let max = self.max().unwrap_or(f64::NAN);
        if !(max.is_finite() && max > 0.0) {
            return Err(PrepError::DegenerateProjection { max });
        }
        self.data.mapv_inplace(|v| v / max);
        Ok(self)
    }

    /// 以最大值为轴翻转: `v -> |v - max|`. 亮-高值约定变为亮-低值约定.
    pub fn inverted(mut self) -> Self {
        if let Some(max) = self.max() {
            self.data.mapv_inplace(|v| (v - max).abs());
        }
        self
    }

    /// 最小-最大值重缩放到 \[0, 1\].
    ///
    /// 最大值与最小值相等 (或非有限) 时返回 [`PrepError::DegenerateProjection`].
    pub fn rescaled(mut self) -> PrepResult<Self> {
        let (Some(min), Some(max)) = (self.min(), self.max()) else {
            return Err(PrepError::DegenerateProjection { max: f64::NAN });
        };
        let range = max - min;
        if !(range.is_finite() && range > 0.0) {
            return Err(PrepError::DegenerateProjection { max });
        }
        self.data.mapv_inplace(|v| (v - min) / range);
        Ok(self)
    }

    /// 逆时针旋转 90 度: `out[i][j] = in[j][w - 1 - i]`.
    pub fn rot90_ccw(self) -> Self {
        let mut v = self.data.reversed_axes();
        v.invert_axis(Axis(0));
        Self::new(v.as_standard_layout().into_owned())
    }

    /// 水平镜像 (左右翻转).
    pub fn flipped_horizontal(self) -> Self {
        let mut v = self.data;
        v.invert_axis(Axis(1));
        Self::new(v.as_standard_layout().into_owned())
    }

    /// 在宽度方向上左侧裁掉 `left` 列, 右侧裁掉 `right` 列.
    ///
    /// 若 `left + right >= width`, 返回 [`PrepError::InvalidCrop`].
    pub fn crop_width(&self, left: usize, right: usize) -> PrepResult<Self> {
        let width = self.width();
        if left.saturating_add(right) >= width {
            return Err(PrepError::InvalidCrop { width, left, right });
        }
        Ok(Self::new(
            self.data.slice(s![.., left..width - right]).to_owned(),
        ))
    }

    /// 逐像素相乘. 形状不一致时返回 `Err`.
    pub fn product(&self, other: &ProjectionImage) -> PrepResult<Self> {
        if self.shape() != other.shape() {
            let ((h0, w0), (h1, w1)) = (self.shape(), other.shape());
            return Err(PrepError::shape((h0, w0, 1), (h1, w1, 1)));
        }
        Ok(Self::new(&self.data * &other.data))
    }

    /// 转换为 8-bit RGB 图像: `v -> (factor * (255 * v) as u8) as u8`, 三通道相同.
    pub fn to_rgb8(&self, factor: f64) -> RgbImage {
        let (height, width) = self.shape();
        let mut buf = RgbImage::new(width as u32, height as u32);
        for ((h, w), &v) in self.data.indexed_iter() {
            let gray = (255.0 * v) as u8;
            let gray = (factor * gray as f64) as u8;
            buf.put_pixel(w as u32, h as u32, Rgb([gray; 3]));
        }
        buf
    }
}

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 投影图像在保存时会先在宽度方向两侧各裁去 `crop` 列, 然后映射为 8-bit RGB 图像.
/// 文件格式由扩展名决定.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P, crop: usize) -> PrepResult<()>;
}

impl ImgWriteVis for ProjectionImage {
    fn save<P: AsRef<Path>>(&self, path: P, crop: usize) -> PrepResult<()> {
        self.crop_width(crop, crop)?.to_rgb8(1.0).save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rot90_ccw() {
        // 1 2 3      3 6
        // 4 5 6  ->  2 5
        //            1 4
        let img = ProjectionImage::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let rot = img.rot90_ccw();
        assert_eq!(
            rot.into_array(),
            array![[3.0, 6.0], [2.0, 5.0], [1.0, 4.0]]
        );
    }

    #[test]
    fn test_flip_horizontal() {
        let img = ProjectionImage::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(
            img.flipped_horizontal().into_array(),
            array![[3.0, 2.0, 1.0], [6.0, 5.0, 4.0]]
        );
    }

    #[test]
    fn test_normalize_invert_rescale() {
        let img = ProjectionImage::new(array![[0.0, 2.0], [4.0, 8.0]]);
        let n = img.normalized().unwrap();
        assert_eq!(n.max(), Some(1.0));
        let inv = n.clone().inverted();
        assert_eq!(inv.into_array(), array![[1.0, 0.75], [0.5, 0.0]]);

        let r = ProjectionImage::new(array![[2.0, 4.0], [6.0, 10.0]])
            .rescaled()
            .unwrap();
        assert_eq!(r.min(), Some(0.0));
        assert_eq!(r.max(), Some(1.0));
    }

    #[test]
    fn test_degenerate() {
        let zeros = ProjectionImage::new(Array2::zeros((3, 3)));
        assert!(matches!(
            zeros.clone().normalized(),
            Err(PrepError::DegenerateProjection { .. })
        ));
        assert!(matches!(
            zeros.rescaled(),
            Err(PrepError::DegenerateProjection { .. })
        ));
        let neg = ProjectionImage::new(Array2::from_elem((2, 2), -1.0));
        assert!(neg.normalized().is_err());
    }

    #[test]
    fn test_crop_width() {
        let img = ProjectionImage::new(Array2::from_shape_fn((4, 10), |(_, w)| w as f64));
        for margin in 0..5 {
            let c = img.crop_width(margin, margin).unwrap();
            assert_eq!(c.width(), 10 - 2 * margin);
            assert_eq!(c.height(), 4);
            assert_eq!(c.array_view()[(0, 0)], margin as f64);
        }
        assert!(matches!(
            img.crop_width(5, 5),
            Err(PrepError::InvalidCrop { width: 10, .. })
        ));
    }

    #[test]
    fn test_npy_and_vis_save() {
        let dir = tempfile::tempdir().unwrap();
        let img = ProjectionImage::new(Array2::from_shape_fn((6, 8), |(h, w)| {
            (h * 8 + w) as f64 / 47.0
        }));

        let npy = dir.path().join("img.npy");
        img.save_npy(&npy).unwrap();
        assert_eq!(ProjectionImage::open_npy(&npy).unwrap(), img);

        let png = dir.path().join("img.png");
        img.save(&png, 2).unwrap();
        let back = image::open(&png).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (4, 6));
        assert_eq!(back.get_pixel(0, 0), &Rgb([(255.0 * 2.0 / 47.0) as u8; 3]));
    }
}
