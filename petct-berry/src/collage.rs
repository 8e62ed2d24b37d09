//! 把多张可视化图像拼接为一张.
//!
//! 所有单元格大小取第一张图像的尺寸. 尺寸不同的图像按左上角对齐, 超出单元格的部分被截掉.

use crate::error::PrepError;
use crate::PrepResult;
use image::{imageops, RgbImage};
use std::fs;
use std::path::Path;

/// 左右拼接两张图像. 画布宽为 `2 * a.width()`, 高为 `a.height()`.
pub fn assemble_pair(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let mut canvas = RgbImage::new(a.width() * 2, a.height());
    imageops::replace(&mut canvas, a, 0, 0);
    imageops::replace(&mut canvas, b, i64::from(a.width()), 0);
    canvas
}

/// 按行优先顺序把 `images` 排布到 `columns * rows` 的网格中, 空余的格子保持黑色.
///
/// `images` 为空时返回 [`PrepError::MissingInput`], 多于格子数时返回
/// [`PrepError::InvalidConfig`].
pub fn assemble_grid(images: &[RgbImage], columns: u32, rows: u32) -> PrepResult<RgbImage> {
    let Some(first) = images.first() else {
        return Err(PrepError::MissingInput("no image to assemble".into()));
    };
    let cells = columns as usize * rows as usize;
    if images.len() > cells {
        return Err(PrepError::InvalidConfig(format!(
            "{} images do not fit into a {columns}x{rows} grid",
            images.len()
        )));
    }
    let (w, h) = first.dimensions();
    let mut canvas = RgbImage::new(w * columns, h * rows);
    for (i, img) in images.iter().enumerate() {
        let (col, row) = (i as u32 % columns, i as u32 / columns);
        imageops::replace(&mut canvas, img, i64::from(col * w), i64::from(row * h));
    }
    Ok(canvas)
}

/// 打开一张图像并转换为 RGB.
pub fn open_rgb<P: AsRef<Path>>(path: P) -> PrepResult<RgbImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PrepError::MissingInput(path.display().to_string()));
    }
    Ok(image::open(path)?.to_rgb8())
}

/// 把 `left_dir` 与 `right_dir` 中同名的图像左右拼接, 以同样的文件名保存到 `out_dir`.
///
/// 以 `left_dir` 中的文件为准, 按文件名排序处理. 返回拼接的图像数.
pub fn pair_folders<P, Q, R>(left_dir: P, right_dir: Q, out_dir: R) -> PrepResult<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let (right_dir, out_dir) = (right_dir.as_ref(), out_dir.as_ref());
    fs::create_dir_all(out_dir)?;

    let mut names = vec![];
    for entry in fs::read_dir(left_dir.as_ref())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name());
        }
    }
    names.sort();

    for name in &names {
        let left = open_rgb(left_dir.as_ref().join(name))?;
        let right = open_rgb(right_dir.join(name))?;
        assemble_pair(&left, &right).save(out_dir.join(name))?;
    }
    Ok(names.len())
}

/// 从 `dir` 读取 `names` 对应的图像 (`{name}.{ext}`), 拼成网格后保存到 `out_path`.
pub fn grid_from_folder<P, Q>(
    dir: P,
    names: &[&str],
    ext: &str,
    columns: u32,
    rows: u32,
    out_path: Q,
) -> PrepResult<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let images = names
        .iter()
        .map(|n| open_rgb(dir.as_ref().join(format!("{n}.{ext}"))))
        .collect::<PrepResult<Vec<_>>>()?;
    let out_path = out_path.as_ref();
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    assemble_grid(&images, columns, rows)?.save(out_path)?;
    Ok(())
}
