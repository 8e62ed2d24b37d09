//! 按 (通道, 角度) 组织的旋转投影磁盘缓存.
//!
//! 目录结构为 `<root>/<通道名>/<角度>.npy`. 文件存在与否是唯一的完成标志, 不另设清单.
//! 一个角度的全部通道先写入临时文件, 全部写完后再逐个改名发布, 主通道最后发布.
//! 进程崩溃留下的临时文件在下一次 [`AngleCache::prepare`] 时按修改时间清理.

use crate::consts::CACHE_EXT;
use crate::data::ProjectionImage;
use crate::PrepResult;
use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 进程内临时文件序号, 与进程号一起保证并发写者的临时文件名互不冲突.
static TEMP_SEQ: AtomicUsize = AtomicUsize::new(0);

/// 临时文件扩展名.
const TEMP_EXT: &str = "tmp";

/// 超过该时长未被改名的临时文件视为崩溃残留.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// 某个角度在缓存中的状态.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CacheState {
    /// 所有通道文件都已存在.
    Complete,

    /// 只有部分通道文件存在. 参数为已存在的文件数.
    Partial(usize),

    /// 所有通道文件都不存在.
    Missing,
}

/// 旋转投影磁盘缓存.
#[derive(Debug, Clone)]
pub struct AngleCache {
    root: PathBuf,

    /// 发布顺序. 主通道位于最后.
    channels: Vec<String>,
}

impl AngleCache {
    /// 创建缓存描述. `primary` 会被移动到发布顺序的最后.
    pub fn new<P: AsRef<Path>>(root: P, channels: &[&str], primary: &str) -> Self {
        let mut channels: Vec<String> = channels
            .iter()
            .filter(|&&c| c != primary)
            .map(|c| c.to_string())
            .collect();
        channels.push(primary.to_string());
        Self {
            root: root.as_ref().to_owned(),
            channels,
        }
    }

    /// 缓存根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 主通道名.
    #[inline]
    pub fn primary(&self) -> &str {
        // `new` 保证至少有一个通道.
        &self.channels[self.channels.len() - 1]
    }

    /// 按发布顺序迭代通道名.
    pub fn channels(&self) -> impl ExactSizeIterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// 创建所有通道目录, 并清理其中早于 [`STALE_TEMP_AGE`] 的临时文件.
    pub fn prepare(&self) -> PrepResult<()> {
        for c in self.channels() {
            let dir = self.root.join(c);
            fs::create_dir_all(&dir)?;
            let reaped = reap_temps(&dir, STALE_TEMP_AGE)?;
            if reaped > 0 {
                warn!("removed {reaped} stale temporary file(s) in {}", dir.display());
            }
        }
        Ok(())
    }

    /// `(channel, angle)` 对应的缓存文件路径.
    pub fn entry_path(&self, channel: &str, angle: i32) -> PathBuf {
        let mut p = self.root.join(channel);
        p.push(format!("{angle}.{CACHE_EXT}"));
        p
    }

    /// 逐通道检查 `angle` 的缓存状态.
    pub fn state(&self, angle: i32) -> CacheState {
        let present = self
            .channels()
            .filter(|c| self.entry_path(c, angle).is_file())
            .count();
        match present {
            0 => CacheState::Missing,
            n if n == self.channels.len() => CacheState::Complete,
            n => CacheState::Partial(n),
        }
    }

    /// 读取一个已缓存的投影.
    pub fn read(&self, channel: &str, angle: i32) -> PrepResult<ProjectionImage> {
        ProjectionImage::open_npy(self.entry_path(channel, angle))
    }

    /// 发布 `angle` 的全部通道图像. `images` 必须恰好覆盖所有通道.
    ///
    /// 先把每个通道写到各自目录下的临时文件, 任何一个写失败都会删除已写出的临时文件,
    /// 且不会触碰已发布的文件. 全部写完后按发布顺序改名, 主通道最后.
    pub fn publish(&self, angle: i32, images: &[(&str, ProjectionImage)]) -> PrepResult<()> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.channels.len());
        for channel in self.channels() {
            let Some((_, img)) = images.iter().find(|(c, _)| *c == channel) else {
                discard(&staged);
                return Err(crate::PrepError::MissingInput(format!(
                    "no image for channel `{channel}` at angle {angle}"
                )));
            };
            let tmp = self.temp_path(channel, angle);
            if let Err(e) = img.save_npy(&tmp) {
                // 写了一半的临时文件也要清理.
                let _ = fs::remove_file(&tmp);
                discard(&staged);
                return Err(e);
            }
            staged.push((tmp, self.entry_path(channel, angle)));
        }

        for (i, (tmp, dst)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, dst) {
                discard(&staged[i..]);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn temp_path(&self, channel: &str, angle: i32) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut p = self.root.join(channel);
        p.push(format!(".{angle}.{}-{seq}.{CACHE_EXT}.{TEMP_EXT}", std::process::id()));
        p
    }
}

/// 删除尚未发布的临时文件.
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}

/// 是否为 [`AngleCache::temp_path`] 生成的临时文件名.
fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && Path::new(name).extension().is_some_and(|e| e == TEMP_EXT)
}

/// 删除 `dir` 中修改时间早于 `min_age` 的临时文件, 返回删除的个数.
fn reap_temps(dir: &Path, min_age: Duration) -> PrepResult<usize> {
    let mut reaped = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_str().is_some_and(is_temp_name) {
            continue;
        }
        // 修改时间在未来时 `elapsed` 返回 `Err`, 视为新文件.
        let age = entry.metadata()?.modified()?.elapsed().unwrap_or_default();
        if age < min_age {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => reaped += 1,
            // 其它写者刚好改名或清理了它.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(reaped)
}
