use crate::consts::{SUV_WINDOW_HIGH, SUV_WINDOW_LOW};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 强度截断窗口, 包含下限 `low` 和上限 `high` (均含).
///
/// 用于投影前对 SUV (或 CT HU) 值进行截断. 该窗口是只读的.
/// 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipWindow {
    low: f32,
    high: f32,
}

impl ClipWindow {
    /// 构建截断窗口.
    ///
    /// `low` 和 `high` 必须是有限数且 `low < high`, 否则返回 `None`.
    pub fn new(low: f32, high: f32) -> Option<ClipWindow> {
        if low.is_finite() && high.is_finite() && low < high {
            Some(Self { low, high })
        } else {
            None
        }
    }

    /// 构建 SUV 默认窗口 \[0, 14\].
    #[inline]
    pub const fn suv_visual() -> ClipWindow {
        Self {
            low: SUV_WINDOW_LOW,
            high: SUV_WINDOW_HIGH,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.low
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.high
    }

    /// 将 `v` 截断到 `[low, high]`. NaN 保持不变.
    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        if v < self.low {
            self.low
        } else if v > self.high {
            self.high
        } else {
            v
        }
    }
}

impl Default for ClipWindow {
    #[inline]
    fn default() -> Self {
        Self::suv_visual()
    }
}

#[cfg(test)]
mod tests {
    use super::ClipWindow;

    #[test]
    fn test_clip_window_invalid_input() {
        assert!(ClipWindow::new(0.0, 0.0).is_none());
        assert!(ClipWindow::new(1.0, -1.0).is_none());
        assert!(ClipWindow::new(f32::NAN, 1.0).is_none());
        assert!(ClipWindow::new(-1000.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_clip_window_clamp() {
        let w = ClipWindow::suv_visual();
        assert_eq!(w.clamp(-3.0), 0.0);
        assert_eq!(w.clamp(7.5), 7.5);
        assert_eq!(w.clamp(14.0), 14.0);
        assert_eq!(w.clamp(100.0), 14.0);
        assert!(w.clamp(f32::NAN).is_nan());
    }

    #[test]
    fn test_clip_window_ct() {
        let w = ClipWindow::new(-160.0, 240.0).unwrap();
        assert_eq!(w.lower_bound(), -160.0);
        assert_eq!(w.upper_bound(), 240.0);
        assert_eq!(w.clamp(-1000.0), -160.0);
        assert_eq!(w.clamp(40.0), 40.0);
        assert_eq!(w.clamp(1500.0), 240.0);
    }
}
