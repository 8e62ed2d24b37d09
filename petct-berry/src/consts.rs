//! 通用常量.

/// 组织分割默认的 HU 阈值.
pub mod hu {
    /// 骨骼下限 (严格大于).
    pub const BONE_LOW: f32 = 200.0;

    /// 瘦组织下限 (含).
    pub const LEAN_LOW: f32 = -29.0;

    /// 瘦组织上限 (含).
    pub const LEAN_HIGH: f32 = 150.0;

    /// 脂肪组织下限 (含).
    pub const ADIPOSE_LOW: f32 = -190.0;

    /// 脂肪组织上限 (含).
    pub const ADIPOSE_HIGH: f32 = -30.0;

    /// 空气上限 (严格小于).
    pub const AIR_LOW: f32 = -191.0;
}

/// SUV 强度窗口默认下限.
pub const SUV_WINDOW_LOW: f32 = 0.0;

/// SUV 强度窗口默认上限.
pub const SUV_WINDOW_HIGH: f32 = 14.0;

/// 旋转投影默认起始角度 (度, 含).
pub const ANGLE_MIN: i32 = -90;

/// 旋转投影默认终止角度 (度, 含).
pub const ANGLE_MAX: i32 = 90;

/// 旋转投影默认步长 (度).
pub const ANGLE_STEP: u32 = 1;

/// 旋转投影后在宽度方向两侧裁掉的默认像素数. 用于去除旋转填充.
pub const SWEEP_CROP: usize = 60;

/// 保存可视化投影图时在宽度方向两侧裁掉的默认像素数.
pub const DISPLAY_CROP: usize = 85;

/// 旋转投影缓存文件扩展名.
pub const CACHE_EXT: &str = "npy";

/// 旋转投影缓存的通道目录名.
pub mod channel {
    /// SUV 整体 MIP.
    pub const SUV_MIP: &str = "SUV_MIP";

    /// 骨骼 SUV 通道.
    pub const SUV_BONE: &str = "SUV_bone";

    /// 瘦组织 SUV 通道.
    pub const SUV_LEAN: &str = "SUV_lean";

    /// 脂肪组织 SUV 通道.
    pub const SUV_ADIPOSE: &str = "SUV_adipose";

    /// 空气 SUV 通道.
    pub const SUV_AIR: &str = "SUV_air";

    /// 病灶分割.
    pub const SEG: &str = "SEG";

    /// CT 整体 SIP.
    pub const CT_MIP: &str = "CT_MIP";

    /// 骨骼 CT 通道.
    pub const CT_BONE: &str = "CT_bone";

    /// 瘦组织 CT 通道.
    pub const CT_LEAN: &str = "CT_lean";

    /// 脂肪组织 CT 通道.
    pub const CT_ADIPOSE: &str = "CT_adipose";

    /// 空气 CT 通道.
    pub const CT_AIR: &str = "CT_air";
}

/// 单角度可视化图像名 (不含扩展名), 同时也是最终 7x2 拼图的排布顺序.
///
/// 第一行为 SUV, 第二行为 CT.
pub const COLLAGE_NAMES: [&str; 14] = [
    "MIP_SUV",
    "MIP_SUV_bone",
    "MIP_SUV_lean",
    "MIP_SUV_adipose",
    "MIP_SUV_air",
    "MIP_SUV_SEG",
    "SIP_SUV_SEG",
    "SIP_CT",
    "SIP_CT_bone",
    "SIP_CT_lean",
    "SIP_CT_adipose",
    "SIP_CT_air",
    "MIP_CT_SEG",
    "SIP_CT_SEG",
];

/// 最终拼图列数.
pub const COLLAGE_COLUMNS: u32 = 7;

/// 最终拼图行数.
pub const COLLAGE_ROWS: u32 = 2;

/// 可视化图像扩展名.
pub const IMAGE_EXT: &str = "jpg";
