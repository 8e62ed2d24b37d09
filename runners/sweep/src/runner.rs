//! 程序运行函数.

use crate::result::RunResult;
use log::{info, warn};
use petct_berry::channel::shifted_for_sum;
use petct_berry::dataset::{save_tissue_channels, Modality};
use petct_berry::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use utils::loader;

/// 命令行参数.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub patient_id: String,
    pub scan_date: String,
    pub disease_type: String,
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// 从 `std::env::args()` 风格的参数解析. 第一个参数为程序名.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Option<Self> {
        let mut it = args.into_iter().skip(1);
        Some(Self {
            patient_id: it.next()?,
            scan_date: it.next()?,
            disease_type: it.next()?,
            config: it.next().map(PathBuf::from),
        })
    }
}

/// 读取 JSON 配置. 未给出路径时使用默认配置.
pub fn load_config(path: Option<&Path>) -> PrepResult<PipelineConfig> {
    let config = match path {
        Some(p) => serde_json::from_str(&fs::read_to_string(p)?)
            .map_err(|e| PrepError::InvalidConfig(format!("{}: {e}", p.display())))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// 实际运行: 从环境变量确定的目录读取病例, 再交给 [`process`].
pub fn run(args: &RunArgs) -> PrepResult<RunResult> {
    let config = load_config(args.config.as_deref())?;
    let data_dir = loader::data_dir_from_env_or_home()?;
    let out_dir = loader::out_dir_from_env_or_home()?;

    let record = PatientRecord::from_layout(
        &data_dir,
        &args.patient_id,
        &args.scan_date,
        &args.disease_type,
    );
    info!("loading {} from {}", record.mip_label(), data_dir.display());
    let volumes = PatientVolumes::open(&record)?;
    let channel_dir = loader::channel_path_map_from_env_or_home()?.map_dir(&record.suv)?;

    process(&config, &record, &volumes, &channel_dir, &out_dir)
}

/// 处理一个已加载的病例: 分割, 提取并保存通道, 单角度可视化, 两组旋转扫描.
///
/// 单角度可视化失败 (例如分割为空时病灶图像退化) 只记录在结果中, 旋转扫描照常进行.
pub fn process(
    config: &PipelineConfig,
    record: &PatientRecord,
    volumes: &PatientVolumes,
    channel_dir: &Path,
    out_dir: &Path,
) -> PrepResult<RunResult> {
    let masks = segment(&volumes.ct, &config.thresholds);
    for (t, m) in masks.iter() {
        info!("{t}: {} voxels", m.count());
    }
    let suv_channels = extract_all(&volumes.suv, &masks)?;
    let ct_channels = extract_all(&volumes.ct, &masks)?;

    let mut channel_files = vec![];
    for (modality, volume, channels) in [
        (Modality::Suv, &volumes.suv, &suv_channels),
        (Modality::Ct, &volumes.ct, &ct_channels),
    ] {
        let paths =
            save_tissue_channels(volume.geometry(), channels, channel_dir, modality.prefix())?;
        channel_files.extend(paths.iter().map(|(_, p)| p.clone()));
    }

    let rendered = PatientRenderer::new(config, volumes, &suv_channels, &ct_channels)
        .and_then(|r| r.render(out_dir, record));
    if let Err(e) = &rendered {
        warn!("{}: collage skipped: {e}", record.mip_label());
    }

    let cache_root = out_dir.join("Rotations").join(record.mip_label());
    info!("rotation sweeps on {} cpus", utils::cpus());

    let suv_report = suv_sweep(
        &cache_root,
        config.sweep,
        &volumes.suv,
        &suv_channels,
        &volumes.seg,
        config.suv_window,
    )
    .par_run_to_end()?;

    let ct = volumes.ct.shift_to_min();
    let ct_channels = shifted_for_sum(&ct_channels);
    let ct_report = ct_sweep(&cache_root, config.sweep, &ct, &ct_channels, config.ct_window)
        .par_run_to_end()?;

    Ok(RunResult::new(
        record.collage_label(),
        channel_files,
        rendered,
        [("SUV", suv_report), ("CT", ct_report)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_args() {
        let args = ["petct-sweep", "PETCT_1", "2002-01-01", "LYMPHOMA"].map(String::from);
        let a = RunArgs::from_args(args).unwrap();
        assert_eq!(a.patient_id, "PETCT_1");
        assert_eq!(a.config, None);

        let args = ["petct-sweep", "PETCT_1", "2002-01-01", "LYMPHOMA", "c.json"].map(String::from);
        assert_eq!(
            RunArgs::from_args(args).unwrap().config,
            Some(PathBuf::from("c.json"))
        );
        assert!(RunArgs::from_args(["petct-sweep", "PETCT_1"].map(String::from)).is_none());
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, r#"{ "display_crop": 10 }"#).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().display_crop, 10);

        fs::write(&path, r#"{ "views": [] }"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(PrepError::InvalidConfig(_))
        ));
        fs::write(&path, "not json").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_empty_segmentation_still_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        let shape = (12, 10, 8);
        let ct = Array3::from_shape_fn(shape, |(x, y, z)| match (x * y + z) % 4 {
            0 => 500.0,
            1 => 40.0,
            2 => -100.0,
            _ => -900.0,
        });
        let suv = Array3::from_shape_fn(shape, |(x, _, _)| 1.0 + x as f32 * 0.5);
        let volumes = PatientVolumes::new(
            Volume::from_array(ct),
            Volume::from_array(suv),
            Volume::from_array(Array3::zeros(shape)),
        )
        .unwrap();
        let config = PipelineConfig {
            sweep: SweepConfig {
                angle_min: 0,
                angle_max: 0,
                crop_left: 0,
                crop_right: 0,
                ..Default::default()
            },
            display_crop: 0,
            ..Default::default()
        };
        let record = PatientRecord::from_layout(dir.path(), "P1", "d1", "NEGATIVE");
        let out = dir.path().join("out");

        let result = process(&config, &record, &volumes, &dir.path().join("ch"), &out).unwrap();
        assert!(matches!(
            result.rendered(),
            Err(PrepError::DegenerateProjection { .. })
        ));
        assert!(!result.is_success());
        assert_eq!(result.channel_files().len(), 8);
        assert!(result.channel_files().iter().all(|p| p.is_file()));

        let cache = out.join("Rotations").join("P1_d1");
        for name in ["SUV_MIP", "SUV_bone", "SEG", "CT_MIP", "CT_air"] {
            assert!(cache.join(name).join("0.npy").is_file(), "{name}");
        }
        assert!(!out.join("Collages").join("NEGATIVE_P1_d1.jpg").exists());
    }
}
