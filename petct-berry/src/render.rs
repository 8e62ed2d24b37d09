//! 单角度的病例可视化: 每个视图生成 14 张投影图, 再拼成对比图与最终拼图.
//!
//! 输出目录结构:
//!
//! ```text
//! <out>/MIPs/<patient>_<date>/coronal/NAME.jpg
//! <out>/MIPs/<patient>_<date>/saggital/NAME.jpg
//! <out>/MIPs/<patient>_<date>/collages/NAME.jpg
//! <out>/Collages/<disease>_<patient>_<date>.jpg
//! ```

use crate::channel::{shifted_for_sum, TissueChannels};
use crate::collage::{grid_from_folder, pair_folders};
use crate::config::PipelineConfig;
use crate::consts::{COLLAGE_COLUMNS, COLLAGE_NAMES, COLLAGE_ROWS, IMAGE_EXT};
use crate::data::{ImgWriteVis, ProjectionImage, Volume};
use crate::dataset::{PatientRecord, PatientVolumes};
use crate::project::{project, project_mask, ProjectionSpec, Statistic, ViewAxis};
use crate::segment::Tissue;
use crate::PrepResult;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// 一次渲染写出的位置.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// 单张投影图所在目录 `<out>/MIPs/<patient>_<date>`.
    pub mip_dir: PathBuf,

    /// 最终拼图文件.
    pub collage: PathBuf,
}

/// 单角度病例渲染器.
///
/// CT 的瘦组织, 脂肪, 空气通道, 病灶区域以及整体 CT 在求和投影前都会减去各自的最小值.
#[derive(Debug)]
pub struct PatientRenderer<'a> {
    config: &'a PipelineConfig,
    suv: &'a Volume,
    suv_channels: &'a TissueChannels,
    seg: &'a Volume,
    suv_lesion: Volume,
    ct: Volume,
    ct_channels: TissueChannels,
    ct_lesion: Volume,
}

impl<'a> PatientRenderer<'a> {
    /// 准备渲染所需的派生体数据. 通道形状与病例形状不一致时返回 `Err`.
    pub fn new(
        config: &'a PipelineConfig,
        volumes: &'a PatientVolumes,
        suv_channels: &'a TissueChannels,
        ct_channels: &TissueChannels,
    ) -> PrepResult<Self> {
        for (_, v) in suv_channels.iter().chain(ct_channels.iter()) {
            volumes.ct.check_shape(v.shape())?;
        }
        Ok(Self {
            config,
            suv: &volumes.suv,
            suv_channels,
            seg: &volumes.seg,
            suv_lesion: volumes.suv.product(&volumes.seg)?,
            ct: volumes.ct.shift_to_min(),
            ct_channels: shifted_for_sum(ct_channels),
            ct_lesion: volumes.ct.product(&volumes.seg)?.shift_to_min(),
        })
    }

    /// 病灶 CT 投影: 重缩放后乘以分割投影, 再翻转.
    fn lesion_ct(&self, view: ViewAxis, statistic: Statistic) -> PrepResult<ProjectionImage> {
        let spec = ProjectionSpec {
            statistic,
            ..ProjectionSpec::ct_sum(self.config.ct_window)
        }
        .rescaled();
        let img = project(self.ct_lesion.data(), view, &spec)?;
        Ok(img.product(&project_mask(self.seg.data(), view))?.inverted())
    }

    /// 生成一个视图下的 14 张投影图, 顺序与 [`COLLAGE_NAMES`] 一致.
    ///
    /// 任何一张图退化 (例如分割为空) 都会使整个视图失败.
    pub fn render_view(&self, view: ViewAxis) -> PrepResult<Vec<(&'static str, ProjectionImage)>> {
        let suv = ProjectionSpec::suv(self.config.suv_window);
        let suv_sum = ProjectionSpec {
            statistic: Statistic::Sum,
            ..suv
        };
        let ct = ProjectionSpec::ct_sum(self.config.ct_window);
        let ct_positive = ct.with_invert(false);

        let suv_of = |t: Tissue| project(self.suv_channels.get(t).data(), view, &suv);
        let ct_of = |t: Tissue, spec: ProjectionSpec| {
            project(self.ct_channels.get(t).data(), view, &spec.rescaled())
        };

        Ok(vec![
            ("MIP_SUV", project(self.suv.data(), view, &suv)?),
            ("MIP_SUV_bone", suv_of(Tissue::Bone)?),
            ("MIP_SUV_lean", suv_of(Tissue::Lean)?),
            ("MIP_SUV_adipose", suv_of(Tissue::Adipose)?),
            ("MIP_SUV_air", suv_of(Tissue::Air)?),
            ("MIP_SUV_SEG", project(self.suv_lesion.data(), view, &suv)?),
            ("SIP_SUV_SEG", project(self.suv_lesion.data(), view, &suv_sum)?),
            ("SIP_CT", project(self.ct.data(), view, &ct_positive)?),
            ("SIP_CT_bone", ct_of(Tissue::Bone, ct)?),
            ("SIP_CT_lean", ct_of(Tissue::Lean, ct)?),
            ("SIP_CT_adipose", ct_of(Tissue::Adipose, ct_positive)?),
            ("SIP_CT_air", ct_of(Tissue::Air, ct)?),
            ("MIP_CT_SEG", self.lesion_ct(view, Statistic::Maximum)?),
            ("SIP_CT_SEG", self.lesion_ct(view, Statistic::Sum)?),
        ])
    }

    /// 渲染所有配置的视图并拼图.
    ///
    /// 同时配置了冠状面与矢状面时, 先把两者同名图像左右拼接, 再由拼接结果组成最终拼图;
    /// 只有一个视图时直接由该视图的图像组成最终拼图.
    pub fn render<P: AsRef<Path>>(
        &self,
        out_root: P,
        record: &PatientRecord,
    ) -> PrepResult<RenderOutput> {
        let out_root = out_root.as_ref();
        let mip_dir = out_root.join("MIPs").join(record.mip_label());
        let crop = self.config.display_crop;

        for &view in &self.config.views {
            let dir = mip_dir.join(view.dir_name());
            fs::create_dir_all(&dir)?;
            for (name, img) in self.render_view(view)? {
                img.save(dir.join(format!("{name}.{IMAGE_EXT}")), crop)?;
            }
            info!("{}: {view} images saved", record.mip_label());
        }

        let views = &self.config.views;
        let both = views.contains(&ViewAxis::Coronal) && views.contains(&ViewAxis::Sagittal);
        let grid_source = if both {
            let collages = mip_dir.join("collages");
            pair_folders(
                mip_dir.join(ViewAxis::Coronal.dir_name()),
                mip_dir.join(ViewAxis::Sagittal.dir_name()),
                &collages,
            )?;
            collages
        } else {
            // `PipelineConfig::validate` 保证至少有一个视图.
            let view = views.first().copied().unwrap_or(ViewAxis::Coronal);
            mip_dir.join(view.dir_name())
        };

        let collage = out_root
            .join("Collages")
            .join(format!("{}.{IMAGE_EXT}", record.collage_label()));
        grid_from_folder(
            &grid_source,
            &COLLAGE_NAMES,
            IMAGE_EXT,
            COLLAGE_COLUMNS,
            COLLAGE_ROWS,
            &collage,
        )?;
        info!("{}: collage saved to {}", record.mip_label(), collage.display());

        Ok(RenderOutput { mip_dir, collage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::extract_all;
    use crate::collage::open_rgb;
    use crate::error::PrepError;
    use crate::segment::segment;
    use ndarray::Array3;

    const SHAPE: (usize, usize, usize) = (12, 10, 8);

    fn volumes(with_lesion: bool) -> PatientVolumes {
        // 每条冠状面和矢状面投影线上各类组织的体素数都随位置变化, 重缩放不会退化.
        let ct = Array3::from_shape_fn(SHAPE, |(x, y, z)| match (x * y + z) % 4 {
            0 => 500.0,
            1 => 40.0,
            2 => -100.0,
            _ => -900.0,
        });
        let suv = Array3::from_shape_fn(SHAPE, |(x, _, _)| 1.0 + x as f32 * 0.5);
        let seg = Array3::from_shape_fn(SHAPE, |(x, y, z)| {
            let inside = (4..7).contains(&x) && (3..6).contains(&y) && (2..5).contains(&z);
            if with_lesion && inside {
                2.0
            } else {
                0.0
            }
        });
        PatientVolumes::new(
            Volume::from_array(ct),
            Volume::from_array(suv),
            Volume::from_array(seg),
        )
        .unwrap()
    }

    fn channels(v: &PatientVolumes, config: &PipelineConfig) -> (TissueChannels, TissueChannels) {
        let masks = segment(&v.ct, &config.thresholds);
        (
            extract_all(&v.suv, &masks).unwrap(),
            extract_all(&v.ct, &masks).unwrap(),
        )
    }

    #[test]
    fn test_render_view_names_and_values() {
        let config = PipelineConfig::default();
        let v = volumes(true);
        let (suv_ch, ct_ch) = channels(&v, &config);
        let r = PatientRenderer::new(&config, &v, &suv_ch, &ct_ch).unwrap();

        let images = r.render_view(ViewAxis::Coronal).unwrap();
        let names = images.iter().map(|(n, _)| *n).collect::<Vec<_>>();
        assert_eq!(names, COLLAGE_NAMES);
        for (name, img) in &images {
            assert_eq!(img.shape(), (8, 12), "{name}");
            let (min, max) = (img.min().unwrap(), img.max().unwrap());
            assert!(min >= 0.0 && max <= 1.0 + 1e-12, "{name}");
        }
        // 整体 CT 不翻转: 最大值为 1.
        assert_eq!(images[7].1.max(), Some(1.0));
        // 负片图像的最小值为 0.
        assert_eq!(images[0].1.min(), Some(0.0));

        let sagittal = r.render_view(ViewAxis::Sagittal).unwrap();
        assert_eq!(sagittal[0].1.shape(), (8, 10));
    }

    #[test]
    fn test_empty_lesion_is_degenerate() {
        let config = PipelineConfig::default();
        let v = volumes(false);
        let (suv_ch, ct_ch) = channels(&v, &config);
        let r = PatientRenderer::new(&config, &v, &suv_ch, &ct_ch).unwrap();
        assert!(matches!(
            r.render_view(ViewAxis::Coronal),
            Err(PrepError::DegenerateProjection { .. })
        ));
    }

    #[test]
    fn test_render_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            display_crop: 2,
            ..Default::default()
        };
        let v = volumes(true);
        let (suv_ch, ct_ch) = channels(&v, &config);
        let record = PatientRecord::from_layout(dir.path(), "P1", "d1", "LYMPHOMA");
        let out = PatientRenderer::new(&config, &v, &suv_ch, &ct_ch)
            .unwrap()
            .render(dir.path().join("out"), &record)
            .unwrap();

        assert_eq!(out.mip_dir, dir.path().join("out").join("MIPs").join("P1_d1"));
        for sub in ["coronal", "saggital", "collages"] {
            for name in COLLAGE_NAMES {
                assert!(out.mip_dir.join(sub).join(format!("{name}.jpg")).is_file());
            }
        }
        // 冠状面 12 - 4 列, 矢状面 10 - 4 列; 对比图宽为冠状面的两倍.
        let pair = open_rgb(out.mip_dir.join("collages").join("SIP_CT.jpg")).unwrap();
        assert_eq!(pair.dimensions(), (16, 8));

        assert_eq!(
            out.collage,
            dir.path().join("out").join("Collages").join("LYMPHOMA_P1_d1.jpg")
        );
        let grid = open_rgb(&out.collage).unwrap();
        assert_eq!(grid.dimensions(), (16 * 7, 8 * 2));
    }
}
