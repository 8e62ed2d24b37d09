//! 通用 PET/CT 病例加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use crate::data::Volume;
use crate::PrepResult;
use std::path::{Path, PathBuf};

/// 分割文件名.
pub const SEG_FILE_NAME: &str = "SEG.nii.gz";

/// 单个病例 (病人 + 检查日期) 的元信息与源文件路径.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    /// 病人编号.
    pub patient_id: String,

    /// 检查日期.
    pub scan_date: String,

    /// 诊断类别.
    pub disease_type: String,

    /// CT 文件.
    pub ct: PathBuf,

    /// PET (SUV) 文件.
    pub suv: PathBuf,

    /// 病灶分割文件.
    pub seg: PathBuf,
}

impl PatientRecord {
    /// 按照 `<root>/<patient_id>/<scan_date>/{CTres,SUV,SEG}.nii.gz` 的目录约定创建记录.
    pub fn from_layout<P: AsRef<Path>>(
        root: P,
        patient_id: &str,
        scan_date: &str,
        disease_type: &str,
    ) -> Self {
        let dir = root.as_ref().join(patient_id).join(scan_date);
        Self {
            patient_id: patient_id.to_string(),
            scan_date: scan_date.to_string(),
            disease_type: disease_type.to_string(),
            ct: dir.join(super::Modality::Ct.file_name()),
            suv: dir.join(super::Modality::Suv.file_name()),
            seg: dir.join(SEG_FILE_NAME),
        }
    }

    /// `{patient_id}_{scan_date}`, 用作单角度图像目录名.
    pub fn mip_label(&self) -> String {
        format!("{}_{}", self.patient_id, self.scan_date)
    }

    /// `{disease_type}_{patient_id}_{scan_date}`, 用作最终拼图文件名.
    pub fn collage_label(&self) -> String {
        format!("{}_{}_{}", self.disease_type, self.patient_id, self.scan_date)
    }
}

/// 一个病例的三份体数据. 形状一致, 分割已二值化为 {0, 1}.
#[derive(Debug, Clone)]
pub struct PatientVolumes {
    /// CT (HU).
    pub ct: Volume,

    /// PET (SUV).
    pub suv: Volume,

    /// 病灶分割.
    pub seg: Volume,
}

impl PatientVolumes {
    /// 直接组装, 并检查三者形状一致.
    pub fn new(ct: Volume, suv: Volume, seg: Volume) -> PrepResult<Self> {
        ct.check_shape(suv.shape())?;
        ct.check_shape(seg.shape())?;
        Ok(Self {
            ct,
            suv,
            seg: seg.binarized(),
        })
    }

    /// 读取 `record` 指向的三个文件.
    pub fn open(record: &PatientRecord) -> PrepResult<Self> {
        Self::new(
            Volume::open(&record.ct)?,
            Volume::open(&record.suv)?,
            Volume::open(&record.seg)?,
        )
    }

    /// 获取公共形状.
    #[inline]
    pub fn shape(&self) -> crate::Idx3d {
        self.ct.shape()
    }
}

/// 从病例记录创建加载器. 体数据在迭代时才读取.
pub fn patient_loader<I: IntoIterator<Item = PatientRecord>>(records: I) -> PatientLoader {
    let mut data: Vec<PatientRecord> = records.into_iter().collect();
    data.reverse();
    PatientLoader { data_rev: data }
}

/// PET/CT 病例加载器.
#[derive(Debug)]
pub struct PatientLoader {
    data_rev: Vec<PatientRecord>,
}

impl Iterator for PatientLoader {
    type Item = (PatientRecord, PrepResult<PatientVolumes>);

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.data_rev.pop()?;
        let data = PatientVolumes::open(&record);
        Some((record, data))
    }
}

impl ExactSizeIterator for PatientLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrepError;
    use ndarray::Array3;
    use std::fs;

    #[test]
    fn test_record_labels() {
        let r = PatientRecord::from_layout("/data", "PETCT_0a1", "03-2002", "MELANOMA");
        assert_eq!(r.mip_label(), "PETCT_0a1_03-2002");
        assert_eq!(r.collage_label(), "MELANOMA_PETCT_0a1_03-2002");
        assert_eq!(r.ct, Path::new("/data/PETCT_0a1/03-2002/CTres.nii.gz"));
        assert_eq!(r.seg, Path::new("/data/PETCT_0a1/03-2002/SEG.nii.gz"));
    }

    #[test]
    fn test_volumes_shape_check() {
        let v = |shape| Volume::from_array(Array3::from_elem(shape, 2.0));
        let ok = PatientVolumes::new(v((2, 3, 4)), v((2, 3, 4)), v((2, 3, 4))).unwrap();
        assert_eq!(ok.seg.max(), Some(1.0));
        assert!(matches!(
            PatientVolumes::new(v((2, 3, 4)), v((2, 3, 4)), v((2, 3, 5))),
            Err(PrepError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_loader() {
        let dir = tempfile::tempdir().unwrap();
        let good = PatientRecord::from_layout(dir.path(), "A", "d0", "LUNG_CANCER");
        fs::create_dir_all(good.ct.parent().unwrap()).unwrap();
        let vol = Volume::from_array(Array3::from_elem((3, 3, 3), 5.0));
        for p in [&good.ct, &good.suv, &good.seg] {
            vol.save(p).unwrap();
        }
        let missing = PatientRecord::from_layout(dir.path(), "B", "d0", "NEGATIVE");

        let mut loader = patient_loader([good.clone(), missing]);
        assert_eq!(loader.len(), 2);
        let (r, v) = loader.next().unwrap();
        assert_eq!(r, good);
        assert_eq!(v.unwrap().shape(), (3, 3, 3));
        let (_, v) = loader.next().unwrap();
        assert!(v.is_err());
        assert!(loader.next().is_none());
    }
}
