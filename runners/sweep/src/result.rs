//! 运行结果.

use petct_berry::render::RenderOutput;
use petct_berry::sweep::SweepReport;
use petct_berry::PrepResult;
use std::io::{self, Write};
use std::path::PathBuf;

/// 将一次旋转扫描的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, r: &SweepReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn angles_to_display(a: &[i32]) -> String {
        match (a.first(), a.last()) {
            (Some(lo), Some(hi)) => format!("{} ({lo}..={hi})", a.len()),
            _ => "0".to_string(),
        }
    }

    writeln!(w, "Sweep `{name}`:")?;
    writeln!(w, "{S4}Computed: {}", angles_to_display(&r.computed))?;
    writeln!(w, "{S4}Repaired: {}", angles_to_display(&r.repaired))?;
    writeln!(w, "{S4}Skipped: {}", angles_to_display(&r.skipped))?;
    writeln!(w, "{S4}Cancelled: {}", angles_to_display(&r.cancelled))?;
    write!(w, "{S4}Failed: {}", r.failed.len())?;
    for (angle, e) in &r.failed {
        write!(w, "\n{S4}{S4}{angle}: {e}")?;
    }
    Ok(())
}

/// 单个病例的最终结果.
pub struct RunResult {
    label: String,
    channel_files: Vec<PathBuf>,
    rendered: PrepResult<RenderOutput>,
    sweeps: Vec<(&'static str, SweepReport)>,
}

impl RunResult {
    pub fn new<I: IntoIterator<Item = (&'static str, SweepReport)>>(
        label: String,
        channel_files: Vec<PathBuf>,
        rendered: PrepResult<RenderOutput>,
        sweeps: I,
    ) -> Self {
        Self {
            label,
            channel_files,
            rendered,
            sweeps: sweeps.into_iter().collect(),
        }
    }

    /// 写出的通道文件.
    #[inline]
    pub fn channel_files(&self) -> &[PathBuf] {
        &self.channel_files
    }

    /// 单角度可视化的结果.
    #[inline]
    pub fn rendered(&self) -> &PrepResult<RenderOutput> {
        &self.rendered
    }

    /// 可视化成功, 且所有扫描都没有失败的角度.
    pub fn is_success(&self) -> bool {
        self.rendered.is_ok() && self.sweeps.iter().all(|(_, r)| r.is_success())
    }

    /// 输出运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        utils::sep_to(&mut out)?;
        writeln!(out, "Patient `{}`:", self.label)?;
        writeln!(out, "    Channel files: {}", self.channel_files().len())?;
        match self.rendered() {
            Ok(r) => {
                writeln!(out, "    Images: {}", r.mip_dir.display())?;
                writeln!(out, "    Collage: {}", r.collage.display())?;
            }
            Err(e) => writeln!(out, "    Render failed: {e}")?,
        }
        utils::sep_to(&mut out)?;

        for (name, report) in &self.sweeps {
            describe_into(name, report, &mut out)?;
            writeln!(out)?;
            utils::sep_to(&mut out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let report = SweepReport {
            computed: vec![-2, -1, 0],
            skipped: vec![1, 2],
            ..Default::default()
        };
        let mut buf = vec![];
        describe_into("SUV", &report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Sweep `SUV`:"));
        assert!(text.contains("Computed: 3 (-2..=0)"));
        assert!(text.contains("Repaired: 0"));
        assert!(text.ends_with("Failed: 0"));
    }
}
