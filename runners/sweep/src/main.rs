//! PET/CT 病例预处理: 组织分割, 通道提取, 单角度可视化与旋转投影缓存.
//!
//! 用法: `petct-sweep <patient_id> <scan_date> <disease_type> [config.json]`.
//!
//! 目录由环境变量 `$PETCT_DATA_DIR`, `$PETCT_DERIVED_DIR`, `$PETCT_OUT_DIR` 指定,
//! 日志级别由 `$RUST_LOG` 指定.

mod result;
mod runner;

use log::{error, LevelFilter};
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("failed to initialize logger: {e}");
    }

    let Some(args) = runner::RunArgs::from_args(std::env::args()) else {
        eprintln!("usage: petct-sweep <patient_id> <scan_date> <disease_type> [config.json]");
        return ExitCode::from(2);
    };

    match runner::run(&args) {
        Ok(result) => {
            if let Err(e) = result.analyze() {
                error!("failed to print result: {e}");
            }
            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(3)
            }
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
