use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

/// データディレクトリを上書きする環境変数。
pub const DATA_DIR_ENV: &str = "TIMESLIP_DIR";

const DATA_FOLDER: &str = "time_warrior";
const PENDING_FILENAME: &str = ".pending";
const PROJECT_FILENAME: &str = ".project";

/// タイムスリップを保存するファイルの場所。
#[derive(Clone, Debug)]
pub struct Config {
    data_dir: PathBuf,
}

impl Config {
    /// 環境変数`TIMESLIP_DIR`、もしくはホームディレクトリから`Config`を作成する。
    pub fn from_env() -> Result<Self> {
        let data_dir = match env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Failed to find the home directory")?
                .join(DATA_FOLDER),
        };

        Ok(Self::new(data_dir))
    }

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join(PENDING_FILENAME)
    }

    pub fn project_path(&self) -> PathBuf {
        self.data_dir.join(PROJECT_FILENAME)
    }

    /// データディレクトリと管理用ファイルが無ければ作成する。
    pub fn ensure_layout(&self) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).with_context(|| {
                format!("Failed to create data directory: {}", self.data_dir.display())
            })?;
            info!("Created data directory {}", self.data_dir.display());
        }

        for path in [self.pending_path(), self.project_path()] {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to create data file: {}", path.display()))?;
        }

        Ok(())
    }
}
