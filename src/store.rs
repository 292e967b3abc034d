use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;

const STORE_EXTENSION: &str = "json";

static CAMEL_BOUNDARY: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new("([a-z0-9])([A-Z0-9])"));

/// タイムスリップの記録を保存するためのtrait。
///
/// 作業中のタイムスリップは1つだけ保存でき、完了したタイムスリップはプロジェクトごとに追記していく。
#[cfg_attr(test, automock)]
pub trait RecordStore {
    /// 作業中のタイムスリップが保存されているかを返す。
    fn pending_exists(&self) -> Result<bool>;

    /// 作業中のタイムスリップの記録を返す。保存されていない場合は`None`。
    fn read_pending(&self) -> Result<Option<String>>;

    fn write_pending(&self, record: &str) -> Result<()>;

    fn clear_pending(&self) -> Result<()>;

    /// 完了したタイムスリップをプロジェクトの記録に1行として追記する。
    ///
    /// # Arguments
    ///
    /// * `project` - プロジェクト名
    /// * `record` - 改行を含まない記録
    fn append_completed(&self, project: &str, record: &str) -> Result<()>;

    /// 全てのプロジェクトの記録のキーを名前順で返す。
    fn list_project_stores(&self) -> Result<Vec<String>>;

    /// プロジェクト名から記録のキーを返す。記録が無い場合は`None`。
    fn resolve_project_store(&self, name: &str) -> Result<Option<String>>;

    fn read_project_store(&self, key: &str) -> Result<String>;

    /// 現在のプロジェクト名を返す。設定されていない場合は`None`。
    fn current_project(&self) -> Result<Option<String>>;

    fn set_current_project(&self, name: &str) -> Result<()>;
}

/// ファイルに記録を保存する`RecordStore`。
pub struct FileStore {
    config: Config,
}

impl FileStore {
    /// 新しい`FileStore`を返す。
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn store_path(&self, key: &str) -> PathBuf {
        self.config
            .data_dir()
            .join(format!("{}.{}", key, STORE_EXTENSION))
    }

    /// 空もしくは存在しないファイルは`None`として読み込む。
    fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read file: {}", path.display()))
            }
        }
    }
}

impl RecordStore for FileStore {
    fn pending_exists(&self) -> Result<bool> {
        let path = self.config.pending_path();
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.len() > 0),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read pending file: {}", path.display())),
        }
    }

    fn read_pending(&self) -> Result<Option<String>> {
        Self::read_optional(&self.config.pending_path())
    }

    fn write_pending(&self, record: &str) -> Result<()> {
        let path = self.config.pending_path();
        fs::write(&path, record)
            .with_context(|| format!("Failed to save pending timeslip: {}", path.display()))?;
        debug!("Pending timeslip written to {}", path.display());
        Ok(())
    }

    fn clear_pending(&self) -> Result<()> {
        let path = self.config.pending_path();
        fs::write(&path, "")
            .with_context(|| format!("Failed to clear pending timeslip: {}", path.display()))
    }

    fn append_completed(&self, project: &str, record: &str) -> Result<()> {
        let path = self.store_path(&project_key(project)?);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open project file: {}", path.display()))?;
        writeln!(file, "{}", record.trim_end())
            .with_context(|| format!("Failed to append timeslip to {}", path.display()))?;
        info!("Completed timeslip appended to {}", path.display());
        Ok(())
    }

    fn list_project_stores(&self) -> Result<Vec<String>> {
        let dir = self.config.data_dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to list data directory: {}", dir.display()))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to list data directory: {}", dir.display()))?
                .path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != STORE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();

        Ok(keys)
    }

    fn resolve_project_store(&self, name: &str) -> Result<Option<String>> {
        let key = project_key(name)?;
        Ok(self.store_path(&key).is_file().then_some(key))
    }

    fn read_project_store(&self, key: &str) -> Result<String> {
        let path = self.store_path(key);
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read project file: {}", path.display()))
    }

    fn current_project(&self) -> Result<Option<String>> {
        Ok(Self::read_optional(&self.config.project_path())?
            .map(|project| project.trim().to_string()))
    }

    fn set_current_project(&self, name: &str) -> Result<()> {
        let path = self.config.project_path();
        fs::write(&path, name)
            .with_context(|| format!("Failed to save current project: {}", path.display()))
    }
}

/// プロジェクト名を記録のキー(スネークケース)に変換する。
pub fn project_key(name: &str) -> Result<String> {
    let boundary = CAMEL_BOUNDARY
        .as_ref()
        .map_err(Clone::clone)
        .context("Failed to build project key pattern")?;

    Ok(boundary.replace_all(name, "${1}_${2}").to_lowercase())
}
