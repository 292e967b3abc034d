use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::error::SlipError;
use crate::period::Period;
use crate::slip::Slip;

/// プロジェクト内の1回分の作業。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskEntry {
    pub name: String,
    pub project: String,
    pub started: i64,
    pub finished: i64,
    pub worked: i64,
}

impl TaskEntry {
    /// 記録されている作業時間で`TaskEntry`を作成する。
    pub fn from_slip(slip: &Slip) -> Self {
        Self {
            name: slip.task.clone(),
            project: slip.project.clone(),
            started: slip.started,
            finished: slip.finished,
            worked: slip.worked,
        }
    }

    /// 表示用の名前。タスク名が無い場合はプロジェクト名を使う。
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.project
        } else {
            &self.name
        }
    }

    fn key(&self) -> String {
        format!("{}_{}", self.name, self.started)
    }
}

/// 読み込めなかった記録。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub record: String,
}

/// 1つのプロジェクトの集計結果。
#[derive(Debug, Default)]
pub struct ProjectSummary {
    name: String,
    tasks: HashMap<String, TaskEntry>,
    pending: Option<TaskEntry>,
    total_worked: i64,
    scan_errors: Vec<ScanError>,
}

impl ProjectSummary {
    /// 記録を1行ずつ読み込み、期間内のタスクを集計する。
    ///
    /// 読み込めない記録は`scan_errors`に保存し、残りの記録の集計を続ける。
    /// 読み込み自体のエラーのみを返す。
    ///
    /// # Arguments
    ///
    /// * `period` - 集計期間
    /// * `reader` - 1行に1つのJSON記録を持つ入力
    pub fn scan<R: BufRead>(period: &Period, reader: R) -> Result<Self> {
        let mut summary = Self::default();

        for line in reader.lines() {
            let line = line.context("Failed to read timeslip record")?;
            if line.trim().is_empty() {
                continue;
            }

            if let Err(err) = summary.admit(period, &line) {
                warn!("Skipping malformed timeslip record: {}", err);
                summary.scan_errors.push(ScanError {
                    message: err.to_string(),
                    record: line,
                });
            }
        }
        debug!(
            "Scanned project '{}': {} tasks, {}s worked",
            summary.name,
            summary.tasks.len(),
            summary.total_worked
        );

        Ok(summary)
    }

    /// 同じタスク名でも開始時刻ごとに別のタスクとして扱う。
    fn admit(&mut self, period: &Period, record: &str) -> Result<(), SlipError> {
        let slip = Slip::from_json(record.as_bytes())?;
        let task = TaskEntry::from_slip(&slip);

        if self.name.is_empty() {
            self.name = task.project.clone();
        }

        if !period.contains(task.started, task.finished) {
            return Ok(());
        }

        self.total_worked += task.worked;
        self.tasks.insert(task.key(), task);

        Ok(())
    }

    /// 作業中のタイムスリップを加算する。作業時間は現時点までの合計を使う。
    pub fn add_pending(&mut self, slip: &Slip) {
        if self.name.is_empty() {
            self.name = slip.project.clone();
        }

        let mut task = TaskEntry::from_slip(slip);
        task.worked = slip.total_time_worked();
        self.total_worked += task.worked;
        self.pending = Some(task);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name_if_empty(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
    }

    /// 作業中のタイムスリップを含めた合計作業時間(秒)。
    pub fn total_worked(&self) -> i64 {
        self.total_worked
    }

    pub fn pending(&self) -> Option<&TaskEntry> {
        self.pending.as_ref()
    }

    pub fn scan_errors(&self) -> &[ScanError] {
        &self.scan_errors
    }

    /// 開始時刻順に並べたタスクを返す。
    pub fn tasks_by_start(&self) -> Vec<&TaskEntry> {
        let mut tasks: Vec<&TaskEntry> = self.tasks.values().collect();
        tasks.sort_by(|a, b| a.started.cmp(&b.started).then_with(|| a.name.cmp(&b.name)));
        tasks
    }

    /// タスク名ごとの合計作業時間を名前順で返す。
    pub fn task_totals(&self) -> Vec<(String, i64)> {
        let totals = self
            .tasks
            .values()
            .fold(HashMap::<&str, i64>::new(), |mut acc, task| {
                *acc.entry(task.label()).or_insert(0) += task.worked;
                acc
            });

        let mut totals: Vec<(String, i64)> = totals
            .into_iter()
            .map(|(name, worked)| (name.to_string(), worked))
            .collect();
        totals.sort_by(|a, b| a.0.cmp(&b.0));
        totals
    }
}
