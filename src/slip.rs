use std::fmt;

use chrono::{Local, TimeZone};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime;
use crate::duration::Duration;
use crate::error::SlipError;

/// 新しいタイムスリップの説明文。
pub const DEFAULT_DESCRIPTION: &str = "New Timeslip";

/// プロジェクト名とタスク名の区切り文字。
pub const NAME_SEPARATOR: char = '.';

/// タイムスリップの状態。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Started,
    Paused,
    Resumed,
    #[default]
    Completed,
}

impl Status {
    /// 作業時間が加算され続けている状態かどうかを返す。
    pub fn is_running(self) -> bool {
        match self {
            Status::Started | Status::Resumed => true,
            Status::Paused | Status::Completed => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Started => "started",
            Status::Paused => "paused",
            Status::Resumed => "resumed",
            Status::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// プロジェクト・タスクに対する1回分の作業記録。
///
/// 時刻は全てUNIX時間(秒)で保持する。`finished`が0の間は未完了を表す。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slip {
    pub project: String,
    pub task: String,
    pub description: String,
    pub started: i64,
    pub worked: i64,
    pub finished: i64,
    pub modified: i64,
    pub status: Status,
    pub uuid: String,
}

impl Slip {
    /// 新しい`Slip`を返す。
    ///
    /// # Arguments
    ///
    /// * `name` - `Project`もしくは`Project.Task`形式の名前
    pub fn new(name: &str) -> Result<Self, SlipError> {
        let (project, task) = parse_name(name)?;
        let now = datetime::unix_now();

        Ok(Self {
            project,
            task,
            description: DEFAULT_DESCRIPTION.to_string(),
            started: now,
            worked: 0,
            finished: 0,
            modified: now,
            status: Status::Started,
            uuid: Uuid::new_v4().to_string(),
        })
    }

    /// JSON形式の記録から`Slip`を復元する。
    pub fn from_json(data: &[u8]) -> Result<Self, SlipError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_json(&self) -> Result<String, SlipError> {
        Ok(serde_json::to_string(self)?)
    }

    /// `Project.Task`形式の名前を返す。タスクが無い場合はプロジェクト名のみ。
    pub fn name(&self) -> String {
        if self.task.is_empty() {
            self.project.clone()
        } else {
            format!("{}{}{}", self.project, NAME_SEPARATOR, self.task)
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn pause(&mut self) -> Result<(), SlipError> {
        match self.status {
            Status::Paused => return Err(SlipError::AlreadyPaused),
            Status::Completed => return Err(SlipError::AlreadyCompleted),
            Status::Started | Status::Resumed => {}
        }

        let now = datetime::unix_now();
        self.worked += now - self.modified;
        self.modified = now;
        self.status = Status::Paused;
        debug!("Paused {} with {}s worked", self.name(), self.worked);

        Ok(())
    }

    /// 一時停止中のタイムスリップを再開する。再開時に作業時間は加算しない。
    pub fn resume(&mut self) -> Result<(), SlipError> {
        match self.status {
            Status::Started | Status::Resumed => return Err(SlipError::AlreadyRunning),
            Status::Completed => return Err(SlipError::AlreadyCompleted),
            Status::Paused => {}
        }

        self.modified = datetime::unix_now();
        self.status = Status::Resumed;
        debug!("Resumed {}", self.name());

        Ok(())
    }

    /// 一時停止中のタイムスリップの作業時間を増減する。
    ///
    /// 開始・更新時刻が未来にならないように、調整できる側の時刻を動かす。
    /// 作業時間が負になる場合は0にする。
    ///
    /// # Arguments
    ///
    /// * `delta` - 増減する時間
    pub fn adjust(&mut self, delta: &Duration) -> Result<(), SlipError> {
        match self.status {
            Status::Completed => return Err(SlipError::AlreadyCompleted),
            Status::Started | Status::Resumed => return Err(SlipError::NotPaused),
            Status::Paused => {}
        }

        let delta = delta.to_seconds();
        let worked = self
            .worked
            .checked_add(delta)
            .ok_or(SlipError::InvalidNumber)?;
        if worked < 0 {
            self.worked = 0;
            debug!("Adjusted {} below zero, worked time cleared", self.name());
            return Ok(());
        }

        let now = datetime::unix_now();
        let candidate = self
            .started
            .checked_add(worked)
            .ok_or(SlipError::InvalidNumber)?;
        if self.modified < candidate && candidate <= now {
            self.modified = candidate;
        } else if candidate > now && delta > 0 {
            self.started = self
                .started
                .checked_sub(delta)
                .ok_or(SlipError::InvalidNumber)?;
        }
        self.worked = worked;
        debug!("Adjusted {} by {}s to {}s worked", self.name(), delta, worked);

        Ok(())
    }

    /// タイムスリップを完了させる。
    ///
    /// # Arguments
    ///
    /// * `description` - 作業内容の説明
    pub fn done(&mut self, description: &str) -> Result<(), SlipError> {
        let now = datetime::unix_now();

        match self.status {
            Status::Completed => return Err(SlipError::AlreadyCompleted),
            Status::Started | Status::Resumed => {
                self.worked += now - self.modified;
                self.finished = now;
                self.modified = now;
            }
            Status::Paused => {
                self.finished = self.modified;
                self.modified = now;
            }
        }

        self.description = description.to_string();
        self.status = Status::Completed;
        debug!("Completed {} with {}s worked", self.name(), self.worked);

        Ok(())
    }

    /// 現時点までの作業時間(秒)を返す。
    ///
    /// 作業中であれば最後の更新から経過した時間も含める。
    pub fn total_time_worked(&self) -> i64 {
        if self.is_running() {
            self.worked + (datetime::unix_now() - self.modified)
        } else {
            self.worked
        }
    }
}

impl fmt::Display for Slip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Started: {} | Worked: {} | Status: {}",
            self.name(),
            format_timestamp(self.started),
            Duration::from_seconds(self.total_time_worked()),
            self.status
        )?;
        if self.status == Status::Paused {
            write!(f, " ({})", format_timestamp(self.modified))?;
        }
        Ok(())
    }
}

/// `Project.Task`形式の名前をプロジェクト名とタスク名に分割する。
pub fn parse_name(name: &str) -> Result<(String, String), SlipError> {
    let names: Vec<&str> = name.split(NAME_SEPARATOR).collect();

    match names.as_slice() {
        [project] if !project.is_empty() => Ok((project.to_string(), String::new())),
        [project, task] if !project.is_empty() => Ok((project.to_string(), task.to_string())),
        _ => Err(SlipError::InvalidName),
    }
}

fn format_timestamp(seconds: i64) -> String {
    Local
        .timestamp_opt(seconds, 0)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
