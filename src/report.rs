use std::io::BufRead;

use anyhow::Result;
use log::{debug, info};

use crate::period::Period;
use crate::project::ProjectSummary;
use crate::slip::Slip;

/// 1つもしくは全てのプロジェクトの集計結果。
#[derive(Debug)]
pub struct Report {
    period: Period,
    single_project: bool,
    projects: Vec<ProjectSummary>,
}

impl Report {
    /// 全プロジェクトを対象とした空の`Report`を返す。
    pub fn new(period: Period) -> Self {
        Self {
            period,
            single_project: false,
            projects: Vec::new(),
        }
    }

    /// 1つのプロジェクトのタスク一覧を対象とした空の`Report`を返す。
    pub fn for_project(period: Period) -> Self {
        Self {
            single_project: true,
            ..Self::new(period)
        }
    }

    /// プロジェクトの記録を集計して追加する。
    ///
    /// # Arguments
    ///
    /// * `name` - 記録にプロジェクト名が無い場合に使う名前
    /// * `reader` - プロジェクトの記録
    pub fn add_project<R: BufRead>(&mut self, name: &str, reader: R) -> Result<()> {
        let mut summary = ProjectSummary::scan(&self.period, reader)?;
        summary.set_name_if_empty(name);
        info!(
            "Project '{}' processed with {}s worked",
            summary.name(),
            summary.total_worked()
        );

        self.projects.push(summary);
        Ok(())
    }

    /// 作業中のタイムスリップを該当するプロジェクトに加算する。
    ///
    /// 集計期間に含まれない場合は加算しない。全プロジェクトのレポートで該当する
    /// プロジェクトが無い場合は、新しいプロジェクトとして追加する。
    pub fn merge_pending(&mut self, slip: &Slip) {
        if !self.period.contains(slip.started, 0) {
            debug!("Pending timeslip is outside of the report period");
            return;
        }

        let matched = self.projects.iter_mut().find(|p| p.name() == slip.project);
        if let Some(summary) = matched {
            summary.add_pending(slip);
        } else if !self.single_project {
            let mut summary = ProjectSummary::default();
            summary.add_pending(slip);
            self.projects.push(summary);
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn is_single_project(&self) -> bool {
        self.single_project
    }

    /// プロジェクト名の大文字小文字を区別せずに並べたプロジェクトを返す。
    pub fn projects(&self) -> Vec<&ProjectSummary> {
        let mut projects: Vec<&ProjectSummary> = self.projects.iter().collect();
        projects.sort_by_key(|p| p.name().to_lowercase());
        projects
    }

    /// 作業中のタイムスリップを含めた全プロジェクトの合計作業時間(秒)。
    pub fn total_worked(&self) -> i64 {
        self.projects.iter().map(ProjectSummary::total_worked).sum()
    }

    pub fn has_scan_errors(&self) -> bool {
        self.projects.iter().any(|p| !p.scan_errors().is_empty())
    }
}
