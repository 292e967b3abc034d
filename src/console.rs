use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};

use crate::datetime;
use crate::duration::Duration;
use crate::project::{ProjectSummary, TaskEntry};
use crate::report::Report;

const PENDING_SEPARATOR: &str = "-----------";
const TOTAL_SEPARATOR: &str = "===========";
const WORKDAY_START_HOUR: u32 = 9;
const WORKDAY_END_HOUR: u32 = 17;

/// Consoleにレポートを表示するためのtrait。
pub trait ConsolePresenter {
    /// レポートを表示する。
    ///
    /// # Arguments
    ///
    /// * `report` - 表示するレポート
    fn show_report(&mut self, report: &Report) -> Result<()>;
}

/// プロジェクトごと、もしくはタスクごとの作業時間を一覧で表示する。
pub struct ConsoleReportCard<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleReportCard<'a, W> {
    /// 新しい`ConsoleReportCard`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    fn show_projects(&mut self, report: &Report) -> Result<()> {
        let period = report.period();
        if period.is_set() {
            writeln!(
                self.writer,
                "Time Period: {} ({})\n",
                period.label(),
                period.formatted_dates()
            )?;
        }

        for project in report.projects() {
            if project.total_worked() == 0 {
                continue;
            }
            writeln!(
                self.writer,
                "{} : {}",
                format_worked(project.total_worked()),
                project.name()
            )?;
        }

        let pending: Vec<&TaskEntry> = report
            .projects()
            .into_iter()
            .filter_map(ProjectSummary::pending)
            .filter(|task| task.worked > 0)
            .collect();
        if !pending.is_empty() {
            writeln!(self.writer, "{}", PENDING_SEPARATOR)?;
            for task in pending {
                writeln!(
                    self.writer,
                    "{} : {} pending timeslip",
                    format_hours(task.worked),
                    task.project
                )?;
            }
        }

        self.show_total(report.total_worked())
    }

    fn show_project_tasks(&mut self, report: &Report, project: &ProjectSummary) -> Result<()> {
        writeln!(self.writer, "Project Name: {}", project.name())?;
        let period = report.period();
        if period.is_set() {
            writeln!(
                self.writer,
                "Time Period:  {} ({})",
                period.label(),
                period.formatted_dates()
            )?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "Task List")?;

        for task in project.tasks_by_start() {
            writeln!(
                self.writer,
                "{} : {}",
                format_worked(task.worked),
                task.label()
            )?;
        }

        if let Some(task) = project.pending().filter(|task| task.worked > 0) {
            writeln!(self.writer, "{}", PENDING_SEPARATOR)?;
            let name = if task.name.is_empty() {
                String::new()
            } else {
                format!("{} ", task.name)
            };
            writeln!(
                self.writer,
                "{} : {}pending timeslip",
                format_hours(task.worked),
                name
            )?;
        }

        self.show_total(project.total_worked())
    }

    fn show_total(&mut self, total: i64) -> Result<()> {
        writeln!(self.writer, "{}", TOTAL_SEPARATOR)?;
        writeln!(self.writer, "{}", format_hours(total))?;
        Ok(())
    }

    fn show_errors(&mut self, report: &Report) -> Result<()> {
        let projects: Vec<&ProjectSummary> = report
            .projects()
            .into_iter()
            .filter(|p| !p.scan_errors().is_empty())
            .collect();
        let count: usize = projects.iter().map(|p| p.scan_errors().len()).sum();

        writeln!(self.writer)?;
        writeln!(self.writer, "Errors found {}:", count)?;
        for project in projects {
            writeln!(self.writer, "Project: {}:", project.name())?;
            for error in project.scan_errors() {
                writeln!(self.writer, "  > {}", error.message)?;
                writeln!(self.writer, "    {}", error.record)?;
            }
        }
        Ok(())
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleReportCard<'a, W> {
    fn show_report(&mut self, report: &Report) -> Result<()> {
        let projects = report.projects();

        match projects.as_slice() {
            [] => writeln!(self.writer, "No available data.")?,
            [project] if report.is_single_project() => {
                self.show_project_tasks(report, project)?
            }
            _ => self.show_projects(report)?,
        }

        if report.has_scan_errors() {
            self.show_errors(report)?;
        }

        self.writer.flush().context("Failed to write report")
    }
}

/// 作業をMermaidのガントチャートとして表示する。
pub struct ConsoleAgenda<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleAgenda<'a, W> {
    /// 新しい`ConsoleAgenda`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleAgenda<'a, W> {
    /// 日毎に作業日のバーを表示し、その日のタスクを開始時刻順に並べる。
    ///
    /// 未完了のタスクは現在時刻までのバーとして表示する。
    fn show_report(&mut self, report: &Report) -> Result<()> {
        let now = datetime::unix_now();
        let mut days: BTreeMap<NaiveDate, Vec<&TaskEntry>> = BTreeMap::new();
        for project in report.projects() {
            for task in project.tasks_by_start().into_iter().chain(project.pending()) {
                days.entry(local_time(task.started).date_naive())
                    .or_default()
                    .push(task);
            }
        }

        writeln!(self.writer, "```mermaid")?;
        writeln!(self.writer, "gantt")?;
        writeln!(self.writer, "    title Time Tracking Agenda")?;
        writeln!(self.writer, "    dateFormat  YYYY-MM-DD HH:mm")?;
        writeln!(self.writer, "    axisFormat %H:%M")?;

        for (day, mut tasks) in days {
            tasks.sort_by_key(|task| task.started);
            let day_total: i64 = tasks.iter().map(|task| task.worked).sum();

            writeln!(
                self.writer,
                "    Work Day {:.1}h :workday, {}, {}",
                hours(day_total),
                format_minute(workday_time(day, WORKDAY_START_HOUR)),
                format_minute(workday_time(day, WORKDAY_END_HOUR))
            )?;

            for task in tasks {
                let finished = if task.finished == 0 { now } else { task.finished };
                let share = if day_total > 0 {
                    task.worked as f64 / day_total as f64 * 100.0
                } else {
                    0.0
                };
                writeln!(
                    self.writer,
                    "    {label} {:.1}h {:.1}% :{label}, {}, {}",
                    hours(task.worked),
                    share,
                    format_minute(local_time(task.started)),
                    format_minute(local_time(finished)),
                    label = task.label()
                )?;
            }
        }

        writeln!(self.writer, "```")?;
        self.writer.flush().context("Failed to write agenda")
    }
}

/// `%4dh %3dm`形式で表示する。1時間未満の場合は分のみ表示する。
fn format_worked(seconds: i64) -> String {
    let worked = Duration::from_seconds(seconds);
    if worked.hours == 0 {
        format!("     {:4}m", worked.minutes)
    } else {
        format_hours(seconds)
    }
}

fn format_hours(seconds: i64) -> String {
    let worked = Duration::from_seconds(seconds);
    format!("{:4}h {:3}m", worked.hours, worked.minutes)
}

fn hours(seconds: i64) -> f64 {
    seconds as f64 / 3600.0
}

fn local_time(seconds: i64) -> DateTime<Local> {
    Local
        .timestamp_opt(seconds, 0)
        .earliest()
        .unwrap_or_else(datetime::now)
}

fn workday_time(day: NaiveDate, hour: u32) -> DateTime<Local> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&day.and_time(time))
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&day.and_time(time)))
}

fn format_minute(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}
