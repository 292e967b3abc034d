use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};

use crate::datetime;
use crate::period::Period;
use crate::report::Report;
use crate::slip::Slip;
use crate::store::RecordStore;

/// `report`と`agenda`サブコマンドの引数。
#[derive(Debug, Default, clap::Args)]
pub struct ReportArgs {
    #[clap(
        short = 'p',
        long = "period",
        default_value = "",
        help = "Time period: t, w, m, y, 1d, 1w, 1m, 1y or Nd (all timeslips when omitted)"
    )]
    period: String,

    #[clap(help = "Project name (all projects when omitted)")]
    project: Option<String>,
}

pub struct ReportCommand<'a, S: RecordStore> {
    store: &'a S,
}

impl<'a, S: RecordStore> ReportCommand<'a, S> {
    /// 新しい`ReportCommand`を返す。
    ///
    /// # Arguments
    /// * `store` - タイムスリップの記録を読み込むストア
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// レポートを作成する。
    ///
    /// プロジェクトが指定されていない場合は全てのプロジェクトを集計する。
    /// 作業中のタイムスリップがあれば、その時点までの作業時間を加算する。
    ///
    /// # Arguments
    ///
    /// * `args` - `report`サブコマンドの引数
    pub fn run(&self, args: ReportArgs) -> Result<Report> {
        let period = Period::resolve(&args.period, datetime::now());
        info!(
            "Period: '{}', From: {}, To: {}",
            period.label(),
            period.from(),
            period.to()
        );

        let mut report = match &args.project {
            Some(name) => {
                let key = self
                    .store
                    .resolve_project_store(name)?
                    .ok_or_else(|| anyhow!("project file not found: {}", name))?;
                let mut report = Report::for_project(period);
                self.add_project(&mut report, &key)?;
                report
            }
            None => {
                let mut report = Report::new(period);
                for key in self.store.list_project_stores()? {
                    self.add_project(&mut report, &key)?;
                }
                report
            }
        };

        if let Some(slip) = self.pending_slip() {
            report.merge_pending(&slip);
        }

        Ok(report)
    }

    fn add_project(&self, report: &mut Report, key: &str) -> Result<()> {
        let records = self.store.read_project_store(key)?;
        report
            .add_project(key, Cursor::new(records))
            .with_context(|| format!("Failed to process project file: {}", key))
    }

    /// レポート用に作業中のタイムスリップを読み込む。読み込めない場合はレポートに含めない。
    fn pending_slip(&self) -> Option<Slip> {
        let record = match self.store.read_pending() {
            Ok(record) => record?,
            Err(err) => {
                warn!("Failed to read pending timeslip: {:#}", err);
                return None;
            }
        };

        match Slip::from_json(record.as_bytes()) {
            Ok(slip) => Some(slip),
            Err(err) => {
                warn!("Ignoring unreadable pending timeslip: {}", err);
                None
            }
        }
    }
}
