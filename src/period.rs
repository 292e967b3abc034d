use chrono::{DateTime, Datelike, Days, Duration, Local, NaiveDate, TimeZone};

/// レポートの集計期間を表すコード。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodCode {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Yesterday,
    LastWeek,
    LastMonth,
    LastYear,
    DaysBack(u32),
    Unset,
}

impl PeriodCode {
    /// `t`, `1w`, `3d`のような短いコードをパースする。
    ///
    /// 解釈できないコードは`Unset`になる。
    pub fn parse(code: &str) -> Self {
        match code {
            "t" => PeriodCode::Today,
            "w" => PeriodCode::ThisWeek,
            "m" => PeriodCode::ThisMonth,
            "y" => PeriodCode::ThisYear,
            "1d" => PeriodCode::Yesterday,
            "1w" => PeriodCode::LastWeek,
            "1m" => PeriodCode::LastMonth,
            "1y" => PeriodCode::LastYear,
            other => other
                .strip_suffix('d')
                .and_then(|days| days.parse::<i64>().ok())
                .and_then(|days| u32::try_from(days.unsigned_abs()).ok())
                .map_or(PeriodCode::Unset, PeriodCode::DaysBack),
        }
    }

    fn label(self) -> String {
        match self {
            PeriodCode::Today => "Today".to_string(),
            PeriodCode::ThisWeek => "This Week".to_string(),
            PeriodCode::ThisMonth => "This Month".to_string(),
            PeriodCode::ThisYear => "This Year".to_string(),
            PeriodCode::Yesterday => "Yesterday".to_string(),
            PeriodCode::LastWeek => "Last Week".to_string(),
            PeriodCode::LastMonth => "Last Month".to_string(),
            PeriodCode::LastYear => "Last Year".to_string(),
            PeriodCode::DaysBack(days) => format!("{} days back", days),
            PeriodCode::Unset => String::new(),
        }
    }
}

/// 現在時刻から確定した集計期間。両端を含む。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Period {
    label: String,
    from: DateTime<Local>,
    to: DateTime<Local>,
}

impl Period {
    /// 期間コードと現在時刻から集計期間を求める。
    ///
    /// 週は月曜日から始まる。解釈できないコードは今日の期間を返すが、`is_set`はfalseになる。
    ///
    /// # Arguments
    ///
    /// * `code` - 期間コード
    /// * `now` - 基準となる現在時刻
    pub fn resolve(code: &str, now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        let code = match PeriodCode::parse(code) {
            PeriodCode::DaysBack(days)
                if today.checked_sub_days(Days::new(u64::from(days))).is_none() =>
            {
                PeriodCode::Unset
            }
            code => code,
        };

        let (first, last) = match code {
            PeriodCode::Today | PeriodCode::Unset => (today, today),
            PeriodCode::ThisWeek => week_of(today),
            PeriodCode::ThisMonth => month_of(today),
            PeriodCode::ThisYear => year_of(today),
            PeriodCode::Yesterday => {
                let day = days_before(today, 1);
                (day, day)
            }
            PeriodCode::DaysBack(days) => {
                let day = today
                    .checked_sub_days(Days::new(u64::from(days)))
                    .unwrap_or(today);
                (day, day)
            }
            PeriodCode::LastWeek => week_of(days_before(today, 7)),
            PeriodCode::LastMonth => month_of(days_before(month_of(today).0, 1)),
            PeriodCode::LastYear => year_of(days_before(year_of(today).0, 1)),
        };

        Self {
            label: code.label(),
            from: beginning_of_day(first),
            to: end_of_day(last),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn from(&self) -> DateTime<Local> {
        self.from
    }

    pub fn to(&self) -> DateTime<Local> {
        self.to
    }

    /// 明示的な期間が指定されているかを返す。
    pub fn is_set(&self) -> bool {
        !self.label.is_empty()
    }

    /// 開始・終了時刻(UNIX時間)の記録が期間に含まれるかを返す。
    ///
    /// 期間内に開始した、期間内に終了した、もしくは期間全体にまたがる場合に含まれる。
    /// 終了時刻が0の場合は作業中とみなす。期間が未指定の場合は常に含まれる。
    pub fn contains(&self, started: i64, finished: i64) -> bool {
        if !self.is_set() {
            return true;
        }

        let from = self.from.timestamp();
        let to = self.to.timestamp();

        let started_within = from <= started && started <= to;
        let finished_within = from <= finished && finished <= to;
        let spans = started <= from && (finished == 0 || finished >= to);

        started_within || finished_within || spans
    }

    /// `Jan 2, 2006 to Jan 8, 2006`形式の日付範囲を返す。
    pub fn formatted_dates(&self) -> String {
        let from = self.from.format("%b %-d, %Y").to_string();
        let to = self.to.format("%b %-d, %Y").to_string();

        if from == to {
            from
        } else {
            format!("{} to {}", from, to)
        }
    }
}

fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date - Duration::days(days)
}

fn week_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = days_before(date, i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

fn month_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.map_or(first, |next| days_before(next, 1));
    (first, last)
}

fn year_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_ordinal(1).unwrap_or(date);
    let last = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
    (first, last)
}

fn beginning_of_day(date: NaiveDate) -> DateTime<Local> {
    local_time(date, 0, 0, 0)
}

fn end_of_day(date: NaiveDate) -> DateTime<Local> {
    local_time(date, 23, 59, 59)
}

/// ローカル時刻を求める。夏時間の切り替えで存在しない時刻はUTCとして扱う。
fn local_time(date: NaiveDate, hour: u32, minute: u32, second: u32) -> DateTime<Local> {
    let naive = date.and_hms_opt(hour, minute, second).unwrap_or_default();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}
