use chrono::{DateTime, Local};

#[cfg(not(test))]
/// 現在のローカル時間を取得する。
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// 現在時刻をUNIX時間(秒)で取得する。
pub fn unix_now() -> i64 {
    now().timestamp()
}


#[cfg(test)]
pub use mock_datetime::now;

#[cfg(test)]
mod tests {
    use chrono::{Local, SecondsFormat, TimeZone};

    use super::mock_datetime;
    use super::unix_now;

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        mock_datetime::set_mock_time(datetime);

        assert_eq!(mock_datetime::now(), datetime);
        assert_eq!(unix_now(), datetime.timestamp());
    }

    /// UNIX時間で設定したモック時間が秒単位で一致することを確認する。
    #[test]
    fn test_unix_now_with_mock_timestamp() {
        mock_datetime::set_mock_timestamp(1_706_833_230);

        assert_eq!(unix_now(), 1_706_833_230);
    }

    /// モック時間をリセットした時に、現在時間が取得できることを確認する。
    #[test]
    fn test_now_after_clear_mock_time() {
        mock_datetime::set_mock_time(Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        mock_datetime::clear_mock_time();

        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
}
