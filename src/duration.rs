use std::fmt;
use std::str::FromStr;

use crate::error::SlipError;

const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_MINUTE: i64 = 60;

/// 符号付きの時間・分・秒で表した作業時間。
///
/// 3つの値は常に同じ符号を持つ。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Duration {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Duration {
    /// 秒数から`Duration`を作成する。
    ///
    /// 負の値の場合は全ての値が負になる。
    pub fn from_seconds(seconds: i64) -> Self {
        let remainder = seconds % SECONDS_PER_HOUR;

        Self {
            hours: seconds / SECONDS_PER_HOUR,
            minutes: remainder / SECONDS_PER_MINUTE,
            seconds: remainder % SECONDS_PER_MINUTE,
        }
    }

    /// 合計の秒数を返す。
    pub fn to_seconds(&self) -> i64 {
        self.hours * SECONDS_PER_HOUR + self.minutes * SECONDS_PER_MINUTE + self.seconds
    }

    pub fn add(&self, other: &Duration) -> Self {
        Self::from_seconds(self.to_seconds() + other.to_seconds())
    }

    pub fn subtract(&self, other: &Duration) -> Self {
        Self::from_seconds(self.to_seconds() - other.to_seconds())
    }
}

impl FromStr for Duration {
    type Err = SlipError;

    /// `-75m`のような1つの単位(`h`, `m`, `s`)を持つ文字列をパースする。
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();

        let units = input.split(' ').count();
        if units != 1 {
            return Err(SlipError::InvalidDurationFormat(units));
        }

        let (value, unit) = match input.char_indices().last() {
            Some((index, unit @ ('h' | 'm' | 's'))) => (&input[..index], unit),
            _ => return Err(SlipError::InvalidTimeUnit(input.to_string())),
        };

        let (negative, digits) = match value.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SlipError::InvalidNumber);
        }
        let amount: i64 = digits.parse().map_err(|_| SlipError::InvalidNumber)?;

        let seconds = match unit {
            'h' => amount.checked_mul(SECONDS_PER_HOUR),
            'm' => amount.checked_mul(SECONDS_PER_MINUTE),
            _ => Some(amount),
        }
        .ok_or(SlipError::InvalidNumber)?;

        Ok(Self::from_seconds(if negative { -seconds } else { seconds }))
    }
}

impl fmt::Display for Duration {
    /// `1h 10m`のように隣り合う2つの単位を優先して表示する。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours != 0 && self.minutes != 0 {
            write!(f, "{}h {}m", self.hours, self.minutes)
        } else if self.minutes != 0 && self.seconds != 0 {
            write!(f, "{}m {}s", self.minutes, self.seconds)
        } else if self.hours != 0 {
            write!(f, "{} hours", self.hours)
        } else if self.minutes != 0 {
            write!(f, "{} minutes", self.minutes)
        } else {
            write!(f, "{} seconds", self.seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Duration;
    use crate::error::SlipError;

    fn duration(hours: i64, minutes: i64, seconds: i64) -> Duration {
        Duration {
            hours,
            minutes,
            seconds,
        }
    }

    #[rstest]
    #[case::positive(7538, duration(2, 5, 38))]
    #[case::negative(-3727, duration(-1, -2, -7))]
    #[case::zero(0, duration(0, 0, 0))]
    fn test_from_seconds(#[case] seconds: i64, #[case] expected: Duration) {
        assert_eq!(Duration::from_seconds(seconds), expected);
    }

    #[rstest]
    #[case::hours("7h", duration(7, 0, 0))]
    #[case::negative_hours("-6h", duration(-6, 0, 0))]
    #[case::minutes("74m", duration(1, 14, 0))]
    #[case::negative_minutes("-81m", duration(-1, -21, 0))]
    #[case::plus_sign("+3727s", duration(1, 2, 7))]
    #[case::negative_seconds("-14592s", duration(-4, -3, -12))]
    #[case::surrounding_whitespace("  30m ", duration(0, 30, 0))]
    fn test_from_str(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(input.parse::<Duration>().unwrap(), expected);
    }

    /// 秒数に変換して戻しても同じ値になることを確認する。
    #[rstest]
    #[case("7h")]
    #[case("-81m")]
    #[case("3727s")]
    fn test_from_str_survives_seconds_conversion(#[case] input: &str) {
        let parsed: Duration = input.parse().unwrap();

        assert_eq!(Duration::from_seconds(parsed.to_seconds()), parsed);
    }

    #[test]
    fn test_from_str_multiple_units() {
        let err = "1h 14m 3s".parse::<Duration>().unwrap_err();

        assert!(matches!(err, SlipError::InvalidDurationFormat(3)));
        assert_eq!(
            err.to_string(),
            "invalid string, expected one time unit, got 3"
        );
    }

    #[test]
    fn test_from_str_missing_unit() {
        let err = "1".parse::<Duration>().unwrap_err();

        assert_eq!(err.to_string(), "invalid time unit, got '1'");
    }

    #[rstest]
    #[case::letters("abcm")]
    #[case::only_unit("h")]
    #[case::double_sign("+-5m")]
    #[case::decimal("1.5h")]
    fn test_from_str_invalid_number(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Duration>(),
            Err(SlipError::InvalidNumber)
        ));
    }

    #[rstest]
    #[case::hours(duration(3, 0, 0), "3 hours")]
    #[case::negative_hours(duration(-1, 0, 0), "-1 hours")]
    #[case::minutes(duration(0, 4, 0), "4 minutes")]
    #[case::negative_minutes(duration(0, -2, 0), "-2 minutes")]
    #[case::seconds(duration(0, 0, 55), "55 seconds")]
    #[case::negative_seconds(duration(0, 0, -20), "-20 seconds")]
    #[case::hours_minutes(duration(2, 4, 0), "2h 4m")]
    #[case::negative_hours_minutes(duration(-1, -23, 0), "-1h -23m")]
    #[case::minutes_seconds(duration(0, 6, 13), "6m 13s")]
    #[case::negative_minutes_seconds(duration(0, -12, -45), "-12m -45s")]
    #[case::hours_seconds(duration(1, 0, 5), "1 hours")]
    fn test_display(#[case] input: Duration, #[case] expected: &str) {
        assert_eq!(input.to_string(), expected);
    }

    #[test]
    fn test_add_and_subtract_renormalise() {
        let worked = duration(0, 50, 0);

        assert_eq!(worked.add(&duration(0, 20, 30)), duration(1, 10, 30));
        assert_eq!(worked.subtract(&duration(1, 0, 0)), duration(0, -10, 0));
    }
}
