use chrono::{NaiveDate, NaiveDateTime};

use crate::ValidationError;

/// ISO calendar format used for every CSV written by brentscope.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date layouts seen in published Brent price files, tried in order.
///
/// Two-digit years resolve into 1970..=2069.
const DATE_FORMATS: &[&str] = &[
    ISO_DATE_FORMAT,
    "%d-%b-%y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date in any of the supported layouts.
pub fn parse_market_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidDate {
            value: input.to_owned(),
        });
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }

    // World Bank annual observations are dated by year only.
    if trimmed.len() == 4 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        if let Some(date) = trimmed
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        {
            return Ok(date);
        }
    }

    Err(ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_brent_file_layouts() {
        assert_eq!(parse_market_date("20-May-87").expect("dd-Mon-yy"), ymd(1987, 5, 20));
        assert_eq!(parse_market_date("Apr 22, 2020").expect("Mon dd, yyyy"), ymd(2020, 4, 22));
        assert_eq!(parse_market_date("2020-01-02").expect("iso"), ymd(2020, 1, 2));
        assert_eq!(parse_market_date("05/20/1987").expect("us"), ymd(1987, 5, 20));
        assert_eq!(
            parse_market_date("2020-01-02 00:00:00").expect("datetime"),
            ymd(2020, 1, 2)
        );
    }

    #[test]
    fn two_digit_years_cover_the_brent_history() {
        assert_eq!(parse_market_date("01-Jan-87").expect("1987").year(), 1987);
        assert_eq!(parse_market_date("14-Nov-22").expect("2022").year(), 2022);
    }

    #[test]
    fn year_only_maps_to_first_of_january() {
        assert_eq!(parse_market_date("1999").expect("year"), ymd(1999, 1, 1));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_market_date("not a date"),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(parse_market_date("  ").is_err());
        assert!(parse_market_date("2020-02-30").is_err());
    }
}
