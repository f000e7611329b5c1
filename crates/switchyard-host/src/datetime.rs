use std::fmt::{self, Write as _};

use chrono::format::StrftimeItems;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Display preferences of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// e.g. `dd-mm-yyyy`, `mm/dd/yy`
    pub date_format: String,
    /// `12` or `24`
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_time_format() -> String {
    "24".to_string()
}

impl UserProfile {
    pub fn is_12h(&self) -> bool {
        self.time_format.trim() == "12"
    }
}

/// Formats handed to the date-time picker widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsDtFormat {
    pub js_date_format: String,
    pub js_time_format: &'static str,
    pub js_ampm: bool,
}

pub fn js_dt_format(profile: &UserProfile) -> JsDtFormat {
    let date_format = &profile.date_format;
    let js_date_format = if date_format.contains("yyyy") {
        date_format.replace("yyyy", "yy")
    } else {
        date_format.replace("yy", "y")
    };
    JsDtFormat {
        js_date_format,
        js_time_format: if profile.is_12h() {
            "h:mm.ss TT"
        } else {
            "hh:mm:ss"
        },
        js_ampm: profile.is_12h(),
    }
}

/// An hour from `now`, in the user's format, as a hint for manual entry.
pub fn sample_dt(profile: &UserProfile, now: DateTime<Utc>) -> Result<String, fmt::Error> {
    let sample = now + Duration::hours(1);
    let pattern = strftime_pattern(profile);
    let mut out = String::new();
    write!(out, "{}", sample.format_with_items(StrftimeItems::new(&pattern)))?;
    Ok(out)
}

/// Any `%` the user typed stays literal.
fn strftime_pattern(profile: &UserProfile) -> String {
    let date = profile
        .date_format
        .replace('%', "%%")
        .replace("yyyy", "%Y")
        .replace("yy", "%y")
        .replace("dd", "%d")
        .replace("mm", "%m");
    let time = if profile.is_12h() {
        "%I:%M:%S %p"
    } else {
        "%H:%M:%S"
    };
    format!("{date} {time}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile(date_format: &str, time_format: &str) -> UserProfile {
        UserProfile {
            date_format: date_format.to_string(),
            time_format: time_format.to_string(),
        }
    }

    #[test]
    fn four_digit_years_shrink_to_picker_long_year() {
        let format = js_dt_format(&profile("dd-mm-yyyy", "24"));
        assert_eq!(format.js_date_format, "dd-mm-yy");
        assert_eq!(format.js_time_format, "hh:mm:ss");
        assert!(!format.js_ampm);
    }

    #[test]
    fn two_digit_years_shrink_to_picker_short_year() {
        let format = js_dt_format(&profile("mm/dd/yy", "12"));
        assert_eq!(format.js_date_format, "mm/dd/y");
        assert_eq!(format.js_time_format, "h:mm.ss TT");
        assert!(format.js_ampm);
    }

    #[test]
    fn sample_is_one_hour_ahead_in_user_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 15, 0).unwrap();
        assert_eq!(
            sample_dt(&profile("dd-mm-yyyy", "24"), now).unwrap(),
            "10-03-2024 00:15:00"
        );
        assert_eq!(
            sample_dt(&profile("mm/dd/yy", "12"), now).unwrap(),
            "03/10/24 12:15:00 AM"
        );
    }

    #[test]
    fn percent_signs_in_the_format_are_literal() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        assert_eq!(
            sample_dt(&profile("dd-mm-yyyy 100%", "24"), now).unwrap(),
            "09-03-2024 100% 11:00:00"
        );
        assert_eq!(
            sample_dt(&profile("%Q dd", "24"), now).unwrap(),
            "%Q 09 11:00:00"
        );
    }
}
