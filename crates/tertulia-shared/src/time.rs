use chrono::{DateTime, TimeZone, Utc};

/// `HH:MM` label shown next to messages and conversation list entries.
pub fn clock_label<Tz: TimeZone>(date: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.with_timezone(tz).format("%H:%M").to_string()
}

/// Same label for an optional timestamp; entries without a date show nothing.
pub fn optional_clock_label<Tz: TimeZone>(date: Option<&DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.map(|d| clock_label(d, tz)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn formats_in_the_given_zone() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 21, 7, 0).unwrap();
        assert_eq!(clock_label(&date, &Utc), "21:07");
        let madrid = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(clock_label(&date, &madrid), "23:07");
        assert_eq!(optional_clock_label(None, &Utc), "");
    }
}
