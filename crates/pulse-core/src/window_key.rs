//! Window key parsing shared by the yield and ROI views
//!
//! Keys look like `7d`, `30d`, `roi_90d`, `24h`, `1y`, or a bare day count.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl WindowUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" | "d" => Some(WindowUnit::Day),
            "h" => Some(WindowUnit::Hour),
            "w" => Some(WindowUnit::Week),
            "m" => Some(WindowUnit::Month),
            "y" => Some(WindowUnit::Year),
            _ => None,
        }
    }

    fn days(self) -> f64 {
        match self {
            WindowUnit::Hour => 1.0 / 24.0,
            WindowUnit::Day => 1.0,
            WindowUnit::Week => 7.0,
            WindowUnit::Month => 30.0,
            WindowUnit::Year => 365.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            WindowUnit::Hour => "hour",
            WindowUnit::Day => "day",
            WindowUnit::Week => "week",
            WindowUnit::Month => "month",
            WindowUnit::Year => "year",
        }
    }
}

/// A recognized `<integer><unit>` window key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub count: u32,
    pub unit: WindowUnit,
}

impl WindowSpan {
    pub fn days(self) -> f64 {
        f64::from(self.count) * self.unit.days()
    }

    pub fn label(self) -> String {
        if self.count == 1 {
            format!("1 {}", self.unit.name())
        } else {
            format!("{} {}s", self.count, self.unit.name())
        }
    }
}

/// Parse a window key, ignoring an optional `roi_` prefix.
pub fn parse_window_key(key: &str) -> Option<WindowSpan> {
    let trimmed = key.trim().to_ascii_lowercase();
    let body = trimmed.strip_prefix("roi_").unwrap_or(&trimmed);

    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if digits_end == 0 {
        return None;
    }

    let count: u32 = body[..digits_end].parse().ok()?;
    let unit = WindowUnit::from_suffix(&body[digits_end..])?;
    Some(WindowSpan { count, unit })
}

/// Display label for a window key; unrecognized keys pass through unchanged.
pub fn format_window_label(key: &str) -> String {
    parse_window_key(key)
        .map(WindowSpan::label)
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_key() {
        assert_eq!(
            parse_window_key("30d"),
            Some(WindowSpan { count: 30, unit: WindowUnit::Day })
        );
        assert_eq!(
            parse_window_key("roi_7d"),
            Some(WindowSpan { count: 7, unit: WindowUnit::Day })
        );
        assert_eq!(
            parse_window_key("90"),
            Some(WindowSpan { count: 90, unit: WindowUnit::Day })
        );
        assert_eq!(parse_window_key("1Y").map(WindowSpan::days), Some(365.0));
        assert_eq!(parse_window_key("all"), None);
        assert_eq!(parse_window_key("d7"), None);
        assert_eq!(parse_window_key("7days"), None);
        assert_eq!(parse_window_key(""), None);
    }

    #[test]
    fn test_format_window_label() {
        assert_eq!(format_window_label("7d"), "7 days");
        assert_eq!(format_window_label("1d"), "1 day");
        assert_eq!(format_window_label("24h"), "24 hours");
        assert_eq!(format_window_label("since_inception"), "since_inception");
    }
}
