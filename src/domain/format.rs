// es-ES number, currency and date formatting
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    Short,
    Long,
    Time,
    DateTime,
}

/// Groups the integer digits with '.' the way es-ES does: four-digit
/// numbers stay ungrouped
fn group_digits(digits: &str) -> String {
    if digits.len() < 5 {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Formats `value` with between `min_fraction` and `max_fraction` decimals
pub fn format_number(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    let max_fraction = max_fraction.max(min_fraction);
    let rendered = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rendered.as_str(), ""),
    };

    let mut frac = frac_part.to_string();
    while frac.len() > min_fraction && frac.ends_with('0') {
        frac.pop();
    }

    let negative = value < 0.0 && (int_part.chars().any(|c| c != '0') || frac.chars().any(|c| c != '0'));
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac.is_empty() {
        out.push(',');
        out.push_str(&frac);
    }
    out
}

/// Default locale rendering of a plain number (up to three decimals)
pub fn format_locale(value: f64) -> String {
    format_number(value, 0, 3)
}

pub fn format_integer(value: i64) -> String {
    format_number(value as f64, 0, 0)
}

pub fn format_currency(value: f64, symbol: &str) -> String {
    format!("{}{}", symbol, format_number(value, 2, 2))
}

/// Ratio in 0..1 rendered as a percentage with two decimals
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

pub fn format_fixed(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, value)
}

/// Fixed-point rendering with trailing zeros removed (`67.80` -> `67.8`)
pub fn format_trimmed(value: f64, max_digits: usize) -> String {
    let mut out = format!("{:.*}", max_digits, value);
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    out
}

pub fn format_date(value: NaiveDateTime, style: DateStyle) -> String {
    let date = value.date();
    match style {
        DateStyle::Short => short_date(date),
        DateStyle::Long => format!(
            "{} de {} de {}",
            date.day(),
            MONTHS[date.month0() as usize],
            date.year()
        ),
        DateStyle::Time => value.format("%H:%M").to_string(),
        DateStyle::DateTime => format!("{} {}", short_date(date), value.format("%H:%M")),
    }
}

fn short_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// `DD/MM` axis label
pub fn day_month(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// Spanish relative time ("Hace 5 minutos"); falls back to the short date
/// after a week
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - then).num_milliseconds() as f64;
    let secs = (diff_ms / 1000.0).round();
    let mins = (secs / 60.0).round();
    let hours = (mins / 60.0).round();
    let days = (hours / 24.0).round();

    let plural = |n: f64| if n > 1.0 { "s" } else { "" };
    if secs < 60.0 {
        "Hace unos segundos".to_string()
    } else if mins < 60.0 {
        format!("Hace {} minuto{}", mins, plural(mins))
    } else if hours < 24.0 {
        format!("Hace {} hora{}", hours, plural(hours))
    } else if days < 7.0 {
        format!("Hace {} día{}", days, plural(days))
    } else {
        format_date(then.naive_utc(), DateStyle::Short)
    }
}

/// Truncates to `max` characters and appends "..." when anything was cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_integer(1258), "1258");
        assert_eq!(format_integer(5642), "5642");
        assert_eq!(format_integer(12580), "12.580");
        assert_eq!(format_integer(1234567), "1.234.567");
        assert_eq!(format_integer(-45000), "-45.000");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(157895.5, "$"), "$157.895,50");
        assert_eq!(format_currency(599.99, "$"), "$599,99");
        assert_eq!(format_locale(157895.5), "157.895,5");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(format_percentage(0.0345), "3.45%");
        assert_eq!(format_fixed(3.45, 2), "3.45");
        assert_eq!(format_trimmed(67.8, 2), "67.8");
        assert_eq!(format_trimmed(12.0, 2), "12");
        assert_eq!(format_trimmed(12.346, 2), "12.35");
    }

    #[test]
    fn test_format_date_styles() {
        let value = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap();
        assert_eq!(format_date(value, DateStyle::Short), "5/3/2024");
        assert_eq!(format_date(value, DateStyle::Long), "5 de marzo de 2024");
        assert_eq!(format_date(value, DateStyle::Time), "14:07");
        assert_eq!(format_date(value, DateStyle::DateTime), "5/3/2024 14:07");
        assert_eq!(day_month(value.date()), "05/03");
    }

    #[test]
    fn test_time_ago() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(20), now), "Hace unos segundos");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "Hace 1 minuto");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "Hace 5 minutos");
        assert_eq!(time_ago(now - Duration::hours(3), now), "Hace 3 horas");
        assert_eq!(time_ago(now - Duration::days(2), now), "Hace 2 días");
        assert_eq!(time_ago(now - Duration::days(9), now), "1/3/2024");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("corto", 100), "corto");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
