//! Display formatting for numbers, times and identifiers.
//!
//! Every formatter is total: absent or non-finite input renders as
//! [`PLACEHOLDER`] instead of failing.

use chrono::NaiveDateTime;
use reqwest::Url;

pub const PLACEHOLDER: &str = "--";

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Insert `,` every three digits of an unsigned integer string.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Fixed decimals with thousands separators: `1234567.891` with 2
/// decimals is `1,234,567.89`.
pub fn format_number(value: Option<f64>, decimals: usize) -> String {
    let Some(value) = finite(value) else {
        return PLACEHOLDER.to_string();
    };

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Percentage with fixed decimals. `is_fraction` means the input is in
/// `0..=1` and gets scaled by 100.
pub fn format_percentage(value: Option<f64>, decimals: usize, is_fraction: bool) -> String {
    match finite(value) {
        Some(value) => {
            let percent = if is_fraction { value * 100.0 } else { value };
            format!("{:.*}%", decimals, percent)
        }
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_currency(amount: Option<f64>, symbol: &str, decimals: usize) -> String {
    match finite(amount) {
        Some(_) => format!("{}{}", symbol, format_number(amount, decimals)),
        None => PLACEHOLDER.to_string(),
    }
}

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Binary-prefixed size with trailing zeros trimmed: `1536` is `1.5 KB`.
pub fn format_file_size(bytes: Option<f64>, decimals: usize) -> String {
    let Some(bytes) = finite(bytes).filter(|b| *b >= 0.0) else {
        return PLACEHOLDER.to_string();
    };
    if bytes == 0.0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut scaled = bytes;
    while scaled >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.*}", decimals, scaled);
    let trimmed = if rounded.contains('.') {
        rounded.trim_end_matches('0').trim_end_matches('.')
    } else {
        rounded.as_str()
    };

    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Compact magnitude: `1500` is `1.5K`, `-2500000` is `-2.5M`.
pub fn format_large_number(value: Option<f64>, decimals: usize) -> String {
    let Some(value) = finite(value) else {
        return PLACEHOLDER.to_string();
    };

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let (scaled, suffix) = if magnitude >= 1e9 {
        (magnitude / 1e9, "B")
    } else if magnitude >= 1e6 {
        (magnitude / 1e6, "M")
    } else if magnitude >= 1e3 {
        (magnitude / 1e3, "K")
    } else {
        (magnitude, "")
    };

    format!("{}{:.*}{}", sign, decimals, scaled, suffix)
}

/// Format a timestamp with a chrono pattern.
pub fn format_with(at: Option<NaiveDateTime>, pattern: &str) -> String {
    match at {
        Some(at) => at.format(pattern).to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_date_time(at: Option<NaiveDateTime>) -> String {
    format_with(at, DATE_TIME_FORMAT)
}

pub fn format_date(at: Option<NaiveDateTime>) -> String {
    format_with(at, DATE_FORMAT)
}

pub fn format_time(at: Option<NaiveDateTime>) -> String {
    format_with(at, TIME_FORMAT)
}

struct Parts {
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
}

fn split_millis(millis: i64) -> Parts {
    let total_seconds = millis / 1000;
    Parts {
        days: total_seconds / 86_400,
        hours: total_seconds % 86_400 / 3_600,
        minutes: total_seconds % 3_600 / 60,
        seconds: total_seconds % 60,
    }
}

/// Human duration from milliseconds, showing the two or three most
/// significant units: `1d 2h 3m`, `2h 3m`, `3m 4s`, `4s`.
pub fn format_duration(millis: Option<f64>) -> String {
    let Some(millis) = finite(millis).filter(|m| *m >= 0.0) else {
        return PLACEHOLDER.to_string();
    };

    let p = split_millis(millis as i64);
    if p.days > 0 {
        format!("{}d {}h {}m", p.days, p.hours, p.minutes)
    } else if p.hours > 0 {
        format!("{}h {}m", p.hours, p.minutes)
    } else if p.minutes > 0 {
        format!("{}m {}s", p.minutes, p.seconds)
    } else {
        format!("{}s", p.seconds)
    }
}

/// Time left until `end`, or `ended` once it has passed.
pub fn format_countdown(end: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let Some(end) = end else {
        return PLACEHOLDER.to_string();
    };

    let left = (end - now).num_milliseconds();
    if left <= 0 {
        return "ended".to_string();
    }

    let p = split_millis(left);
    if p.days > 0 {
        format!("{}d {}h {}m", p.days, p.hours, p.minutes)
    } else if p.hours > 0 {
        format!("{}h {}m {}s", p.hours, p.minutes, p.seconds)
    } else if p.minutes > 0 {
        format!("{}m {}s", p.minutes, p.seconds)
    } else {
        format!("{}s", p.seconds)
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 11-digit mobile numbers as `138-1234-5678`; anything else unchanged.
pub fn format_phone(phone: &str) -> String {
    if phone.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let digits = digits_only(phone);
    if digits.len() == 11 {
        format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..])
    } else {
        phone.to_string()
    }
}

pub fn mask_phone(phone: &str) -> String {
    if phone.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let digits = digits_only(phone);
    if digits.len() == 11 {
        format!("{}****{}", &digits[..3], &digits[7..])
    } else {
        phone.to_string()
    }
}

/// Keep the first and last character of the mailbox name.
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let Some((name, domain)) = email.split_once('@') else {
        return email.to_string();
    };

    let chars: Vec<char> = name.chars().collect();
    let masked = match chars.as_slice() {
        [] => "*".to_string(),
        [first] | [first, _] => format!("{}*", first),
        [first, middle @ .., last] => format!("{}{}{}", first, "*".repeat(middle.len()), last),
    };
    format!("{}@{}", masked, domain)
}

/// Cut `text` to at most `max_len` characters, `suffix` included.
pub fn truncate_text(text: &str, max_len: usize, suffix: &str) -> String {
    if text.is_empty() {
        return PLACEHOLDER.to_string();
    }
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let keep = max_len.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out: String = first.to_uppercase().collect();
    out.push_str(&chars.as_str().to_lowercase());
    out
}

/// `order_total_count` to `orderTotalCount`. Only `_` followed by a
/// lower-case letter is folded.
pub fn to_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

/// `orderTotalCount` to `order_total_count`.
pub fn to_snake_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

pub fn format_coordinates(lng: Option<f64>, lat: Option<f64>, precision: usize) -> String {
    match (finite(lng), finite(lat)) {
        (Some(lng), Some(lat)) => format!("{:.*}, {:.*}", precision, lng, precision, lat),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Order numbers in groups of four: `SF12345678` is `SF12 3456 78`.
pub fn format_order_no(order_no: &str) -> String {
    if order_no.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let chars: Vec<char> = order_no.chars().collect();
    chars
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_rating(rating: Option<f64>, max_rating: u32) -> String {
    match finite(rating) {
        Some(rating) => format!("{:.1}/{}", rating, max_rating),
        None => PLACEHOLDER.to_string(),
    }
}

/// URL-encoded query string. Absent and empty values are skipped.
pub fn format_query_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    let mut url = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return String::new(),
    };
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.append_pair(key, &value);
            }
        }
    }
    url.query().unwrap_or_default().to_string()
}
