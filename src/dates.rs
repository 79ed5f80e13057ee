//! Normalization of the heterogeneous date strings search providers expose.
//!
//! Providers hand back ISO timestamps (structured API), localized absolute
//! dates (`Sep 10, 2024`, `10 de set. de 2024`) or relative phrases
//! (`2 days ago`, `há 3 dias`). [`normalize`] maps all of them to a single
//! [`PublishedAt`], resolving relative phrases against a caller-supplied
//! clock. Anything unrecognized becomes [`PublishedAt::Unknown`].
//!
//! Day-granular phrases (`today`, `N days ago`, `N weeks ago`) resolve to
//! 00:00 UTC of the resulting day; minute and hour phrases are exact.

use crate::models::PublishedAt;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Month names and abbreviations in English and Portuguese.
const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("janeiro", 1),
    ("jan", 1),
    ("february", 2),
    ("fevereiro", 2),
    ("feb", 2),
    ("fev", 2),
    ("march", 3),
    ("março", 3),
    ("marco", 3),
    ("mar", 3),
    ("april", 4),
    ("abril", 4),
    ("apr", 4),
    ("abr", 4),
    ("may", 5),
    ("maio", 5),
    ("mai", 5),
    ("june", 6),
    ("junho", 6),
    ("jun", 6),
    ("july", 7),
    ("julho", 7),
    ("jul", 7),
    ("august", 8),
    ("agosto", 8),
    ("aug", 8),
    ("ago", 8),
    ("september", 9),
    ("setembro", 9),
    ("sept", 9),
    ("sep", 9),
    ("set", 9),
    ("october", 10),
    ("outubro", 10),
    ("oct", 10),
    ("out", 10),
    ("november", 11),
    ("novembro", 11),
    ("nov", 11),
    ("december", 12),
    ("dezembro", 12),
    ("dec", 12),
    ("dez", 12),
];

const ISO_PATTERN: &str =
    r"\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?";
const NUMERIC_PATTERN: &str = r"(?P<day>\d{1,2})/(?P<mon>\d{1,2})/(?P<year>\d{4})";
const RELATIVE_EN_PATTERN: &str =
    r"(?P<n>\d+|an?)\s+(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?|months?)\s+ago";
const RELATIVE_PT_PATTERN: &str =
    r"há\s+(?P<n>\d+|um|uma)\s+(?P<unit>minutos?|horas?|dias?|semanas?|meses|mês|mes)";
const DAY_WORD_PATTERN: &str = r"(?P<word>today|yesterday|hoje|ontem)";

/// Bing's separators between a date label and the rest of a snippet.
const SNIPPET_SEPARATORS: &str = "·—–-";

/// Alternation of every month name, longest first so `sept` wins over `sep`.
static MONTH_ALTERNATION: Lazy<String> = Lazy::new(|| {
    let mut names: Vec<&str> = MONTHS.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.chars().count()));
    names.join("|")
});

static MONTH_FIRST_PATTERN: Lazy<String> = Lazy::new(|| {
    format!(
        r"(?P<mon>{})\.?\s+(?P<day>\d{{1,2}}),?\s+(?P<year>\d{{4}})",
        *MONTH_ALTERNATION
    )
});

static DAY_FIRST_PATTERN: Lazy<String> = Lazy::new(|| {
    format!(
        r"(?P<day>\d{{1,2}})\s+(?:de\s+)?(?P<mon>{})\.?,?\s+(?:de\s+)?(?P<year>\d{{4}})",
        *MONTH_ALTERNATION
    )
});

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("(?i)^{pattern}$")).expect("static date pattern compiles")
}

static RE_MONTH_FIRST: Lazy<Regex> = Lazy::new(|| anchored(&MONTH_FIRST_PATTERN));
static RE_DAY_FIRST: Lazy<Regex> = Lazy::new(|| anchored(&DAY_FIRST_PATTERN));
static RE_NUMERIC: Lazy<Regex> = Lazy::new(|| anchored(NUMERIC_PATTERN));
static RE_RELATIVE_EN: Lazy<Regex> = Lazy::new(|| anchored(RELATIVE_EN_PATTERN));
static RE_RELATIVE_PT: Lazy<Regex> = Lazy::new(|| anchored(RELATIVE_PT_PATTERN));
static RE_DAY_WORD: Lazy<Regex> = Lazy::new(|| anchored(DAY_WORD_PATTERN));

static RE_GROUP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?P<\w+>").expect("static date pattern compiles"));

/// Unanchored union of the forms that are unambiguous inside running text.
///
/// Bare day words are left out: "hoje" and "today" are ordinary prose.
static RE_DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    let parts = [
        ISO_PATTERN,
        MONTH_FIRST_PATTERN.as_str(),
        DAY_FIRST_PATTERN.as_str(),
        NUMERIC_PATTERN,
        RELATIVE_EN_PATTERN,
        RELATIVE_PT_PATTERN,
    ]
    .iter()
    .map(|p| RE_GROUP_NAME.replace_all(p, "?:").into_owned())
    .collect::<Vec<_>>();
    Regex::new(&format!(r"(?i)\b(?:{})\b", parts.join("|"))).expect("static date pattern compiles")
});

/// A day word that opens a snippet as its date label, e.g. `hoje · Análise…`.
static RE_LEADING_DAY_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^\s*{DAY_WORD_PATTERN}\s*[{SNIPPET_SEPARATORS}]"))
        .expect("static date pattern compiles")
});

/// Normalize a raw provider date string into a [`PublishedAt`].
///
/// Pure: the result depends only on `raw` and `now`. Never fails; strings
/// that match no recognized form, or describe impossible dates, yield
/// [`PublishedAt::Unknown`].
pub fn normalize(raw: &str, now: DateTime<Utc>) -> PublishedAt {
    let s = raw.trim();
    if s.is_empty() {
        return PublishedAt::Unknown;
    }

    parse_iso(s)
        .or_else(|| parse_rfc2822(s))
        .or_else(|| parse_relative(s, now))
        .or_else(|| parse_human(s))
        .map(PublishedAt::Known)
        .unwrap_or(PublishedAt::Unknown)
}

/// Find the first substring of a snippet that looks like a date [`normalize`] understands.
///
/// `today`/`hoje` and friends only count when they lead the snippet as a
/// label followed by a separator.
pub fn find_date_like(text: &str) -> Option<&str> {
    if let Some(caps) = RE_LEADING_DAY_WORD.captures(text) {
        return caps.name("word").map(|m| m.as_str());
    }
    RE_DATE_LIKE.find(text).map(|m| m.as_str())
}

/// Date carried by a dedicated date label such as Bing's `.news_dt`.
///
/// Unlike snippet text, a label consisting of a bare day word is a date.
pub fn find_date_in_label(label: &str) -> Option<&str> {
    let trimmed = label.trim().trim_end_matches(|c: char| SNIPPET_SEPARATORS.contains(c)).trim_end();
    if RE_DAY_WORD.is_match(trimmed) {
        return Some(trimmed);
    }
    find_date_like(label)
}

const FORMATS_WITH_TZ: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

const FORMATS_NAIVE: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // chrono's %z does not take "Z"
    let with_offset = match s.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => s.to_string(),
    };
    for fmt in FORMATS_WITH_TZ {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // Bing's API omits the offset: "2024-09-10T12:00:00.0000000"
    for fmt in FORMATS_NAIVE {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(midnight_utc)
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_relative(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(caps) = RE_DAY_WORD.captures(s) {
        let days = match caps["word"].to_lowercase().as_str() {
            "today" | "hoje" => 0,
            _ => 1,
        };
        return days_before(now, days);
    }

    let caps = RE_RELATIVE_EN
        .captures(s)
        .or_else(|| RE_RELATIVE_PT.captures(s))?;
    let n = match caps["n"].to_lowercase().as_str() {
        "a" | "an" | "um" | "uma" => 1,
        digits => digits.parse::<i64>().ok()?,
    };
    let unit = caps["unit"].to_lowercase();

    if unit.starts_with("min") {
        now.checked_sub_signed(Duration::try_minutes(n)?)
    } else if unit.starts_with('h') {
        now.checked_sub_signed(Duration::try_hours(n)?)
    } else if unit.starts_with('d') {
        days_before(now, n)
    } else if unit.starts_with('w') || unit.starts_with("sem") {
        days_before(now, n.checked_mul(7)?)
    } else {
        let months = Months::new(u32::try_from(n).ok()?);
        now.checked_sub_months(months)
            .and_then(|dt| midnight_utc(dt.date_naive()))
    }
}

fn parse_human(s: &str) -> Option<DateTime<Utc>> {
    let caps = RE_MONTH_FIRST
        .captures(s)
        .or_else(|| RE_DAY_FIRST.captures(s))
        .or_else(|| RE_NUMERIC.captures(s))?;

    let year: i32 = caps["year"].parse().ok()?;
    let day: u32 = caps["day"].parse().ok()?;
    let mon = &caps["mon"];
    let month = match mon.parse::<u32>() {
        Ok(m) => m,
        Err(_) => month_number(mon)?,
    };

    NaiveDate::from_ymd_opt(year, month, day).and_then(midnight_utc)
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_lowercase();
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, number)| *number)
}

fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_days(days)?)
        .and_then(|dt| midnight_utc(dt.date_naive()))
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
