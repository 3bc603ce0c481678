//! Canonicalization of provider free text and timestamps.

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::{
    DateTime, Local, Locale, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike,
    Utc,
};
use regex::Regex;
use serde_json::Value;

/// Canonical display format: day/month/year with a 12-hour clock.
pub const CANONICAL_FORMAT: &str = "%d/%m/%Y %I:%M %p";

// Canonical format without the meridiem, which is appended from the resolved markers.
const CLOCK_FORMAT: &str = "%d/%m/%Y %I:%M";

const FALLBACK_MERIDIEM: (&str, &str) = ("AM", "PM");

const NAIVE_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]+\)").expect("valid annotation pattern"));

static DASH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s+.*$").expect("valid suffix pattern"));

/// Strip the first parenthesized annotation and any trailing ` - ` clause.
///
/// `"Delivered (signed by recipient) - confirmed"` becomes `"Delivered"`.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let without_note = PARENTHESIZED.replace(raw.trim(), "");
    DASH_SUFFIX.replace(&without_note, "").trim().to_owned()
}

/// Renders timestamps in the canonical format for one display language.
///
/// The language is resolved once at startup and carried explicitly; nothing here
/// reads process-wide state.
#[derive(Debug, Clone)]
pub struct Normalizer {
    language: String,
    locale: Locale,
    meridiem: (String, String),
}

impl Normalizer {
    /// Build a normalizer for a language tag such as `en`, `es` or `pt-BR`.
    ///
    /// Unknown tags fall back to the POSIX locale.
    #[must_use]
    pub fn new(language: &str) -> Self {
        let locale = resolve_locale(language);
        Self {
            language: language.to_owned(),
            locale,
            meridiem: meridiem_markers(locale),
        }
    }

    /// Language tag this normalizer was built for.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Locale used for rendering.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Parse any timestamp-like value and render it canonically.
    ///
    /// Strings and epoch milliseconds are understood; anything unparseable renders as now.
    #[must_use]
    pub fn format_date(&self, raw: &Value) -> String {
        let parsed = match raw {
            Value::String(text) => self.parse_any(text),
            Value::Number(millis) => millis
                .as_i64()
                .and_then(|millis| Local.timestamp_millis_opt(millis).single()),
            _ => None,
        };
        parsed.map_or_else(|| self.now(), |date| self.render(&date))
    }

    /// The current local time in canonical form.
    #[must_use]
    pub fn now(&self) -> String {
        self.render(&Local::now())
    }

    /// Render a timestamp in canonical form.
    ///
    /// Locales without AM/PM markers of their own use `AM`/`PM`.
    #[must_use]
    pub fn render<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> String {
        let local = date.with_timezone(&Local);
        let (am, pm) = &self.meridiem;
        let marker = if local.hour() < 12 { am } else { pm };
        format!(
            "{} {marker}",
            local.format_localized(CLOCK_FORMAT, self.locale)
        )
    }

    /// Parse a string previously produced by [`Normalizer::render`].
    #[must_use]
    pub fn parse_canonical(&self, text: &str) -> Option<DateTime<Local>> {
        let text = text.trim();
        let (am, pm) = &self.meridiem;
        // Longest marker first, one may be a suffix of the other.
        let mut markers = [(am.as_str(), "AM"), (pm.as_str(), "PM")];
        markers.sort_by_key(|(marker, _)| Reverse(marker.len()));
        let delocalized = markers
            .iter()
            .find_map(|(marker, plain)| {
                text.strip_suffix(marker)
                    .map(|stem| format!("{} {plain}", stem.trim_end()))
            })?;
        NaiveDateTime::parse_from_str(&delocalized, CANONICAL_FORMAT)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    }

    fn parse_any(&self, text: &str) -> Option<DateTime<Local>> {
        let text = text.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Some(date.with_timezone(&Local));
        }
        if let Some(date) = self.parse_canonical(text) {
            return Some(date);
        }
        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .map(|day| day.and_time(NaiveTime::MIN))
            })?;
        Local.from_local_datetime(&naive).earliest()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new("en")
    }
}

fn resolve_locale(language: &str) -> Locale {
    let tag = language.trim().replace('-', "_");
    let mut candidates = vec![tag.clone()];
    if let Some((lang, region)) = tag.split_once('_') {
        candidates.push(format!("{}_{}", lang.to_lowercase(), region.to_uppercase()));
    } else if tag.eq_ignore_ascii_case("en") {
        candidates.push("en_US".to_owned());
    } else {
        let lang = tag.to_lowercase();
        candidates.push(format!("{lang}_{}", lang.to_uppercase()));
    }
    candidates
        .iter()
        .find_map(|name| Locale::try_from(name.as_str()).ok())
        .unwrap_or(Locale::POSIX)
}

// The locale's AM/PM markers, or `AM`/`PM` when it has no distinct pair.
fn meridiem_markers(locale: Locale) -> (String, String) {
    let fallback = (FALLBACK_MERIDIEM.0.to_owned(), FALLBACK_MERIDIEM.1.to_owned());
    let Some(midnight) = Utc.timestamp_opt(0, 0).single() else {
        return fallback;
    };
    let noon = midnight + TimeDelta::hours(12);
    let am = midnight.format_localized("%p", locale).to_string();
    let pm = noon.format_localized("%p", locale).to_string();
    let (am, pm) = (am.trim(), pm.trim());
    if am.is_empty() || pm.is_empty() || am == pm {
        return fallback;
    }
    (am.to_owned(), pm.to_owned())
}
