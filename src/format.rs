use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::{Local, TimeZone};
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use tracing::warn;

/// Root-locale collator at secondary strength: accents count, case does not.
static COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> = LazyLock::new(|| {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Secondary);
    Collator::try_new(Default::default(), options)
        .map_err(|err| warn!(error = %err, "collator unavailable; falling back to lowercase order"))
        .ok()
});

/// A moment-style display format (`YYYY-MM-DD HH:mm`) translated once to strftime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
}

impl DateFormat {
    pub fn new(moment: &str) -> Self {
        Self {
            pattern: moment_to_strftime(moment),
        }
    }

    pub fn strftime(&self) -> &str {
        &self.pattern
    }

    /// Formats epoch milliseconds in local time; `None` for out-of-range values.
    pub fn format_ms(&self, ms: i64) -> Option<String> {
        let dt = Local.timestamp_millis_opt(ms).single()?;
        Some(dt.format(&self.pattern).to_string())
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self::new("YYYY-MM-DD HH:mm")
    }
}

const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("H", "%-H"),
    ("h", "%-I"),
    ("A", "%p"),
    ("a", "%P"),
];

/// Translates moment tokens to chrono strftime; `[...]` is literal text.
pub fn moment_to_strftime(moment: &str) -> String {
    let mut out = String::with_capacity(moment.len() + 8);
    let mut rest = moment;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                push_literal(&mut out, &rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        push_literal(&mut out, &rest[..c.len_utf8()]);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

/// Folder path of a file as `/a/b/`, or `/` at the vault root.
pub fn folder_structure(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => format!("/{dir}/"),
        _ => "/".to_string(),
    }
}

/// Byte count with thousands separators: `1234567` -> `1,234,567`.
pub fn format_file_size(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Locale-aware, case-insensitive ordering. Strings differing only in case compare
/// equal, so stable sorts keep their input order.
pub fn collate(a: &str, b: &str) -> Ordering {
    match COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}
