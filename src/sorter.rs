//! Client-side ordering of report rows.
//!
//! Values coming from the backend are heterogeneous, so every cell is first
//! classified into a normalized form (null, number or text) and only those
//! forms are compared. Classification never fails; every value has a fallback.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::cell::{CellValue, Row, format_number};

lazy_static! {
    static ref NUMERIC_REGEX: Regex = Regex::new(r"^-?\d+(\.\d+)?$").unwrap();
    static ref ISO_DATE_REGEX: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    // Local date-time, then an optional `Z`, `+HH`, `+HHMM` or `+HH:MM` offset
    static ref DATE_TIME_REGEX: Regex = Regex::new(
        r"^(\d{4}-\d{2}-\d{2})[Tt ](\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?)(?:([Zz])|([+-])(\d{2})(?::?(\d{2}))?)?$"
    )
    .unwrap();
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Sort direction of a table column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

/// Which column a table is sorted by and in which direction
///
/// Owned by whoever renders the table; there is no persistence.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }
}

/// Parameters for [`sort_rows`]
///
/// `get_value` takes precedence over `key` for extracting the compared value.
pub struct SortOptions<'a, T> {
    pub key: Option<&'a str>,
    pub direction: SortDirection,
    pub get_value: Option<&'a dyn Fn(&T) -> CellValue>,
}

impl<'a, T> SortOptions<'a, T> {
    pub fn by_key(key: &'a str, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
            get_value: None,
        }
    }

    pub fn by_getter(get_value: &'a dyn Fn(&T) -> CellValue, direction: SortDirection) -> Self {
        Self {
            key: None,
            direction,
            get_value: Some(get_value),
        }
    }

    pub fn from_state(state: &'a SortState) -> Self {
        Self {
            key: state.key.as_deref(),
            direction: state.direction,
            get_value: None,
        }
    }
}

/// Comparable form of a cell
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Normalized {
    Null,
    Number(f64),
    Text(String),
}

impl Normalized {
    fn as_compare_string(&self) -> String {
        match self {
            Normalized::Null => String::new(),
            Normalized::Number(n) => format_number(*n),
            Normalized::Text(s) => s.clone(),
        }
    }
}

/// Classify a cell into null, number or text
pub(crate) fn normalize(value: &CellValue) -> Normalized {
    match value {
        CellValue::Null => Normalized::Null,
        CellValue::Bool(b) => Normalized::Number(if *b { 1.0 } else { 0.0 }),
        CellValue::Number(n) if n.is_finite() => Normalized::Number(*n),
        CellValue::Number(_) => Normalized::Number(0.0),
        CellValue::Instant(t) => Normalized::Number(t.timestamp_millis() as f64),
        CellValue::Text(s) => normalize_text(s),
    }
}

fn normalize_text(raw: &str) -> Normalized {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Normalized::Text(String::new());
    }

    if NUMERIC_REGEX.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Normalized::Number(n);
        }
    }

    // Only trust a parsed date when an ISO calendar date is visibly present
    if let Some(millis) = parse_date_millis(trimmed) {
        if ISO_DATE_REGEX.is_match(trimmed) {
            return Normalized::Number(millis as f64);
        }
    }

    Normalized::Text(trimmed.to_lowercase())
}

/// Parse a calendar date or date-time into epoch milliseconds
///
/// Seconds may be omitted and the offset may be `Z`, `+HH`, `+HHMM` or
/// `+HH:MM`. Values without an offset are read as UTC.
pub(crate) fn parse_date_millis(s: &str) -> Option<i64> {
    if let Some(caps) = DATE_TIME_REGEX.captures(s) {
        let local = format!("{}T{}", &caps[1], &caps[2]);
        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&local, fmt).ok())?;
        let offset_secs = match (caps.get(4), caps.get(5)) {
            (Some(sign), Some(hours)) => {
                let hours: i64 = hours.as_str().parse().ok()?;
                let minutes: i64 = caps.get(6).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
                if hours > 23 || minutes > 59 {
                    return None;
                }
                let secs = hours * 3600 + minutes * 60;
                if sign.as_str() == "-" { -secs } else { secs }
            }
            _ => 0,
        };
        return Some(naive.and_utc().timestamp_millis() - offset_secs * 1000);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).timestamp_millis())
}

/// Compare two strings the way a numeric-aware collator would
///
/// Runs of ASCII digits compare by value, so `"item2"` orders before
/// `"item10"`. Letters compare by their base form ignoring case and accents
/// (`"Émile"` sits between `"Dev"` and `"Farah"`), and punctuation or symbols
/// order before digits, which order before letters. Strings equal on that
/// basis are then ordered unaccented first.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let folded_a = fold(a);
    let folded_b = fold(b);
    primary_cmp(&folded_a, &folded_b).then_with(|| accent_key(a).cmp(&accent_key(b)))
}

/// Lowercased base letters: canonical decomposition with combining marks dropped
fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tie-break key: lowercase decomposed text without digits
fn accent_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !c.is_ascii_digit())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Punctuation, whitespace and symbols first, then digits, then letters
fn char_class(c: char) -> u8 {
    if c.is_ascii_digit() {
        1
    } else if c.is_alphabetic() {
        2
    } else {
        0
    }
}

fn primary_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let run_a = take_digits(&mut left);
                let run_b = take_digits(&mut right);
                let ord = compare_digit_runs(&run_a, &run_b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let ord = (char_class(x), x).cmp(&(char_class(y), y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_normalized(a: &Normalized, b: &Normalized) -> Ordering {
    match (a, b) {
        (Normalized::Null, Normalized::Null) => Ordering::Equal,
        (Normalized::Null, _) => Ordering::Greater,
        (_, Normalized::Null) => Ordering::Less,
        (Normalized::Number(x), Normalized::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => natural_cmp(&a.as_compare_string(), &b.as_compare_string()),
    }
}

/// Three-way comparison of two cells
///
/// Nulls are greater than everything else, numbers compare numerically and all
/// other combinations fall back to a digit-aware string comparison.
///
/// # Examples
/// ```
/// use rental_admin::cell::CellValue;
/// use rental_admin::sorter::compare_values;
/// use std::cmp::Ordering;
///
/// let a = CellValue::Text("10".into());
/// let b = CellValue::Number(9.0);
/// assert_eq!(compare_values(&a, &b), Ordering::Greater);
/// assert_eq!(compare_values(&CellValue::Null, &b), Ordering::Greater);
/// ```
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    compare_normalized(&normalize(a), &normalize(b))
}

/// Return a sorted copy of `rows`
///
/// Rows with a null or missing value always end up after every non-null row,
/// whatever the direction. Equal rows keep their input order. When neither a
/// key nor a getter is given the rows are returned in their original order.
///
/// # Arguments
/// * `rows` - Rows to sort; never modified
/// * `options` - Key or getter plus the direction
///
/// # Returns
/// * `Vec<T>` - A new vector holding the sorted rows
///
/// # Examples
/// ```
/// use rental_admin::cell::Record;
/// use rental_admin::sorter::{SortDirection, SortOptions, sort_rows};
///
/// let rows = vec![
///     Record::new().with("id", "item10"),
///     Record::new().with("id", "item2"),
/// ];
/// let sorted = sort_rows(&rows, &SortOptions::by_key("id", SortDirection::Asc));
/// assert_eq!(sorted[0], rows[1]);
/// ```
pub fn sort_rows<T: Row + Clone>(rows: &[T], options: &SortOptions<'_, T>) -> Vec<T> {
    if options.key.is_none() && options.get_value.is_none() {
        return rows.to_vec();
    }

    let mut keyed: Vec<(usize, Normalized)> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let value = match (options.get_value, options.key) {
                (Some(get_value), _) => get_value(row),
                (None, Some(key)) => row.cell(key).cloned().unwrap_or_default(),
                (None, None) => CellValue::Null,
            };
            (index, normalize(&value))
        })
        .collect();

    merge_sort_by(&mut keyed, |(ia, a), (ib, b)| {
        let ord = match (a, b) {
            // Null placement ignores the direction
            (Normalized::Null, _) | (_, Normalized::Null) => compare_normalized(a, b),
            _ => match options.direction {
                SortDirection::Asc => compare_normalized(a, b),
                SortDirection::Desc => compare_normalized(b, a),
            },
        };
        ord.then_with(|| ia.cmp(ib))
    });

    log::trace!(
        "sorted {} rows by {:?} {}",
        rows.len(),
        options.key,
        options.direction
    );

    keyed
        .into_iter()
        .map(|(index, _)| rows[index].clone())
        .collect()
}

/// Stable bottom-up merge sort
///
/// Mixed numeric and text cells do not always form a total order, and the
/// standard library sort is allowed to panic on such comparators.
fn merge_sort_by<T, F>(items: &mut Vec<T>, mut cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut src: Vec<Option<T>> = items.drain(..).map(Some).collect();
    let mut width = 1;
    while width < len {
        let mut dst: Vec<Option<T>> = Vec::with_capacity(len);
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j) = (start, mid);
            while i < mid && j < end {
                let take_right = match (&src[i], &src[j]) {
                    (Some(a), Some(b)) => cmp(b, a) == Ordering::Less,
                    _ => false,
                };
                if take_right {
                    dst.push(src[j].take());
                    j += 1;
                } else {
                    dst.push(src[i].take());
                    i += 1;
                }
            }
            dst.extend(src[i..mid].iter_mut().map(Option::take));
            dst.extend(src[j..end].iter_mut().map(Option::take));
            start = end;
        }
        src = dst;
        width *= 2;
    }

    items.extend(src.into_iter().flatten());
}

/// Convenience wrapper over [`sort_rows`] for a table's current [`SortState`]
pub fn sort_by_state<T: Row + Clone>(rows: &[T], state: &SortState) -> Vec<T> {
    sort_rows(rows, &SortOptions::from_state(state))
}

/// Next sort state after a click on the header of `next_key`
///
/// Switching to another column starts ascending; clicking the current column
/// flips the direction.
///
/// # Examples
/// ```
/// use rental_admin::sorter::{SortDirection, SortState, toggle_sort};
///
/// let state = toggle_sort(&SortState::new("a", SortDirection::Asc), "a");
/// assert_eq!(state, SortState::new("a", SortDirection::Desc));
/// ```
pub fn toggle_sort(prev: &SortState, next_key: &str) -> SortState {
    if prev.key.as_deref() != Some(next_key) {
        return SortState::new(next_key, SortDirection::Asc);
    }
    SortState::new(next_key, prev.direction.flipped())
}
