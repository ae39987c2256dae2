//! Date formats for `date` fields
//!
//! A format is configured either as a strftime pattern (`%Y-%m-%d`) or as a
//! reference-time layout (`2006-01-02`). Layouts are translated once, when
//! the schema is built, so validation only ever sees a checked strftime
//! pattern.

use std::fmt;

use chrono::format::{self, Fixed, Item, Numeric, ParseErrorKind, Parsed, StrftimeItems};

/// Reference-time tokens and their strftime equivalents, longest first
/// where one token is a prefix of another.
const LAYOUT_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("2006", "%Y"),
    ("Z07:00", "%#z"),
    ("Z0700", "%#z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    (".000000000", "%.9f"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// A precompiled date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    /// Format as written in configuration
    source: String,
    /// Checked strftime pattern
    pattern: String,
}

impl DateFormat {
    /// Compiles a configured format.
    ///
    /// Returns a reason when the format is empty or contains a specifier
    /// the parser does not understand.
    pub fn new(source: impl Into<String>) -> Result<Self, String> {
        let source = source.into();
        if source.is_empty() {
            return Err("format must not be empty".into());
        }

        let pattern = if source.contains('%') {
            source.clone()
        } else {
            translate_layout(&source)
        };

        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(format!("unsupported date format {:?}", source));
        }

        Ok(Self { source, pattern })
    }

    /// Returns the format as configured
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the strftime pattern used for parsing
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Returns true when `value` parses exactly against this format.
    ///
    /// The whole input must be consumed and every parsed component must be in
    /// range. Formats that do not pin a full calendar date (for example
    /// `%Y-%m` or `%H:%M`) are accepted once their components parse. A day of
    /// week only has to be well formed; it is not checked against the date.
    pub fn matches(&self, value: &str) -> bool {
        let Some(parsed) = self.parse(value) else {
            return false;
        };

        match parsed.to_naive_date() {
            Ok(_) => true,
            Err(e) => e.kind() == ParseErrorKind::NotEnough,
        }
    }

    fn parse(&self, value: &str) -> Option<Parsed> {
        let mut parsed = Parsed::new();
        let mut rest = value;

        for item in StrftimeItems::new(&self.pattern) {
            let item = [item];
            rest = if is_weekday(&item[0]) {
                format::parse_and_remainder(&mut Parsed::new(), rest, item.iter()).ok()?
            } else {
                format::parse_and_remainder(&mut parsed, rest, item.iter()).ok()?
            };
        }

        rest.is_empty().then_some(parsed)
    }
}

fn is_weekday(item: &Item<'_>) -> bool {
    matches!(
        item,
        Item::Fixed(Fixed::ShortWeekdayName | Fixed::LongWeekdayName)
            | Item::Numeric(Numeric::WeekdayFromMon | Numeric::NumDaysFromSun, _)
    )
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Translates a reference-time layout into a strftime pattern.
fn translate_layout(layout: &str) -> String {
    let mut pattern = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'outer: while !rest.is_empty() {
        for (token, spec) in LAYOUT_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                pattern.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                pattern.push_str("%%");
            } else {
                pattern.push(c);
            }
        }
        rest = chars.as_str();
    }

    pattern
}
