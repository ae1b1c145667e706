use chrono::{Datelike, NaiveDate};

use crate::errors::DomainError;

const DEFAULT_COUNTER_WIDTH: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Year4,
    Year2,
    Month,
    Day,
    Counter(usize),
}

/// A dot-separated autoname pattern such as `AS-PNL-.###` or `BOQ-.YYYY.-`.
///
/// Parts made only of `#` form the counter, `YYYY`/`YY`/`MM`/`DD` render the
/// allocation date, anything else is copied literally. Patterns without a counter get
/// a five digit counter appended. The counter is scoped to the rendered prefix, so
/// `BOQ-.YYYY.-` restarts every year.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesPattern {
    parts: Vec<Part>,
}

impl SeriesPattern {
    pub fn parse(pattern: &str) -> Result<Self, DomainError> {
        if pattern.trim().is_empty() {
            return Err(DomainError::InvalidNamingPattern(pattern.to_string()));
        }

        let mut parts = Vec::new();
        let mut counters = 0;
        for raw in pattern.split('.') {
            if raw.is_empty() {
                continue;
            }
            let part = if raw.chars().all(|ch| ch == '#') {
                counters += 1;
                Part::Counter(raw.len())
            } else {
                match raw {
                    "YYYY" => Part::Year4,
                    "YY" => Part::Year2,
                    "MM" => Part::Month,
                    "DD" => Part::Day,
                    literal => Part::Literal(literal.to_string()),
                }
            };
            parts.push(part);
        }

        match counters {
            0 => parts.push(Part::Counter(DEFAULT_COUNTER_WIDTH)),
            1 if matches!(parts.last(), Some(Part::Counter(_))) => {}
            _ => return Err(DomainError::InvalidNamingPattern(pattern.to_string())),
        }

        Ok(Self { parts })
    }

    /// Rendered text before the counter; the key under which the counter is kept.
    pub fn prefix(&self, on: NaiveDate) -> String {
        let mut prefix = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => prefix.push_str(text),
                Part::Year4 => prefix.push_str(&format!("{:04}", on.year())),
                Part::Year2 => prefix.push_str(&format!("{:02}", on.year().rem_euclid(100))),
                Part::Month => prefix.push_str(&format!("{:02}", on.month())),
                Part::Day => prefix.push_str(&format!("{:02}", on.day())),
                Part::Counter(_) => break,
            }
        }
        prefix
    }

    pub fn counter_width(&self) -> usize {
        self.parts
            .iter()
            .find_map(|part| match part {
                Part::Counter(width) => Some(*width),
                _ => None,
            })
            .unwrap_or(DEFAULT_COUNTER_WIDTH)
    }

    pub fn format(&self, prefix: &str, counter: u64) -> String {
        let width = self.counter_width();
        format!("{prefix}{counter:0width$}")
    }
}

/// First free code among `base`, `base-001`, `base-002`, ... up to `max_attempts`
/// suffixes.
pub fn unique_code<F>(
    base: &str,
    width: usize,
    max_attempts: u32,
    mut is_taken: F,
) -> Result<String, DomainError>
where
    F: FnMut(&str) -> bool,
{
    if !is_taken(base) {
        return Ok(base.to_string());
    }

    for attempt in 1..=max_attempts {
        let candidate = format!("{base}-{attempt:0width$}");
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(DomainError::CodeSpaceExhausted { base: base.to_string() })
}
