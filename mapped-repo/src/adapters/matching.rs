//! Example matching and property sorting over JSON documents.
//!
//! Stored values and probes are serialised with serde, nested objects are
//! addressed with dotted paths, and the [`ExampleMatcher`] rules are applied
//! leaf by leaf.

use std::borrow::Cow;
use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Number, Value};

use crate::{ExampleMatcher, MatchMode, NullHandler, Sort, StringMatcher};

/// Value at `path` in `doc`. The empty path is the document itself.
pub(crate) fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

/// Leaf values of `doc` keyed by dotted path.
fn leaves<'a>(prefix: &str, doc: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match doc {
        Value::Object(fields) => {
            for (key, value) in fields {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                leaves(&path, value, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf)),
    }
}

/// A path is ignored when it or any enclosing path is.
fn is_ignored(matcher: &ExampleMatcher, path: &str) -> bool {
    if matcher.is_ignored_path(path) {
        return true;
    }
    path.match_indices('.')
        .any(|(idx, _)| matcher.is_ignored_path(&path[..idx]))
}

struct TextPredicate {
    matcher: StringMatcher,
    needle: String,
    ignore_case: bool,
    regex: Option<Regex>,
}

impl TextPredicate {
    fn new(matcher: StringMatcher, needle: &str, ignore_case: bool) -> Result<Self, regex::Error> {
        let regex = match matcher {
            StringMatcher::Regex => Some(
                RegexBuilder::new(&format!("^(?:{needle})$"))
                    .case_insensitive(ignore_case)
                    .build()?,
            ),
            _ => None,
        };
        let needle = if ignore_case {
            needle.to_lowercase()
        } else {
            needle.to_string()
        };
        Ok(Self {
            matcher,
            needle,
            ignore_case,
            regex,
        })
    }

    fn test(&self, value: &str) -> bool {
        if let Some(regex) = &self.regex {
            return regex.is_match(value);
        }
        let value: Cow<'_, str> = if self.ignore_case {
            Cow::Owned(value.to_lowercase())
        } else {
            Cow::Borrowed(value)
        };
        match self.matcher {
            StringMatcher::Default | StringMatcher::Exact => value == self.needle.as_str(),
            StringMatcher::Starting => value.starts_with(self.needle.as_str()),
            StringMatcher::Ending => value.ends_with(self.needle.as_str()),
            StringMatcher::Containing => value.contains(self.needle.as_str()),
            // compiled above
            StringMatcher::Regex => false,
        }
    }
}

enum Check {
    IsNull,
    Equals(Value),
    Text(TextPredicate),
}

struct Predicate {
    path: String,
    check: Check,
}

impl Predicate {
    fn holds(&self, candidate: &Value) -> bool {
        let actual = lookup(candidate, &self.path).unwrap_or(&Value::Null);
        match &self.check {
            Check::IsNull => actual.is_null(),
            Check::Equals(expected) => actual == expected,
            Check::Text(text) => actual.as_str().is_some_and(|s| text.test(s)),
        }
    }
}

/// Predicates derived from one probe document and its matcher.
pub(crate) struct ExampleFilter {
    mode: MatchMode,
    predicates: Vec<Predicate>,
}

impl ExampleFilter {
    pub(crate) fn compile(probe: &Value, matcher: &ExampleMatcher) -> Result<Self, regex::Error> {
        let mut fields = Vec::new();
        leaves("", probe, &mut fields);

        let mut predicates = Vec::with_capacity(fields.len());
        for (path, value) in fields {
            if is_ignored(matcher, &path) {
                continue;
            }
            let check = match value {
                Value::Null => match matcher.null_handler() {
                    NullHandler::Ignore => continue,
                    NullHandler::Include => Check::IsNull,
                },
                Value::String(needle) => Check::Text(TextPredicate::new(
                    matcher.string_matcher_for(&path),
                    needle,
                    matcher.ignore_case_for(&path),
                )?),
                other => Check::Equals(other.clone()),
            };
            predicates.push(Predicate { path, check });
        }

        Ok(Self {
            mode: matcher.mode(),
            predicates,
        })
    }

    /// A probe without any active predicate matches every candidate.
    pub(crate) fn matches(&self, candidate: &Value) -> bool {
        if self.predicates.is_empty() {
            return true;
        }
        match self.mode {
            MatchMode::All => self.predicates.iter().all(|p| p.holds(candidate)),
            MatchMode::Any => self.predicates.iter().any(|p| p.holds(candidate)),
        }
    }
}

/// Order two documents by `sort`. Missing properties count as null and
/// nulls sort first when ascending.
pub(crate) fn compare_documents(sort: &Sort, a: &Value, b: &Value) -> Ordering {
    for order in sort.orders() {
        let left = lookup(a, &order.property).unwrap_or(&Value::Null);
        let right = lookup(b, &order.property).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right, order.ignore_case);
        let ordering = if order.direction.is_ascending() {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value, ignore_case: bool) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) if ignore_case => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or_default();
    let b = y.as_f64().unwrap_or_default();
    a.total_cmp(&b)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
