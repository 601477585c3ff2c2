//! Query-by-example probes and their matching configuration.
//!
//! An [`Example`] pairs a partially populated probe with an
//! [`ExampleMatcher`]. How the matcher is evaluated is up to the repository
//! that receives the example; this module only carries the configuration.

use std::collections::{BTreeMap, BTreeSet};

/// Whether all or any of the probe's populated properties must match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// How string-valued properties are compared against the probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StringMatcher {
    /// Store default, equality for every store in this crate.
    #[default]
    Default,
    Exact,
    Starting,
    Ending,
    Containing,
    /// The probe value is a regular expression that must match the whole value.
    Regex,
}

/// Treatment of probe properties that hold no value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NullHandler {
    /// Unset probe properties do not constrain the result.
    #[default]
    Ignore,
    /// Unset probe properties require the candidate's property to be unset too.
    Include,
}

/// Matching overrides for a single property path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyMatcher {
    pub string_matcher: Option<StringMatcher>,
    pub ignore_case: Option<bool>,
}

impl PropertyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(self) -> Self {
        self.string_matcher(StringMatcher::Exact)
    }

    pub fn starts_with(self) -> Self {
        self.string_matcher(StringMatcher::Starting)
    }

    pub fn ends_with(self) -> Self {
        self.string_matcher(StringMatcher::Ending)
    }

    pub fn contains(self) -> Self {
        self.string_matcher(StringMatcher::Containing)
    }

    pub fn regex(self) -> Self {
        self.string_matcher(StringMatcher::Regex)
    }

    pub fn string_matcher(mut self, matcher: StringMatcher) -> Self {
        self.string_matcher = Some(matcher);
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = Some(true);
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = Some(false);
        self
    }
}

/// Matching rules attached to an [`Example`].
///
/// Builders consume and return `self`; property paths use dots for nested
/// fields (`owner.email`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    mode: MatchMode,
    default_string_matcher: StringMatcher,
    ignore_case: bool,
    null_handler: NullHandler,
    ignored_paths: BTreeSet<String>,
    property_matchers: BTreeMap<String, PropertyMatcher>,
}

impl ExampleMatcher {
    /// Default matcher: all properties must match, exact strings, nulls ignored.
    pub fn matching() -> Self {
        Self::matching_all()
    }

    pub fn matching_all() -> Self {
        Self::default()
    }

    pub fn matching_any() -> Self {
        Self {
            mode: MatchMode::Any,
            ..Self::default()
        }
    }

    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_string_matcher(mut self, matcher: StringMatcher) -> Self {
        self.default_string_matcher = matcher;
        self
    }

    pub fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Ignore case only for the given paths.
    pub fn with_ignore_case_for<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            let entry = self.property_matchers.entry(path.into()).or_default();
            entry.ignore_case = Some(true);
        }
        self
    }

    pub fn with_include_null_values(mut self) -> Self {
        self.null_handler = NullHandler::Include;
        self
    }

    pub fn with_ignore_null_values(mut self) -> Self {
        self.null_handler = NullHandler::Ignore;
        self
    }

    /// Override matching for one path. Replaces an earlier override.
    pub fn with_matcher<S: Into<String>>(mut self, path: S, matcher: PropertyMatcher) -> Self {
        self.property_matchers.insert(path.into(), matcher);
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_all_matching(&self) -> bool {
        self.mode == MatchMode::All
    }

    pub fn default_string_matcher(&self) -> StringMatcher {
        self.default_string_matcher
    }

    pub fn is_ignore_case_enabled(&self) -> bool {
        self.ignore_case
    }

    pub fn null_handler(&self) -> NullHandler {
        self.null_handler
    }

    pub fn ignored_paths(&self) -> &BTreeSet<String> {
        &self.ignored_paths
    }

    pub fn is_ignored_path(&self, path: &str) -> bool {
        self.ignored_paths.contains(path)
    }

    pub fn property_matcher(&self, path: &str) -> Option<&PropertyMatcher> {
        self.property_matchers.get(path)
    }

    /// Effective string matcher for `path`: the override, else the default.
    pub fn string_matcher_for(&self, path: &str) -> StringMatcher {
        self.property_matchers
            .get(path)
            .and_then(|m| m.string_matcher)
            .unwrap_or(self.default_string_matcher)
    }

    pub fn ignore_case_for(&self, path: &str) -> bool {
        self.property_matchers
            .get(path)
            .and_then(|m| m.ignore_case)
            .unwrap_or(self.ignore_case)
    }
}

/// A probe value plus the rules used to match stored values against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example<T> {
    probe: T,
    matcher: ExampleMatcher,
}

impl<T> Example<T> {
    pub fn of(probe: T) -> Self {
        Self {
            probe,
            matcher: ExampleMatcher::matching(),
        }
    }

    pub fn with_matcher(probe: T, matcher: ExampleMatcher) -> Self {
        Self { probe, matcher }
    }

    pub fn probe(&self) -> &T {
        &self.probe
    }

    pub fn matcher(&self) -> &ExampleMatcher {
        &self.matcher
    }

    pub fn into_parts(self) -> (T, ExampleMatcher) {
        (self.probe, self.matcher)
    }

    /// Re-type the probe. The matcher is carried over unchanged.
    pub fn map_probe<U, F>(self, f: F) -> Example<U>
    where
        F: FnOnce(T) -> U,
    {
        Example {
            probe: f(self.probe),
            matcher: self.matcher,
        }
    }
}
