//! Interface name filter applied to IO counter records before emission.

use std::collections::HashSet;
use std::fmt;

use regex::RegexSet;

use crate::config::{ConfigError, MatchConfig, MatchType};
use crate::source::IoCountersRecord;

/// Which of the two filter sets a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSetKind {
    Include,
    Exclude,
}

impl fmt::Display for FilterSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSetKind::Include => write!(f, "include"),
            FilterSetKind::Exclude => write!(f, "exclude"),
        }
    }
}

/// Compiled set of interface name patterns.
#[derive(Debug, Clone)]
pub enum FilterSet {
    Strict(HashSet<String>),
    Regexp(RegexSet),
}

impl FilterSet {
    /// Compiles the patterns of `config`. Returns `None` when the set is empty.
    pub fn from_config(
        config: &MatchConfig,
        kind: FilterSetKind,
    ) -> Result<Option<Self>, ConfigError> {
        if config.interfaces.is_empty() {
            return Ok(None);
        }
        let set = match config.match_type {
            MatchType::Strict => FilterSet::Strict(config.interfaces.iter().cloned().collect()),
            MatchType::Regexp => {
                let set = RegexSet::new(&config.interfaces)
                    .map_err(|source| ConfigError::Filter { set: kind, source })?;
                FilterSet::Regexp(set)
            }
        };
        Ok(Some(set))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            FilterSet::Strict(names) => names.contains(name),
            FilterSet::Regexp(set) => set.is_match(name),
        }
    }
}

/// Include/exclude predicate over interface names.
///
/// A name passes when it matches the include set (or there is none) and does
/// not match the exclude set.
#[derive(Debug, Clone, Default)]
pub struct InterfaceFilter {
    include: Option<FilterSet>,
    exclude: Option<FilterSet>,
}

impl InterfaceFilter {
    pub fn from_config(include: &MatchConfig, exclude: &MatchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include: FilterSet::from_config(include, FilterSetKind::Include)?,
            exclude: FilterSet::from_config(exclude, FilterSetKind::Exclude)?,
        })
    }

    pub fn is_pass_through(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|set| set.matches(name));
        let excluded = self.exclude.as_ref().is_some_and(|set| set.matches(name));
        included && !excluded
    }

    /// Keeps the records whose interface passes, in input order.
    pub fn filter_by_interface(&self, records: Vec<IoCountersRecord>) -> Vec<IoCountersRecord> {
        if self.is_pass_through() {
            return records;
        }
        records.into_iter().filter(|r| self.matches(&r.name)).collect()
    }
}
