//! Loading strategies.

use serde::Deserialize;
use std::collections::BTreeSet;
use tessera_schema::AttributeDef;

/// Per-path decision of what a read brings back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loading {
    /// Select the column and, for references, join and load the target.
    Loaded,
    /// Select the column; a reference target is resolved on first access.
    LazyLoaded,
    /// Leave the column out.
    NotLoaded,
}

/// Decides the loading of every attribute reached by a read.
pub trait LoadedAttributes {
    /// `path` is the dotted attribute path from the read's root.
    fn strategy(&self, attr: &AttributeDef, path: &str) -> Loading;

    /// Returns true if some required path lies strictly beneath `path`.
    fn requires_beneath(&self, _path: &str) -> bool {
        false
    }
}

/// The two stock strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingMode {
    /// Load every reachable reference.
    #[default]
    Eager,
    /// Load scalars, leave references lazy.
    Lazy,
}

impl LoadedAttributes for LoadingMode {
    fn strategy(&self, attr: &AttributeDef, _path: &str) -> Loading {
        match self {
            LoadingMode::Eager => Loading::Loaded,
            LoadingMode::Lazy if attr.kind.is_reference() => Loading::LazyLoaded,
            LoadingMode::Lazy => Loading::Loaded,
        }
    }
}

/// Forces every path on the way to a required path to `Loaded`.
#[derive(Debug, Clone)]
pub struct WithRequired<L> {
    base: L,
    required: BTreeSet<String>,
}

impl<L: LoadedAttributes> WithRequired<L> {
    pub fn new(base: L, required: BTreeSet<String>) -> Self {
        Self { base, required }
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }
}

impl<L: LoadedAttributes> LoadedAttributes for WithRequired<L> {
    fn strategy(&self, attr: &AttributeDef, path: &str) -> Loading {
        let needed = self
            .required
            .iter()
            .any(|r| r == path || is_beneath(r, path));
        if needed {
            Loading::Loaded
        } else {
            self.base.strategy(attr, path)
        }
    }

    fn requires_beneath(&self, path: &str) -> bool {
        self.required.iter().any(|r| is_beneath(r, path))
    }
}

fn is_beneath(required: &str, path: &str) -> bool {
    required
        .strip_prefix(path)
        .is_some_and(|rest| rest.starts_with('.'))
}
