use std::collections::{BTreeMap, BTreeSet};

/// Alternate spellings seen in facility addresses, keyed by canonical region name.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Cotabato City", "Cotabato Citu"),
    ("Cagayan de Oro City", "CDeO"),
    ("Metro Cagayan De Oro", "CDeO"),
];

/// Maps a canonical region name to the alternate spellings that stand in for it.
///
/// Keys are matched case-sensitively. Callers compare the returned alternates
/// against address text case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleRegistry {
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl LocaleRegistry {
    /// Registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the spellings known from the directory data.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (canonical, alternate) in BUILTIN_ALIASES {
            registry.insert(*canonical, *alternate);
        }
        registry
    }

    pub fn insert(&mut self, canonical: impl Into<String>, alternate: impl Into<String>) {
        let alternate = alternate.into();
        if alternate.trim().is_empty() {
            return;
        }
        self.aliases
            .entry(canonical.into())
            .or_default()
            .insert(alternate);
    }

    /// Merge another table over this one. Alternates accumulate; nothing is removed.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (canonical, alternates) in entries {
            let canonical = canonical.into();
            for alternate in alternates {
                self.insert(canonical.clone(), alternate);
            }
        }
    }

    /// The first registered alternate for `region`, if any.
    pub fn alias_for(&self, region: &str) -> Option<&str> {
        self.aliases
            .get(region)
            .and_then(|set| set.iter().next())
            .map(String::as_str)
    }

    /// Every registered alternate for `region`. Empty for most regions.
    pub fn aliases_for<'a>(&'a self, region: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .get(region)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_knows_cotabato_misspelling() {
        let registry = LocaleRegistry::builtin();
        assert_eq!(registry.alias_for("Cotabato City"), Some("Cotabato Citu"));
    }

    #[test]
    fn lookup_is_case_sensitive_on_key() {
        let registry = LocaleRegistry::builtin();
        assert_eq!(registry.alias_for("cotabato city"), None);
        assert_eq!(registry.alias_for("Maguindanao"), None);
    }

    #[test]
    fn extend_accumulates_alternates() {
        let mut registry = LocaleRegistry::builtin();
        registry.extend(vec![("Cotabato City", vec!["Cot. City", ""])]);

        let all: Vec<&str> = registry.aliases_for("Cotabato City").collect();
        assert_eq!(all, vec!["Cot. City", "Cotabato Citu"]);
    }
}
