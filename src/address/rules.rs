use super::registry::LocaleRegistry;

/// Structured context already known for the address being decomposed.
#[derive(Debug, Clone, Copy)]
pub struct AddressContext<'a> {
    pub municipality: &'a str,
    pub province: &'a str,
    pub registry: &'a LocaleRegistry,
}

/// Decides whether the trailing segment of an address is noise.
///
/// Rules only ever see the current last segment; the decomposer removes at
/// most one segment per rule.
pub trait StripRule: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, segment: &str, ctx: &AddressContext<'_>) -> bool;
}

/// Which piece of known context a [`RestatesContext`] rule compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Province,
    Municipality,
}

/// Strips a segment that restates the province or municipality, verbatim or via an alias.
#[derive(Debug, Clone, Copy)]
pub struct RestatesContext(pub ContextField);

impl StripRule for RestatesContext {
    fn name(&self) -> &str {
        match self.0 {
            ContextField::Province => "province",
            ContextField::Municipality => "municipality",
        }
    }

    fn matches(&self, segment: &str, ctx: &AddressContext<'_>) -> bool {
        let known = match self.0 {
            ContextField::Province => ctx.province,
            ContextField::Municipality => ctx.municipality,
        };
        contains_ignore_case(segment, known)
            || ctx
                .registry
                .aliases_for(known)
                .any(|alias| contains_ignore_case(segment, alias))
    }
}

/// Strips a segment containing a fixed marker word, e.g. "District".
#[derive(Debug, Clone)]
pub struct ContainsMarker(pub String);

impl StripRule for ContainsMarker {
    fn name(&self) -> &str {
        &self.0
    }

    fn matches(&self, segment: &str, _ctx: &AddressContext<'_>) -> bool {
        contains_ignore_case(segment, &self.0)
    }
}

/// Province, then municipality, then "District".
pub fn default_rules() -> Vec<Box<dyn StripRule>> {
    vec![
        Box::new(RestatesContext(ContextField::Province)),
        Box::new(RestatesContext(ContextField::Municipality)),
        Box::new(ContainsMarker("District".to_string())),
    ]
}

/// Case-insensitive substring test. An empty needle never matches.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
