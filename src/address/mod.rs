//! Splits a facility's free-text address into a building and a sub-locality.
//!
//! Addresses are typed by hand at hundreds of offices, so there is no grammar to
//! lean on. The only dependable signal is that trailing segments tend to repeat
//! the province and municipality we already know from the listing. Those are
//! stripped from the tail by an ordered list of [`StripRule`]s and whatever is
//! left decides the result.

pub mod registry;
pub mod rules;

pub use registry::LocaleRegistry;
pub use rules::{default_rules, AddressContext, ContainsMarker, ContextField, RestatesContext, StripRule};

use crate::metrics::DecomposerMetrics;
use crate::types::Decomposition;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

static PO_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bP\.\s*O\b\.?").expect("valid P.O. pattern"));
static SEGMENT_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*").expect("valid delimiter pattern"));

static DEFAULT_DECOMPOSER: Lazy<AddressDecomposer> = Lazy::new(AddressDecomposer::default);

/// Segment list as it stood after one stage of decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSnapshot {
    pub stage: String,
    pub segments: Vec<String>,
}

/// A decomposition together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompositionTrace {
    pub result: Decomposition,
    /// `split` first, then one entry per strip rule in application order.
    pub stages: Vec<StageSnapshot>,
    /// More than two segments survived stripping and the first two were kept.
    pub ambiguous: bool,
}

pub struct AddressDecomposer {
    registry: LocaleRegistry,
    rules: Vec<Box<dyn StripRule>>,
}

impl Default for AddressDecomposer {
    fn default() -> Self {
        Self::new(LocaleRegistry::builtin())
    }
}

impl std::fmt::Debug for AddressDecomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressDecomposer")
            .field("registry", &self.registry)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl AddressDecomposer {
    /// Decomposer with the standard province, municipality, "District" rule order.
    pub fn new(registry: LocaleRegistry) -> Self {
        Self::with_rules(registry, default_rules())
    }

    pub fn with_rules(registry: LocaleRegistry, rules: Vec<Box<dyn StripRule>>) -> Self {
        Self { registry, rules }
    }

    pub fn registry(&self) -> &LocaleRegistry {
        &self.registry
    }

    pub fn decompose(&self, address: &str, municipality: &str, province: &str) -> Decomposition {
        self.decompose_traced(address, municipality, province).result
    }

    pub fn decompose_traced(
        &self,
        address: &str,
        municipality: &str,
        province: &str,
    ) -> DecompositionTrace {
        if address.is_empty() {
            return DecompositionTrace {
                result: Decomposition::empty(),
                stages: Vec::new(),
                ambiguous: false,
            };
        }

        let normalized = normalize_po_marker(address);
        let mut segments = split_segments(&normalized);
        let mut stages = vec![StageSnapshot {
            stage: "split".to_string(),
            segments: segments.clone(),
        }];

        let ctx = AddressContext {
            municipality,
            province,
            registry: &self.registry,
        };
        for rule in &self.rules {
            strip_last_if(&mut segments, |segment| rule.matches(segment, &ctx));
            stages.push(StageSnapshot {
                stage: rule.name().to_string(),
                segments: segments.clone(),
            });
        }

        let ambiguous = segments.len() > 2;
        if ambiguous {
            DecomposerMetrics::record_ambiguous();
            warn!(
                address,
                municipality,
                province,
                stages = ?stages,
                "ambiguous address: {} segments remain, keeping the first two",
                segments.len()
            );
        }

        let mut remaining = segments.into_iter();
        let result = Decomposition::new(remaining.next(), remaining.next());

        DecompositionTrace {
            result,
            stages,
            ambiguous,
        }
    }
}

/// Decompose with the built-in locale registry and default strip rules.
pub fn decompose(address: &str, municipality: &str, province: &str) -> Decomposition {
    DEFAULT_DECOMPOSER.decompose(address, municipality, province)
}

/// Rewrites "P.O" / "P.O." / "p. o." to "PO" so the periods are not read as delimiters.
///
/// A word glued to the trailing period ("P.O.Box") is kept apart with a space.
pub fn normalize_po_marker(address: &str) -> String {
    PO_MARKER
        .replace_all(address, |caps: &regex::Captures<'_>| {
            let marker = caps.get(0).expect("whole match");
            let glued = marker.as_str().ends_with('.')
                && address[marker.end()..]
                    .chars()
                    .next()
                    .is_some_and(char::is_alphanumeric);
            if glued { "PO " } else { "PO" }
        })
        .into_owned()
}

/// Comma-delimited, trimmed, non-empty segments in original order.
pub fn split_segments(address: &str) -> Vec<String> {
    SEGMENT_DELIMITER
        .split(address)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_last_if<F>(segments: &mut Vec<String>, predicate: F) -> bool
where
    F: Fn(&str) -> bool,
{
    match segments.last() {
        Some(last) if predicate(last) => {
            segments.pop();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn po_marker_variants() {
        assert_eq!(normalize_po_marker("Lim Ket Kai Center P.O"), "Lim Ket Kai Center PO");
        assert_eq!(normalize_po_marker("P.O. Bldg, Rizal St."), "PO Bldg, Rizal St.");
        assert_eq!(normalize_po_marker("P. O. Compound"), "PO Compound");
        assert_eq!(normalize_po_marker("Poblacion"), "Poblacion");
    }

    #[test]
    fn po_marker_keeps_following_word_separate() {
        assert_eq!(normalize_po_marker("P.O.Box 12, Lanuza"), "PO Box 12, Lanuza");
        assert_eq!(normalize_po_marker("P.O., Lanuza"), "PO, Lanuza");
    }

    #[test]
    fn po_marker_is_case_insensitive() {
        assert_eq!(normalize_po_marker("p.o. bldg"), "PO bldg");
        assert_eq!(normalize_po_marker("Bislig p.O"), "Bislig PO");
    }

    #[test]
    fn split_handles_missing_space_and_empty_pieces() {
        assert_eq!(
            split_segments("Municipal Bldg.,Lanuza, Surigao del Sur"),
            vec!["Municipal Bldg.", "Lanuza", "Surigao del Sur"]
        );
        assert_eq!(split_segments("A,, B ,"), vec!["A", "B"]);
    }

    #[test]
    fn strip_only_touches_the_tail() {
        let mut segments = vec!["Lanuza".to_string(), "Capitol".to_string()];
        assert!(!strip_last_if(&mut segments, |s| s == "Lanuza"));
        assert_eq!(segments.len(), 2);
        assert!(strip_last_if(&mut segments, |s| s == "Capitol"));
        assert_eq!(segments, vec!["Lanuza"]);
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let decomposer = AddressDecomposer::with_rules(
            LocaleRegistry::empty(),
            vec![Box::new(ContainsMarker("Philippines".to_string()))],
        );
        let result = decomposer.decompose("City Hall, Poblacion, Philippines", "Poblacion", "X");
        assert_eq!(
            result,
            Decomposition::new(Some("City Hall".into()), Some("Poblacion".into()))
        );
    }

    #[test]
    fn trace_records_every_stage() {
        let decomposer = AddressDecomposer::default();
        let trace = decomposer.decompose_traced(
            "Municipal Bldg.,Lanuza, Surigao del Sur",
            "Lanuza",
            "Surigao del Sur",
        );
        let names: Vec<&str> = trace.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["split", "province", "municipality", "District"]);
        assert_eq!(trace.stages[1].segments, vec!["Municipal Bldg.", "Lanuza"]);
        assert!(!trace.ambiguous);
    }
}
