use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use regex::Regex;
use smallvec::SmallVec;

use crate::common::data::read_csv;

/// Word-level folds applied after uppercasing, so "42nd Street" and
/// "42 ST" canonicalize identically across source datasets.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("AVENUE", "AV"),
    ("AVE", "AV"),
    ("STREET", "ST"),
    ("ROAD", "RD"),
    ("SQUARE", "SQ"),
    ("BOULEVARD", "BLVD"),
    ("PARKWAY", "PKWY"),
    ("PLACE", "PL"),
    ("HEIGHTS", "HTS"),
    ("CENTER", "CTR"),
    ("FORT", "FT"),
];

/// Deterministic station-name canonicalization. One instance is built per
/// run and shared; the regexes are compiled once.
pub struct NameNormalizer {
    ordinal: Regex,
    strip: Regex,
    hyphen: Regex,
    spaces: Regex,
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self {
            ordinal: Regex::new(r"\b(\d+)(?:ST|ND|RD|TH)\b").unwrap(),
            strip: Regex::new(r"[^A-Z0-9 /\-]").unwrap(),
            hyphen: Regex::new(r"\s*-\s*").unwrap(),
            spaces: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Canonical form of a raw station name. Uppercase, punctuation folded,
    /// ordinal suffixes dropped, street-type abbreviations applied.
    pub fn canonicalize(&self, raw: &str) -> String {
        let upper = raw.trim().to_uppercase().replace('&', " AND ");
        let stripped = self.strip.replace_all(&upper, "");
        let no_ordinals = self.ordinal.replace_all(&stripped, "$1");
        let tight_hyphens = self.hyphen.replace_all(&no_ordinals, "-");
        let collapsed = self.spaces.replace_all(tight_hyphens.trim(), " ");

        collapsed
            .split(' ')
            .map(|word| {
                ABBREVIATIONS
                    .iter()
                    .find(|(long, _)| *long == word)
                    .map(|(_, short)| *short)
                    .unwrap_or(word)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical line identifiers from a raw line string such as "4/5/6",
/// "A-C-E", or "N, Q, R, W". Order-preserving, deduplicated.
pub fn canonical_lines(raw: &str) -> SmallVec<[String; 4]> {
    let mut lines: SmallVec<[String; 4]> = SmallVec::new();
    for token in raw.split(|c: char| c == ',' || c == '/' || c == '-' || c.is_whitespace()) {
        let line = token.trim().to_uppercase();
        if !line.is_empty() && !lines.iter().any(|existing| *existing == line) {
            lines.push(line);
        }
    }
    lines
}

/// How a raw name was resolved to a canonical station.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    /// Canonicalized form hit the registry directly.
    Exact { index: usize },
    /// Resolved through the alias table.
    Alias { index: usize },
    /// Closest registry entry by normalized Levenshtein similarity.
    Fuzzy { index: usize, confidence: f64 },
}

impl NameMatch {
    pub fn index(&self) -> usize {
        match self {
            NameMatch::Exact { index } | NameMatch::Alias { index } | NameMatch::Fuzzy { index, .. } => *index,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            NameMatch::Exact { .. } | NameMatch::Alias { .. } => 1.0,
            NameMatch::Fuzzy { confidence, .. } => *confidence,
        }
    }
}

/// Resolves raw station names from any source dataset against the canonical
/// registry built from the map extract: exact lookup, then aliases, then
/// fuzzy matching above a configured similarity threshold. Names that fail
/// all three are reported unresolved, never guessed.
pub struct NameResolver {
    normalizer: NameNormalizer,
    canonical: Vec<String>,
    index: AHashMap<String, usize>,
    aliases: AHashMap<String, usize>,
    threshold: f64,
}

impl NameResolver {
    /// Build a resolver over canonical names (canonicalized and sorted, so
    /// fuzzy tie-breaks are reproducible).
    pub fn new<I, S>(names: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalizer = NameNormalizer::new();
        let mut canonical: Vec<String> =
            names.into_iter().map(|name| normalizer.canonicalize(name.as_ref())).collect();
        canonical.sort();
        canonical.dedup();

        let index = canonical
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self { normalizer, canonical, index, aliases: AHashMap::new(), threshold }
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn canonical_name(&self, index: usize) -> &str {
        &self.canonical[index]
    }

    /// Register an alias for a canonical name already in the registry.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) -> Result<()> {
        let key = self.normalizer.canonicalize(canonical);
        let &index = self
            .index
            .get(&key)
            .with_context(|| format!("alias target {canonical:?} is not a known station"))?;
        self.aliases.insert(self.normalizer.canonicalize(alias), index);
        Ok(())
    }

    /// Load aliases from a two-column CSV (`alias`, `canonical`). Returns the
    /// number of aliases registered.
    pub fn load_aliases(&mut self, path: &Path) -> Result<usize> {
        let df = read_csv(path)?;
        let alias_col = df.column("alias")?.str()?.clone();
        let canonical_col = df.column("canonical")?.str()?.clone();

        let mut added = 0;
        for i in 0..df.height() {
            let (Some(alias), Some(canonical)) = (alias_col.get(i), canonical_col.get(i)) else {
                continue;
            };
            self.add_alias(alias, canonical)?;
            added += 1;
        }
        Ok(added)
    }

    /// Resolve a raw name, or return `None` if no strategy clears the
    /// threshold. Fuzzy ties go to the lexicographically first registry
    /// entry (the registry is sorted).
    pub fn resolve(&self, raw: &str) -> Option<NameMatch> {
        let key = self.normalizer.canonicalize(raw);
        if let Some(&index) = self.index.get(&key) {
            return Some(NameMatch::Exact { index });
        }
        if let Some(&index) = self.aliases.get(&key) {
            return Some(NameMatch::Alias { index });
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.canonical.iter().enumerate() {
            let score = similarity(&key, candidate);
            if best.is_none_or(|(_, current)| score > current) {
                best = Some((index, score));
            }
        }
        match best {
            Some((index, confidence)) if confidence >= self.threshold => {
                Some(NameMatch::Fuzzy { index, confidence })
            }
            _ => None,
        }
    }
}

/// Normalized Levenshtein similarity in [0, 1]: 1 minus edit distance over
/// the longer length. Both names are expected in canonical form.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
