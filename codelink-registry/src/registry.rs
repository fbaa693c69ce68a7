//! SBS registry reference data loader.
//!
//! Parses the standardized billing registry CSV into `RegistryEntry` structs
//! with pre-computed token vectors. Expected CSV columns:
//!   code, description, keywords, aliases
//! `keywords` and `aliases` are semicolon-separated; both may be empty.

use std::collections::HashMap;
use std::io::Read;

use ndarray::Array1;
use serde::Deserialize;

use crate::similarity::{token_vector, tokenize};
use crate::thresholds::VECTOR_DIMENSIONS;

/// One standardized billing code with its canonical description.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    /// Standardized SBS code, e.g. "SBS-9021".
    pub code: String,
    /// Canonical human-readable description.
    pub description: String,
    /// Facility-local codes known to map to this entry. Used by the
    /// degraded cached-alias matcher when the full matcher is unavailable.
    pub aliases: Vec<String>,
    /// Tokens from description plus curated keywords, pre-computed once.
    pub tokens: Vec<String>,
    /// Hashed token vector, pre-computed once at load time.
    pub vector: Array1<f64>,
}

impl RegistryEntry {
    /// Build an entry, tokenizing the description and keywords eagerly so
    /// matching never re-tokenizes reference data per request.
    pub fn new(code: String, description: String, keywords: Vec<String>) -> Self {
        let mut tokens = tokenize(&description);
        for kw in &keywords {
            for t in tokenize(kw) {
                if !tokens.contains(&t) {
                    tokens.push(t);
                }
            }
        }
        let vector = token_vector(&tokens, VECTOR_DIMENSIONS);
        Self {
            code,
            description,
            aliases: Vec::new(),
            tokens,
            vector,
        }
    }

    /// Attach facility-local aliases.
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

/// The loaded registry plus an alias lookup index.
#[derive(Clone, Debug, Default)]
pub struct SbsRegistry {
    pub entries: Vec<RegistryEntry>,
    /// Uppercased facility-local alias → entry index.
    alias_index: HashMap<String, usize>,
}

impl SbsRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        let mut alias_index = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            for alias in &entry.aliases {
                alias_index.insert(alias.trim().to_uppercase(), i);
            }
        }
        Self {
            entries,
            alias_index,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup of a facility-local code against the alias table.
    /// This is the cached heuristic path used when the matcher degrades.
    pub fn lookup_alias(&self, internal_code: &str) -> Option<&RegistryEntry> {
        self.alias_index
            .get(&internal_code.trim().to_uppercase())
            .map(|&i| &self.entries[i])
    }

    /// Exact lookup of an SBS code.
    pub fn lookup_code(&self, code: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.code == code)
    }
}

/// Raw CSV row shape.
#[derive(Debug, Deserialize)]
struct RegistryRow {
    code: String,
    description: String,
    #[serde(default)]
    keywords: String,
    #[serde(default)]
    aliases: String,
}

fn split_list(field: &str) -> Vec<String> {
    field
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load the registry from a CSV reader.
pub fn load_registry<R: Read>(reader: R) -> Result<SbsRegistry, String> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let row: RegistryRow =
            result.map_err(|e| format!("registry CSV parse error at line {}: {}", line_num + 2, e))?;
        if row.code.is_empty() {
            return Err(format!("registry CSV line {}: empty code", line_num + 2));
        }
        let entry = RegistryEntry::new(row.code, row.description, split_list(&row.keywords))
            .with_aliases(split_list(&row.aliases));
        entries.push(entry);
    }

    Ok(SbsRegistry::new(entries))
}

/// Load the registry from a CSV file path.
pub fn load_registry_file(path: &str) -> Result<SbsRegistry, String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("failed to open '{}': {}", path, e))?;
    load_registry(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
code,description,keywords,aliases
SBS-9021,\"Respiratory Viral Panel, Multiplex PCR, 3-5 Targets\",rapid;molecular,LAB_RVP;NEW_LAB_X1
SBS-1100,\"Knee Arthroscopy, Partial Meniscectomy\",,ORTHO_KA
SBS-3300,\"Complete Blood Count, Automated\",cbc;hemogram,
";

    #[test]
    fn load_sample_csv() {
        let registry = load_registry(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.entries[0].code, "SBS-9021");
        assert!(registry.entries[0].tokens.contains(&"respiratory".to_string()));
        // curated keywords are folded into the token set
        assert!(registry.entries[0].tokens.contains(&"rapid".to_string()));
        assert!(registry.entries[2].tokens.contains(&"cbc".to_string()));
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let registry = load_registry(SAMPLE_CSV.as_bytes()).unwrap();
        let hit = registry.lookup_alias("new_lab_x1").expect("alias should resolve");
        assert_eq!(hit.code, "SBS-9021");
        assert!(registry.lookup_alias("UNKNOWN_CODE").is_none());
    }

    #[test]
    fn empty_code_is_rejected() {
        let bad = "code,description,keywords,aliases\n,Missing Code,,\n";
        let err = load_registry(bad.as_bytes()).unwrap_err();
        assert!(err.contains("empty code"), "got: {}", err);
    }

    #[test]
    fn lookup_code_finds_entry() {
        let registry = load_registry(SAMPLE_CSV.as_bytes()).unwrap();
        assert!(registry.lookup_code("SBS-1100").is_some());
        assert!(registry.lookup_code("SBS-0000").is_none());
    }
}
