//! Bundle catalog reference data loader.
//!
//! A bundle is a fixed-price grouping of SBS codes offered as an alternative
//! to itemized billing. Expected CSV columns:
//!   id, name, bundle_price, member_codes
//! `member_codes` is semicolon-separated and must be non-empty.

use std::collections::BTreeSet;
use std::io::Read;

use serde::{Deserialize, Serialize};

/// A fixed-price procedure grouping. Read-only reference data to the engine.
#[derive(Clone, Debug, Serialize)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    /// All SBS codes that must be present on the claim for coverage.
    pub member_codes: BTreeSet<String>,
    /// The fixed price billed instead of the itemized sum.
    pub bundle_price: f64,
}

impl Bundle {
    /// True when every member code appears in the given code set.
    pub fn covered_by(&self, codes: &BTreeSet<String>) -> bool {
        self.member_codes.is_subset(codes)
    }
}

#[derive(Debug, Deserialize)]
struct BundleRow {
    id: String,
    name: String,
    bundle_price: f64,
    member_codes: String,
}

/// Load the bundle catalog from a CSV reader.
pub fn load_bundles<R: Read>(reader: R) -> Result<Vec<Bundle>, String> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bundles = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let row: BundleRow =
            result.map_err(|e| format!("bundle CSV parse error at line {}: {}", line_num + 2, e))?;

        let member_codes: BTreeSet<String> = row
            .member_codes
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if member_codes.is_empty() {
            return Err(format!(
                "bundle CSV line {}: bundle '{}' has no member codes",
                line_num + 2,
                row.id
            ));
        }
        if row.bundle_price < 0.0 {
            return Err(format!(
                "bundle CSV line {}: bundle '{}' has negative price",
                line_num + 2,
                row.id
            ));
        }

        bundles.push(Bundle {
            id: row.id,
            name: row.name,
            member_codes,
            bundle_price: row.bundle_price,
        });
    }

    Ok(bundles)
}

/// Load the bundle catalog from a CSV file path.
pub fn load_bundles_file(path: &str) -> Result<Vec<Bundle>, String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("failed to open '{}': {}", path, e))?;
    load_bundles(file)
}
