// Import/export - the catalog as a JSON document.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::catalog::{Catalog, Quote};

/// Default name of the exported document.
pub const DEFAULT_EXPORT_FILE: &str = "quotes.json";

// ============================================================================
// IMPORT ERRORS
// ============================================================================

/// Why an imported document was rejected. Parse failures and shape
/// failures are distinct so callers can report them differently.
#[derive(Debug)]
pub enum ImportError {
    /// The document is not parseable JSON.
    Malformed(serde_json::Error),
    /// The document parsed, but the top-level value is not an array.
    NotAnArray,
    /// An entry lacks a non-empty `text` or `category`.
    InvalidEntry { index: usize },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Malformed(err) => write!(f, "could not parse document as JSON: {}", err),
            ImportError::NotAnArray => {
                write!(f, "imported document must be a JSON array of quotes")
            }
            ImportError::InvalidEntry { index } => {
                write!(f, "entry {} is missing a non-empty text or category", index)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// EXPORT
// ============================================================================

/// Serialize the whole catalog as a pretty-printed JSON array.
pub fn export_json(catalog: &Catalog) -> Result<String> {
    let document = serde_json::to_string_pretty(catalog.quotes())?;
    Ok(document)
}

pub fn export_to_file(catalog: &Catalog, path: &Path) -> Result<()> {
    let document = export_json(catalog)?;
    std::fs::write(path, document)
        .with_context(|| format!("could not write export file {}", path.display()))?;
    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

/// Parse untrusted text and append its quotes to the catalog. Validation
/// runs over the whole document before any append, so a rejected import
/// leaves the catalog untouched. Returns the number of imported quotes.
pub fn import_str(catalog: &mut Catalog, raw: &str) -> Result<usize, ImportError> {
    let value: Value = serde_json::from_str(raw).map_err(ImportError::Malformed)?;

    let Value::Array(entries) = value else {
        return Err(ImportError::NotAnArray);
    };

    let mut imported = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let text = entry
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        let category = entry
            .get("category")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");

        if text.is_empty() || category.is_empty() {
            return Err(ImportError::InvalidEntry { index });
        }

        imported.push(Quote::new(text, category));
    }

    let count = imported.len();
    catalog.append_all(imported);
    Ok(count)
}

/// Read a user-selected file as UTF-8 and import it.
pub fn import_file(catalog: &mut Catalog, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read import file {}", path.display()))?;
    let count = import_str(catalog, &raw)?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterOptions;

    fn catalog_with(quotes: Vec<Quote>) -> Catalog {
        Catalog::from_quotes(quotes, FilterOptions::default())
    }

    #[test]
    fn test_export_then_import_is_superset_preserving() {
        let original = vec![Quote::new("A", "One"), Quote::new("B", "Two")];
        let exported = export_json(&catalog_with(original.clone())).unwrap();

        let mut target = catalog_with(vec![Quote::new("existing", "Zero")]);
        let count = import_str(&mut target, &exported).unwrap();

        assert_eq!(count, 2);
        assert_eq!(target.len(), 3);
        for quote in &original {
            assert!(target.quotes().contains(quote));
        }
    }

    #[test]
    fn test_import_non_array_is_rejected_without_mutation() {
        let mut catalog = catalog_with(vec![Quote::new("keep", "Me")]);

        let result = import_str(&mut catalog, r#"{"a": 1}"#);

        assert!(matches!(result, Err(ImportError::NotAnArray)));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_import_malformed_json_is_rejected() {
        let mut catalog = catalog_with(vec![]);

        let result = import_str(&mut catalog, "not json at all {");

        assert!(matches!(result, Err(ImportError::Malformed(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_import_entry_missing_fields_aborts_whole_import() {
        let mut catalog = catalog_with(vec![]);
        let document = r#"[
            {"text": "valid", "category": "Ok"},
            {"text": "", "category": "Bad"},
            {"text": "also valid", "category": "Ok"}
        ]"#;

        let result = import_str(&mut catalog, document);

        assert!(matches!(result, Err(ImportError::InvalidEntry { index: 1 })));
        assert!(catalog.is_empty(), "partial imports must not happen");
    }

    #[test]
    fn test_import_entry_with_wrong_field_type_is_invalid() {
        let mut catalog = catalog_with(vec![]);
        let document = r#"[{"text": 42, "category": "Num"}]"#;

        let result = import_str(&mut catalog, document);

        assert!(matches!(result, Err(ImportError::InvalidEntry { index: 0 })));
    }

    #[test]
    fn test_import_trims_entry_fields() {
        let mut catalog = catalog_with(vec![]);

        let count = import_str(
            &mut catalog,
            r#"[{"text": "  padded  ", "category": " C "}]"#,
        )
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(catalog.quotes()[0], Quote::new("padded", "C"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILE);

        let source = catalog_with(vec![Quote::new("on disk", "File")]);
        export_to_file(&source, &path).unwrap();

        let mut target = catalog_with(vec![]);
        let count = import_file(&mut target, &path).unwrap();

        assert_eq!(count, 1);
        assert_eq!(target.quotes(), source.quotes());
    }

    #[test]
    fn test_import_missing_file_reports_read_error() {
        let mut catalog = catalog_with(vec![]);

        let result = import_file(&mut catalog, Path::new("/nonexistent/quotes.json"));

        assert!(result.is_err());
        assert!(catalog.is_empty());
    }
}
