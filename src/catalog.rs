// Quote Catalog - the in-memory ordered collection of quotes
// Insertion order is preserved; categories are derived, never stored.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::QuoteStore;

// ============================================================================
// QUOTE
// ============================================================================

/// A single quote record. `text` doubles as the matching key during
/// reconciliation; there is no separate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub category: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Quote {
            text: text.into(),
            category: category.into(),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyText,
    EmptyCategory,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyText => write!(f, "quote text must not be empty"),
            ValidationError::EmptyCategory => write!(f, "quote category must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// FILTERING
// ============================================================================

/// How category comparisons behave during filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Compare categories after lower-casing both sides. Off by default.
    pub case_insensitive: bool,
}

impl FilterOptions {
    pub fn matches(&self, category: &str, wanted: &str) -> bool {
        if self.case_insensitive {
            category.eq_ignore_ascii_case(wanted)
        } else {
            category == wanted
        }
    }
}

/// Either the "all" sentinel or a single category restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteFilter {
    All,
    Category(String),
}

impl QuoteFilter {
    pub const ALL_SENTINEL: &'static str = "all";

    /// Parse a persisted or user-supplied filter value.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::ALL_SENTINEL) {
            QuoteFilter::All
        } else {
            QuoteFilter::Category(trimmed.to_string())
        }
    }

    /// The string form that gets persisted under the filter key.
    pub fn as_str(&self) -> &str {
        match self {
            QuoteFilter::All => Self::ALL_SENTINEL,
            QuoteFilter::Category(name) => name,
        }
    }
}

impl std::fmt::Display for QuoteFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteFilter::All => write!(f, "All Categories"),
            QuoteFilter::Category(name) => write!(f, "{}", name),
        }
    }
}

// ============================================================================
// CATALOG
// ============================================================================

pub struct Catalog {
    quotes: Vec<Quote>,
    options: FilterOptions,
}

impl Catalog {
    pub fn new(options: FilterOptions) -> Self {
        Catalog {
            quotes: Vec::new(),
            options,
        }
    }

    pub fn from_quotes(quotes: Vec<Quote>, options: FilterOptions) -> Self {
        Catalog { quotes, options }
    }

    /// The built-in seed collection used when the store holds nothing yet.
    pub fn default_quotes() -> Vec<Quote> {
        vec![
            Quote::new(
                "The only limit to our realization of tomorrow is our doubts of today.",
                "Motivation",
            ),
            Quote::new(
                "Life is what happens when you're busy making other plans.",
                "Life",
            ),
            Quote::new(
                "Success is not final, failure is not fatal: It is the courage to continue that counts.",
                "Success",
            ),
        ]
    }

    /// Load the persisted collection, seeding and persisting the defaults
    /// when the store is empty. Storage absence is a normal case, not a
    /// failure.
    pub fn load(store: &QuoteStore, options: FilterOptions) -> Result<Self> {
        let quotes = match store.load_quotes()? {
            Some(quotes) if !quotes.is_empty() => quotes,
            _ => {
                let defaults = Self::default_quotes();
                store.save_quotes(&defaults)?;
                tracing::info!(count = defaults.len(), "seeded default quote collection");
                defaults
            }
        };

        Ok(Catalog { quotes, options })
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Validate and append a user-entered quote. Both fields are trimmed;
    /// an empty field rejects the quote without mutating the catalog.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote, ValidationError> {
        let text = text.trim();
        let category = category.trim();

        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }

        let quote = Quote::new(text, category);
        self.quotes.push(quote.clone());
        Ok(quote)
    }

    /// Append an already-validated quote (merge and import paths).
    pub fn append(&mut self, quote: Quote) {
        self.quotes.push(quote);
    }

    pub fn append_all(&mut self, quotes: Vec<Quote>) {
        self.quotes.extend(quotes);
    }

    /// Distinct category values in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for quote in &self.quotes {
            if !categories.contains(&quote.category) {
                categories.push(quote.category.clone());
            }
        }
        categories
    }

    /// The subsequence matching the filter, in catalog order. The "all"
    /// sentinel returns the whole catalog.
    pub fn filter(&self, filter: &QuoteFilter) -> Vec<Quote> {
        match filter {
            QuoteFilter::All => self.quotes.clone(),
            QuoteFilter::Category(wanted) => self
                .quotes
                .iter()
                .filter(|quote| self.options.matches(&quote.category, wanted))
                .cloned()
                .collect(),
        }
    }

    /// First quote whose text matches exactly. Text comparison stays
    /// case-sensitive regardless of the filter options.
    pub fn position_by_text(&self, text: &str) -> Option<usize> {
        self.quotes.iter().position(|quote| quote.text == text)
    }

    pub fn replace_at(&mut self, index: usize, quote: Quote) {
        if let Some(slot) = self.quotes.get_mut(index) {
            *slot = quote;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::from_quotes(
            vec![
                Quote::new("A", "Motivation"),
                Quote::new("B", "Life"),
                Quote::new("C", "Motivation"),
            ],
            FilterOptions::default(),
        )
    }

    #[test]
    fn test_add_appends_and_trims() {
        let mut catalog = Catalog::new(FilterOptions::default());

        let added = catalog.add("  Stay hungry.  ", " Inspiration ").unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(added.text, "Stay hungry.");
        assert_eq!(added.category, "Inspiration");
        assert_eq!(
            catalog.filter(&QuoteFilter::Category("Inspiration".to_string())),
            vec![added]
        );
    }

    #[test]
    fn test_add_rejects_empty_fields() {
        let mut catalog = sample_catalog();

        assert_eq!(catalog.add("   ", "Life"), Err(ValidationError::EmptyText));
        assert_eq!(catalog.add("D", "  "), Err(ValidationError::EmptyCategory));
        assert_eq!(catalog.len(), 3, "failed add must not mutate the catalog");
    }

    #[test]
    fn test_categories_distinct_first_seen_order() {
        let catalog = sample_catalog();

        assert_eq!(catalog.categories(), vec!["Motivation", "Life"]);
    }

    #[test]
    fn test_filter_all_returns_whole_catalog_in_order() {
        let catalog = sample_catalog();

        let all = catalog.filter(&QuoteFilter::All);
        assert_eq!(all, catalog.quotes().to_vec());
    }

    #[test]
    fn test_filter_by_category_is_case_sensitive_by_default() {
        let catalog = sample_catalog();

        let motivation = catalog.filter(&QuoteFilter::Category("Motivation".to_string()));
        assert_eq!(motivation.len(), 2);
        assert_eq!(motivation[0].text, "A");
        assert_eq!(motivation[1].text, "C");

        let lowercase = catalog.filter(&QuoteFilter::Category("motivation".to_string()));
        assert!(lowercase.is_empty());
    }

    #[test]
    fn test_filter_case_insensitive_option() {
        let catalog = Catalog::from_quotes(
            vec![Quote::new("A", "Motivation")],
            FilterOptions {
                case_insensitive: true,
            },
        );

        let matched = catalog.filter(&QuoteFilter::Category("MOTIVATION".to_string()));
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_filter_parse_sentinel() {
        assert_eq!(QuoteFilter::parse("all"), QuoteFilter::All);
        assert_eq!(QuoteFilter::parse(" All "), QuoteFilter::All);
        assert_eq!(QuoteFilter::parse(""), QuoteFilter::All);
        assert_eq!(
            QuoteFilter::parse("Life"),
            QuoteFilter::Category("Life".to_string())
        );
        assert_eq!(QuoteFilter::All.as_str(), "all");
    }

    #[test]
    fn test_position_by_text_exact_match() {
        let catalog = sample_catalog();

        assert_eq!(catalog.position_by_text("B"), Some(1));
        assert_eq!(catalog.position_by_text("b"), None);
        assert_eq!(catalog.position_by_text("missing"), None);
    }

    #[test]
    fn test_load_seeds_defaults_once() {
        let store = QuoteStore::open_in_memory().unwrap();

        let catalog = Catalog::load(&store, FilterOptions::default()).unwrap();
        assert_eq!(catalog.len(), 3);

        // Seeds were persisted, so a second load reads them back unchanged.
        let reloaded = Catalog::load(&store, FilterOptions::default()).unwrap();
        assert_eq!(reloaded.quotes(), catalog.quotes());
    }

    #[test]
    fn test_load_prefers_persisted_collection() {
        let store = QuoteStore::open_in_memory().unwrap();
        store
            .save_quotes(&[Quote::new("Persisted", "Custom")])
            .unwrap();

        let catalog = Catalog::load(&store, FilterOptions::default()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.quotes()[0].text, "Persisted");
    }
}
