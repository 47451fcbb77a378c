// Quote rendering - random selection and list display.

use rand::Rng;

use crate::catalog::Quote;

/// Shown when a random pick finds nothing to choose from.
pub const NO_QUOTES_PLACEHOLDER: &str = "No quotes available in this category.";

/// Shown when a list render has no matching entries.
pub const NO_RESULTS_PLACEHOLDER: &str = "No quotes found for this category.";

const LIST_SEPARATOR: &str = "\n----------------------------------------\n";

/// Select one quote uniformly at random. Empty input yields `None`,
/// never a panic.
pub fn pick_random(quotes: &[Quote]) -> Option<&Quote> {
    if quotes.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..quotes.len());
    quotes.get(index)
}

/// Display block for a single quote.
pub fn render_quote(quote: &Quote) -> String {
    format!("Category: {}\n\"{}\"", quote.category, quote.text)
}

/// Random pick rendered for display, or the explicit empty-state message.
pub fn render_random(quotes: &[Quote]) -> String {
    match pick_random(quotes) {
        Some(quote) => render_quote(quote),
        None => NO_QUOTES_PLACEHOLDER.to_string(),
    }
}

/// Every quote in order, or the explicit no-results message.
pub fn render_list(quotes: &[Quote]) -> String {
    if quotes.is_empty() {
        return NO_RESULTS_PLACEHOLDER.to_string();
    }

    quotes
        .iter()
        .map(render_quote)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}
