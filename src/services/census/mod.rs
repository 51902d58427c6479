pub mod banded;
pub mod flat;
pub mod types;
pub mod utils;

pub use banded::{extract_banded, BandedExtractor};
pub use flat::{extract_flat, FlatExtractor};
pub use types::*;

use crate::models::{Category, Layout, TotalRowHints};

/// A strategy turning one sheet layout into an [`ExtractionResult`].
pub trait SheetExtractor {
    fn layout(&self) -> &'static str;

    fn extract(&self, sheet: &[Row]) -> Extraction;

    /// Extracts and logs any degradations, returning only the result.
    fn run(&self, sheet: &[Row]) -> ExtractionResult {
        let extraction = self.extract(sheet);
        extraction.log_issues(self.layout());
        extraction.result
    }
}

/// Picks the extractor matching the category's sheet layout.
pub fn extractor_for(category: Category, hints: &TotalRowHints) -> Box<dyn SheetExtractor + Send + Sync> {
    match category.layout() {
        Layout::Flat => Box::new(FlatExtractor::new(hints.for_category(category))),
        Layout::Banded => Box::new(BandedExtractor::new()),
    }
}

pub fn extract_category(category: Category, sheet: &[Row], hints: &TotalRowHints) -> Extraction {
    let extractor = extractor_for(category, hints);
    let extraction = extractor.extract(sheet);
    extraction.log_issues(category.id());
    tracing::info!("Extracted {}: {}", category.id(), extraction.result);
    extraction
}
