// ABOUTME: Listing page extraction: selector cascades, container choice and per-item field reading.
// ABOUTME: Produces validated canonical products from one parsed listing page.

//! Extraction module.
//!
//! Submodules:
//! - `compiled`: shared cache of compiled CSS selectors.
//! - `select`: ordered fallback resolution over selector strategies.
//! - `selectors`: built-in candidate lists and the overridable `SelectorSet`.
//! - `page`: the page extractor tying the cascades to normalization.

pub mod compiled;
pub mod page;
pub mod select;
pub mod selectors;
