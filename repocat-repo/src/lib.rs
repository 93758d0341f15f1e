//! Repocat Repository - Checkout analysis module
//!
//! Locates and converts project documentation and turns the commit history of a
//! checkout into per-author and per-month statistics

pub mod analyzer;
pub mod checkout;
pub mod converter;
pub mod history;
pub mod locator;
pub mod markdown;

pub use analyzer::*;
pub use checkout::CheckoutManager;
pub use converter::ContentConverter;
pub use history::*;
pub use locator::{locate, DOCUMENT_EXTENSIONS};
pub use markdown::CommonMarkRenderer;
