// src/specs/mod.rs
//! # Page specs
//!
//! Where the ground truth lives in the portal's HTML, and how to read it
//! without trusting the layout too much.
//!
//! ## What lives here
//! - **Pure HTML parsing** of the two pages the tool touches: the search form
//!   (`search_form`) and the results grid (`results`).
//! - **Selector precedence** (marked results table → titled table → every row;
//!   header names → positional columns).
//! - **Tolerant extraction** over `core::html` helpers. Layout drift degrades
//!   precision and is reported, never raised.
//!
//! ## What does **not** live here
//! - **Transport** (`fetch::*`): specs never touch the network or the browser.
//! - **Filtering by date or extra keyword** (`filter`).
//! - **Export and download** (`csv`, `download`).
//!
//! ## Typical call chain
//! ```text
//! runner::search → fetch::<strategy>::fetch_results_html()
//!                ↘ specs::results::extract_pages() → filter::Filter::apply()
//! ```
//!
//! ## Testing notes
//! Everything here is testable offline against inline HTML fixtures.
pub mod results;
pub mod search_form;
