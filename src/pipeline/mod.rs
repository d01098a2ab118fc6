//! The conversion pipeline, stage by stage.
//!
//! ```text
//! raw text ─▶ normalize ─▶ parse ─▶ sanitize ─┬▶ render ─▶ pdf
//!                                             └▶ docx
//! ```
//!
//! * [`normalize`] — deterministic repair of extraction defects
//! * [`parse`] — normalized markdown → structural [`crate::DocumentTree`]
//! * [`sanitize`] — structural removal of embedded markup, style validation
//! * [`fonts`] — embedded typefaces and glyph rasterization
//! * [`render`] — continuous layout, rasterization, page slicing
//! * [`pdf`] — page segments → PDF bytes
//! * [`docx`] — tree → reflowable DOCX bytes
//!
//! The first three stages are pure and infallible; only the two serializer
//! tails can fail. [`crate::export`] wires the stages together.

pub mod docx;
pub mod fonts;
pub mod normalize;
pub mod parse;
pub mod pdf;
pub mod render;
pub mod sanitize;
