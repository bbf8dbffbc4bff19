//! Pipeline stages for PDF-to-transparent-PNG conversion.
//!
//! One submodule per step.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ render ──▶ transparency ──▶ encode ──▶ disk
//! (folder)     (pdfium)   (RGB → RGBA)     (PNG)      (naming)
//! ```
//!
//! 1. [`discover`]: list eligible documents in the input folder, sorted
//! 2. [`render`]: rasterise each page to an RGB buffer at the batch scale
//! 3. [`transparency`]: near-white pixels become transparent, the rest opaque
//! 4. [`encode`]: PNG-encode and write atomically
//! 5. [`naming`]: `<stem>_page_<n>.png` inside the output folder

pub mod discover;
pub mod encode;
pub mod naming;
pub mod render;
pub mod transparency;
