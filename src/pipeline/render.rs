//! PDF rasterisation: render pages to RGB [`PixelBuffer`]s.
//!
//! The backend sits behind the [`Rasterizer`] / [`RasterDocument`] traits so
//! the batch orchestrator can be driven by an in-memory fake in tests. The
//! production implementation, [`PdfiumRasterizer`], wraps `pdfium-render`.
//!
//! ## Scale
//!
//! PDF page sizes are in points (1/72 inch). A scale factor of 1.0 renders one
//! pixel per point (72 DPI); the default 5.0 gives 360 DPI. Width and height
//! are multiplied by the same factor, so the aspect ratio is whatever the page
//! declares.
//!
//! ## Handle lifetime
//!
//! [`Rasterizer::open`] returns an owned handle. Dropping it releases the
//! backend document, which happens on every exit path, error or not.

use crate::buffer::PixelBuffer;
use crate::error::{DocumentError, Pdf2PngError};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An open document. Dropping it releases backend resources.
pub trait RasterDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) at `scale` into an RGB buffer.
    fn render_page(&self, index: usize, scale: f32) -> Result<PixelBuffer, DocumentError>;
}

/// A document rendering backend.
pub trait Rasterizer {
    /// Open the document at `path`.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RasterDocument + 'a>, DocumentError>;

    /// Page count of the document at `path`. Opens and releases it.
    fn page_count(&self, path: &Path) -> Result<usize, DocumentError> {
        Ok(self.open(path)?.page_count())
    }

    /// Render one page of the document at `path`. Opens and releases it.
    fn rasterize(
        &self,
        path: &Path,
        page_index: usize,
        scale: f32,
    ) -> Result<PixelBuffer, DocumentError> {
        self.open(path)?.render_page(page_index, scale)
    }
}

/// Pixel size of a `width_pts × height_pts` page at `scale`.
///
/// Rounded to the nearest pixel and never below 1×1. Non-decreasing in
/// `scale` for a fixed page.
pub fn scaled_dimensions(width_pts: f32, height_pts: f32, scale: f32) -> (u32, u32) {
    let px = |pts: f32| -> u32 {
        let v = (pts * scale).round();
        if v.is_finite() && v >= 1.0 {
            v.min(u32::MAX as f32) as u32
        } else {
            1
        }
    };
    (px(width_pts), px(height_pts))
}

/// Largest page a single render may produce, in pixels (about 1.6 GB of RGBA).
/// An A0 poster at the default scale is roughly 200 M pixels.
pub const MAX_PAGE_PIXELS: u64 = 400_000_000;

/// Checked render target for a page: [`scaled_dimensions`] as `i32`s, the
/// type PDFium's render config takes.
///
/// Fails with [`DocumentError::Render`] for `page` (1-based) when the page
/// would exceed [`MAX_PAGE_PIXELS`] or either edge does not fit in an `i32`.
pub fn render_target(
    width_pts: f32,
    height_pts: f32,
    scale: f32,
    page: usize,
) -> Result<(i32, i32), DocumentError> {
    let (width, height) = scaled_dimensions(width_pts, height_pts, scale);
    let too_large = || DocumentError::Render {
        page,
        detail: format!("page too large at scale {scale}: {width}x{height} px"),
    };
    if u64::from(width) * u64::from(height) > MAX_PAGE_PIXELS {
        return Err(too_large());
    }
    let w = i32::try_from(width).map_err(|_| too_large())?;
    let h = i32::try_from(height).map_err(|_| too_large())?;
    Ok((w, h))
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`Rasterizer`] backed by the PDFium library.
///
/// Each instance holds one binding, made in [`PdfiumRasterizer::new`]. A
/// batch builds a single rasterizer on its worker thread and keeps it for
/// every document, so binding happens once per batch.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    password: Option<String>,
}

impl PdfiumRasterizer {
    /// Bind PDFium (see [`bind_pdfium`]) and build a rasterizer.
    pub fn new() -> Result<Self, Pdf2PngError> {
        Ok(Self::with_pdfium(bind_pdfium()?))
    }

    pub fn with_pdfium(pdfium: Pdfium) -> Self {
        Self {
            pdfium,
            password: None,
        }
    }

    /// Password tried when opening every document.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RasterDocument + 'a>, DocumentError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| DocumentError::Open {
                path: path.to_path_buf(),
                detail: describe_open_error(&e, self.password.is_some()),
            })?;
        let page_count = document.pages().len() as usize;
        info!("Opened {}: {} pages", path.display(), page_count);
        Ok(Box::new(PdfiumDocument {
            document,
            page_count,
        }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    page_count: usize,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<PixelBuffer, DocumentError> {
        if index >= self.page_count {
            return Err(DocumentError::PageIndex {
                index,
                total: self.page_count,
            });
        }

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| DocumentError::Render {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let (width, height) =
            render_target(page.width().value, page.height().value, scale, index + 1)?;
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocumentError::Render {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(PixelBuffer::from(image))
    }
}

fn describe_open_error(e: &PdfiumError, password_given: bool) -> String {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            "wrong password".to_string()
        } else {
            "document is encrypted; provide a password".to_string()
        }
    } else {
        detail
    }
}

// ── Library binding ──────────────────────────────────────────────────────

/// Directories searched for the platform pdfium library, in order.
///
/// `PDFIUM_LIB_PATH` (a file or a directory) comes first, then the directory
/// holding the running executable, then `./lib` and `./`.
pub fn pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            paths.push(PathBuf::from(p));
        }
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(exe_dir);
    }

    paths.push(PathBuf::from("./lib"));
    paths.push(PathBuf::from("./"));
    paths
}

/// Bind to a pdfium library from [`pdfium_search_paths`], falling back to
/// the system library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2PngError> {
    for path in pdfium_search_paths() {
        let lib = if path.is_file() {
            path.clone()
        } else {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        };
        if !lib.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&lib) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", lib.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => debug!("Could not bind pdfium at {}: {}", lib.display(), e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Pdf2PngError::PdfiumBindingFailed(e.to_string()))
}
