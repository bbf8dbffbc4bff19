//! Configuration types for a batch conversion.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`].

use crate::error::Pdf2PngError;
use crate::pipeline::transparency::DEFAULT_THRESHOLD;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default zoom applied to each page. 1.0 renders at 72 DPI, so 5.0 is 360 DPI.
pub const DEFAULT_SCALE: f32 = 5.0;

/// Name of the folder created inside the input folder when no explicit
/// output folder is given.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "processed";

/// Extension (without the dot) of files picked up from the input folder.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Configuration for one batch run over a folder of PDFs.
///
/// # Example
/// ```rust
/// use edgequake_pdf2png::BatchConfig;
///
/// let config = BatchConfig::builder("scans")
///     .scale(3.0)
///     .threshold(220)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_dir(), std::path::Path::new("scans/processed"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Folder scanned (non-recursively) for documents.
    pub input_dir: PathBuf,

    /// Destination folder. `None` means `<input_dir>/processed`.
    pub output_dir: Option<PathBuf>,

    /// Uniform zoom factor. Must be finite and > 0. Default: 5.0.
    ///
    /// Output width and height are the page size in points multiplied by this
    /// factor, so doubling it doubles both dimensions.
    pub scale: f32,

    /// Per-channel brightness above which a pixel becomes transparent.
    /// Default: 200.
    pub threshold: u8,

    /// Document extension without the leading dot. Matching is ASCII
    /// case-insensitive. Default: `pdf`.
    pub extension: String,

    /// PDF user password, tried for every document in the batch.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Optional per-document / per-page event sink.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("scale", &self.scale)
            .field("threshold", &self.threshold)
            .field("extension", &self.extension)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a builder for a batch over `input_dir`.
    pub fn builder(input_dir: impl Into<PathBuf>) -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self {
                input_dir: input_dir.into(),
                output_dir: None,
                scale: DEFAULT_SCALE,
                threshold: DEFAULT_THRESHOLD,
                extension: DEFAULT_EXTENSION.to_string(),
                password: None,
                progress_callback: None,
            },
        }
    }

    /// Resolved destination folder.
    pub fn output_dir(&self) -> PathBuf {
        match self.output_dir {
            Some(ref dir) => dir.clone(),
            None => self.input_dir.join(DEFAULT_OUTPUT_SUBDIR),
        }
    }

    /// Validate a config that may have been assembled by hand or deserialised.
    pub fn validate(&self) -> Result<(), Pdf2PngError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Pdf2PngError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(Pdf2PngError::InvalidConfig(
                "document extension must not be empty".into(),
            ));
        }
        if self.input_dir.as_os_str().is_empty() {
            return Err(Pdf2PngError::InvalidConfig(
                "input folder must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// True when `path`'s file name ends with `.<extension>`, ignoring ASCII case.
    ///
    /// A file named exactly `.pdf` matches.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.extension.trim_start_matches('.'));
        let suffix = suffix.as_bytes();
        path.file_name().is_some_and(|name| {
            let name = name.as_encoded_bytes();
            name.len() >= suffix.len()
                && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
        })
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl fmt::Debug for BatchConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BatchConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.config.extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Pdf2PngError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
