//! Dispatch from a `(source, target)` format pair to the converter that
//! performs it.
//!
//! The dispatch table is checked against [`crate::matrix`] when the router is
//! built: every legal pair must have a converter and no converter may be
//! registered for an illegal pair. A router that exists is therefore
//! consistent with the menu users are shown.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::backend::{
    ExternalCommand, ImageReformat, ImageToPdf, MarkdownToText, OfficeProcess, TextCopy,
};
use crate::contract::Converter;
use crate::error::ConversionError;
use crate::format::Format;
use crate::matrix;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("no converter registered for {0} -> {1}")]
    MissingPair(Format, Format),
    #[error("converter registered for {0} -> {1}, which the matrix does not allow")]
    IllegalPair(Format, Format),
}

pub type RouteEntry = ((Format, Format), Arc<dyn Converter>);

pub struct Router {
    table: HashMap<(Format, Format), Arc<dyn Converter>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pairs: Vec<_> = self.table.keys().collect();
        pairs.sort();
        f.debug_struct("Router").field("pairs", &pairs).finish()
    }
}

impl Router {
    /// Builds a router from explicit entries, rejecting any table that does not
    /// cover exactly the matrix.
    pub fn new(entries: impl IntoIterator<Item = RouteEntry>) -> Result<Self, RouterError> {
        let mut table = HashMap::new();
        for ((source, target), converter) in entries {
            if !matrix::allows(source, target) {
                return Err(RouterError::IllegalPair(source, target));
            }
            table.insert((source, target), converter);
        }
        if let Some((source, target)) = matrix::pairs()
            .into_iter()
            .find(|pair| !table.contains_key(pair))
        {
            return Err(RouterError::MissingPair(source, target));
        }
        Ok(Self { table })
    }

    /// The standard wiring: `image` for raster formats, `printpdf` for image
    /// to PDF, an external process for office documents, and in-process text
    /// handling.
    pub fn with_defaults(
        office: ExternalCommand,
        office_timeout: Duration,
    ) -> Result<Self, RouterError> {
        Self::new(default_entries(office, office_timeout))
    }

    /// Whether the router can perform `source -> target`.
    pub fn supports(&self, source: Format, target: Format) -> bool {
        self.table.contains_key(&(source, target))
    }

    /// Converts `source_path` into `output_path`.
    ///
    /// Fails with [`ConversionError::UnsupportedConversion`] for any pair the
    /// matrix does not allow, and with [`ConversionError::ConversionFailure`]
    /// when the backend fails.
    pub async fn route(
        &self,
        source_path: &Path,
        source_ext: &str,
        target_ext: &str,
        output_path: &Path,
    ) -> Result<(), ConversionError> {
        let unsupported = || ConversionError::UnsupportedConversion {
            source_ext: source_ext.to_string(),
            target_ext: target_ext.to_string(),
        };
        let source = Format::from_extension(source_ext).ok_or_else(unsupported)?;
        let target = Format::from_extension(target_ext).ok_or_else(unsupported)?;
        let converter = self.table.get(&(source, target)).ok_or_else(unsupported)?;

        info!(%source, %target, input = %source_path.display(), "[ROUTE] Dispatching conversion");
        match converter
            .convert(source_path, output_path, source, target)
            .await
        {
            Ok(()) => {
                info!(%source, %target, output = %output_path.display(), "[ROUTE] Conversion succeeded");
                Ok(())
            }
            Err(e) => {
                error!(%source, %target, error = ?e, "[ROUTE][ERROR] Converter failed");
                Err(ConversionError::ConversionFailure(e))
            }
        }
    }
}

fn default_entries(office: ExternalCommand, office_timeout: Duration) -> Vec<RouteEntry> {
    let reformat: Arc<dyn Converter> = Arc::new(ImageReformat);
    let to_pdf: Arc<dyn Converter> = Arc::new(ImageToPdf);
    let office: Arc<dyn Converter> = Arc::new(OfficeProcess::new(office, office_timeout));

    let mut entries: Vec<RouteEntry> = Vec::new();
    for source in Format::IMAGES {
        for target in Format::IMAGES.into_iter().filter(|t| *t != source) {
            entries.push(((source, target), reformat.clone()));
        }
        entries.push(((source, Format::Pdf), to_pdf.clone()));
    }
    entries.push(((Format::Docx, Format::Pdf), office.clone()));
    entries.push(((Format::Pdf, Format::Docx), office));
    entries.push(((Format::Md, Format::Txt), Arc::new(MarkdownToText)));
    entries.push(((Format::Txt, Format::Md), Arc::new(TextCopy)));
    entries
}
