//! Conversion backends implementing [`crate::contract::Converter`].
//!
//! In-process: [`ImageReformat`], [`ImageToPdf`], [`MarkdownToText`],
//! [`TextCopy`]. External process: [`OfficeProcess`].

mod external;
mod raster;
mod text;

pub use external::{ExternalCommand, OfficeProcess, DEFAULT_OFFICE_SCRIPT, ERROR_MARKER};
pub use raster::{ImageReformat, ImageToPdf};
pub use text::{markdown_to_text, MarkdownToText, TextCopy};
