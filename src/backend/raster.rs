use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, RawImage, RawImageData, RawImageFormat,
    XObjectTransform,
};
use tracing::{debug, warn};

use crate::contract::Converter;
use crate::error::ConvertError;
use crate::format::Format;

/// Resolution printpdf places images at when no DPI is given.
const PDF_IMAGE_DPI: f32 = 300.0;

/// Re-encodes an image into another image format.
pub struct ImageReformat;

#[async_trait]
impl Converter for ImageReformat {
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError> {
        let encoding = encoding_for(target).ok_or(ConvertError::Unsupported {
            source_format,
            target,
        })?;
        let (source, output) = (source.to_path_buf(), output.to_path_buf());
        tokio::task::spawn_blocking(move || reformat(&source, &output, encoding)).await?
    }
}

fn encoding_for(target: Format) -> Option<ImageFormat> {
    match target {
        Format::Jpg | Format::Jpeg => Some(ImageFormat::Jpeg),
        Format::Png => Some(ImageFormat::Png),
        Format::Webp => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Decodes by content rather than by extension so a mislabelled upload still
/// converts.
fn decode(source: &Path) -> Result<DynamicImage, ConvertError> {
    let image = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    debug!(
        path = %source.display(),
        width = image.width(),
        height = image.height(),
        "Decoded source image"
    );
    Ok(image)
}

fn reformat(source: &Path, output: &Path, encoding: ImageFormat) -> Result<(), ConvertError> {
    let image = decode(source)?;
    // JPEG has no alpha channel; the WebP encoder only takes 8-bit RGB(A).
    let image = match encoding {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image,
    };
    image.save_with_format(output, encoding)?;
    Ok(())
}

/// Embeds an image as the single page of a new PDF, sized to the image.
pub struct ImageToPdf;

#[async_trait]
impl Converter for ImageToPdf {
    async fn convert(
        &self,
        source: &Path,
        output: &Path,
        source_format: Format,
        target: Format,
    ) -> Result<(), ConvertError> {
        if target != Format::Pdf {
            return Err(ConvertError::Unsupported {
                source_format,
                target,
            });
        }
        let source: PathBuf = source.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || render_pdf(&source)).await??;
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

fn px_to_mm(px: u32) -> Mm {
    Mm(px as f32 * 25.4 / PDF_IMAGE_DPI)
}

fn render_pdf(source: &Path) -> Result<Vec<u8>, ConvertError> {
    let rgb = decode(source)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(ConvertError::Pdf("image has no pixels".into()));
    }

    let title = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let raw = RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: width as usize,
        height: height as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new(&title);
    let image_id = doc.add_image(&raw);
    let page = PdfPage::new(
        px_to_mm(width),
        px_to_mm(height),
        vec![Op::UseXobject {
            id: image_id,
            transform: XObjectTransform::default(),
        }],
    );

    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(vec![page])
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "PDF writer reported warnings");
    }
    Ok(bytes)
}
