//! The compatibility matrix: which target formats a source may be converted
//! into. This is consulted to build the format menu and, independently, by
//! [`crate::router::Router`] to validate its dispatch table.

use crate::format::Format;

/// Ordered targets legal for `source_ext`; empty for unknown or empty input.
///
/// An image offers every other image format followed by `pdf`. The list never
/// contains the source itself, and pairs are not symmetric (`png -> pdf`
/// exists, `pdf -> png` does not).
pub fn targets_for(source_ext: &str) -> Vec<Format> {
    match Format::from_extension(source_ext) {
        Some(source) => targets_for_format(source),
        None => Vec::new(),
    }
}

pub fn targets_for_format(source: Format) -> Vec<Format> {
    match source {
        image if image.is_image() => Format::IMAGES
            .into_iter()
            .filter(|f| *f != image)
            .chain(std::iter::once(Format::Pdf))
            .collect(),
        Format::Pdf => vec![Format::Docx],
        Format::Docx => vec![Format::Pdf],
        Format::Txt => vec![Format::Md],
        Format::Md => vec![Format::Txt],
        _ => Vec::new(),
    }
}

/// Whether `source -> target` is a legal conversion.
pub fn allows(source: Format, target: Format) -> bool {
    targets_for_format(source).contains(&target)
}

/// Every legal `(source, target)` pair.
pub fn pairs() -> Vec<(Format, Format)> {
    Format::ALL
        .into_iter()
        .flat_map(|source| {
            targets_for_format(source)
                .into_iter()
                .map(move |target| (source, target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpg_offers_other_images_then_pdf() {
        assert_eq!(
            targets_for("jpg"),
            vec![Format::Jpeg, Format::Png, Format::Webp, Format::Pdf]
        );
        assert_eq!(
            targets_for("webp"),
            vec![Format::Jpg, Format::Jpeg, Format::Png, Format::Pdf]
        );
    }

    #[test]
    fn documents_and_text_are_paired() {
        assert_eq!(targets_for("pdf"), vec![Format::Docx]);
        assert_eq!(targets_for("docx"), vec![Format::Pdf]);
        assert_eq!(targets_for("txt"), vec![Format::Md]);
        assert_eq!(targets_for("md"), vec![Format::Txt]);
    }

    #[test]
    fn unknown_and_empty_have_no_targets() {
        assert!(targets_for("").is_empty());
        assert!(targets_for("gif").is_empty());
        assert!(targets_for("PNG").is_empty(), "matrix expects canonical lowercase input");
    }

    #[test]
    fn no_identity_conversions() {
        for source in Format::ALL {
            assert!(
                !targets_for_format(source).contains(&source),
                "{source} must not convert to itself"
            );
        }
    }

    #[test]
    fn image_to_pdf_is_one_way() {
        assert!(allows(Format::Png, Format::Pdf));
        assert!(!allows(Format::Pdf, Format::Png));
    }

    #[test]
    fn pair_count() {
        // 4 images x 4 targets + pdf, docx, txt, md
        assert_eq!(pairs().len(), 20);
    }
}
