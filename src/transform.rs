//! Export rules for native documents that have no downloadable byte blob.
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How a native document is exported before download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub export_mime: &'static str,
    pub extension: &'static str,
}

const EXPORT_RULES: &[(&str, &str, &str)] = &[
    ("application/vnd.google-apps.document", "application/pdf", ".pdf"),
    (
        "application/vnd.google-apps.presentation",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    (
        "application/vnd.google-apps.spreadsheet",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.google-apps.drawing", "image/png", ".png"),
    ("application/vnd.google-apps.jam", "application/pdf", ".pdf"),
];

static RULES: Lazy<HashMap<&'static str, Transform>> = Lazy::new(|| {
    EXPORT_RULES
        .iter()
        .map(|&(native, export_mime, extension)| {
            (
                native,
                Transform {
                    export_mime,
                    extension,
                },
            )
        })
        .collect()
});

/// `None` means the file is fetched verbatim.
pub fn resolve(content_type: &str) -> Option<Transform> {
    RULES.get(content_type).copied()
}
