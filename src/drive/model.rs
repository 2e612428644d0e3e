use serde::Deserialize;

/// The two metadata fields the fetch unit needs.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl FileMetadata {
    pub fn new(name: &str, mime_type: &str) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}
