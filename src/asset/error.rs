//! Asset loading errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be fetched (missing file, HTTP error on web)
    #[error("failed to fetch {path}: {message}")]
    Fetch { path: String, message: String },

    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("malformed data URI: {0}")]
    DataUri(String),

    /// A buffer referenced by the document has no data (no GLB chunk, short file)
    #[error("buffer {index} is missing or shorter than declared")]
    MissingBuffer { index: usize },

    #[error("{0} contains no renderable triangles")]
    NoGeometry(String),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
