//! Asset loading errors

/// Errors that can occur while loading or installing assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// IO error reading a file
    Io(String),
    /// The model file is not valid glTF
    Gltf(String),
    /// Image data could not be decoded
    Decode(String),
    /// A required named node was not found in the model
    MissingMesh(String),
    /// The worker finished without delivering a result
    Abandoned,
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Gltf(e) => write!(f, "glTF error: {e}"),
            Self::Decode(e) => write!(f, "Decode error: {e}"),
            Self::MissingMesh(name) => write!(f, "Model has no mesh named '{name}'"),
            Self::Abandoned => write!(f, "Asset load was abandoned"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<gltf::Error> for AssetError {
    fn from(e: gltf::Error) -> Self {
        match e {
            gltf::Error::Io(io) => Self::Io(io.to_string()),
            other => Self::Gltf(other.to_string()),
        }
    }
}

impl From<image::ImageError> for AssetError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Io(io.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
