use crate::region_extractor::BoundingBox;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogoError {
    #[error("Decode error: {0}")]
    Decode(#[source] image::ImageError),

    #[error("No pixels matched {target}")]
    RegionNotFound { target: String },

    #[error("Bounding box {bbox} does not fit inside a {width}x{height} image")]
    OutOfBounds {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Encode error: {0}")]
    Encode(#[source] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
