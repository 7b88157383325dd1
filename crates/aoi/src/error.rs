use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AoiError {
    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("expected a Polygon geometry, got {0}")]
    NotAPolygon(&'static str),

    #[error("ring {ring} has {len} positions, at least 4 are required")]
    RingTooShort { ring: usize, len: usize },

    #[error("ring {ring} is not closed")]
    RingNotClosed { ring: usize },

    #[error("invalid coordinate at ring {ring}, position {index}")]
    InvalidCoordinate { ring: usize, index: usize },

    #[error("no AOI feature with id `{0}`")]
    UnknownFeature(String),

    #[error("there is no AOI to select")]
    NothingToSelect,

    #[error("malformed AOI url value: {0}")]
    Decode(String),
}
