use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("section marker `{0}` not found")]
    MissingSection(&'static str),

    #[error("point block starting at `{0}` never reaches `}};`")]
    UnterminatedPoint(String),

    #[error("malformed point header `{0}`")]
    BadPointHeader(String),

    #[error("P[{point}] has no `{field}` field")]
    MissingField { point: u32, field: String },

    #[error("can't parse `{0}` as a number")]
    Number(String),

    #[error("duplicate point number {0}")]
    DuplicatePoint(u32),

    #[error("point {0} not found")]
    PointNotFound(u32),

    #[error("no motion instruction references P[{0}]")]
    NotReferenced(u32),

    #[error("P[{0}] is stored in joint representation")]
    JointRepresentation(u32),

    #[error("transform is not invertible")]
    SingularTransform,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
