mod tools;
pub mod matrix;
pub mod pixel;
pub mod ppm;
pub mod huffman;
pub mod dct;
pub mod container;
pub mod diff;

/// Errors raised while parsing or transforming data.
/// Parsing fails fast: a malformed input aborts the whole operation,
/// there is no local recovery.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("bad header: {0}")]
    BadHeader(String),
    #[error("unexpected end of data: {0}")]
    UnexpectedEnd(String),
    #[error("bad data type: {0}")]
    BadDataType(String),
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("out of range: {0}")]
    OutOfRange(String)
}
