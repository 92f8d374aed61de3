use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "offset of {offset} elements is out of range for backing storage of {backing_len} elements"
    )]
    OffsetOutOfRange { offset: usize, backing_len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
