pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`vus` must be between 1 and {}", crate::profile::MAX_VUS)]
    InvalidVus,

    #[error("`iterations` must be a positive integer")]
    InvalidIterations,
}
