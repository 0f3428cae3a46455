pub mod error;
pub mod pool;
pub mod series_repository;

pub use error::DbError;
pub use series_repository::SeriesRepository;
