pub mod aggregate;
pub mod chart;
pub mod etl;
pub mod report;
pub mod season;

pub use crate::domain::model::{Dataset, Row};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::domain::report::Report;
pub use crate::utils::error::Result;
