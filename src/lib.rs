//! Builds render-ready views of the World Bank fertility-rate table: rate
//! series per country, a geographic marker set for one year, and filtered
//! table slices with CSV export.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod processing;
pub mod server;
pub mod types;

pub use error::FertilityError;
pub use processing::{build_point_set, build_series_set, build_table_slice, build_view};
pub use types::{Dataset, Filter, ViewModel, ViewRequest, YearRange};
