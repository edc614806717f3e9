use crate::error::FertilityError;
use crate::types::{
    Column, Dataset, Filter, Marker, MissingValues, PointSet, RateBand, Series, SeriesPoint,
    SeriesSet, TableRow, TableScope, TableSlice, ViewModel, ViewRequest,
};

/// Marker sizing and labelling for the point view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    /// Multiplier from rate to marker magnitude. Must be positive.
    pub scale: f64,
    /// Decimal places shown in marker labels.
    pub precision: usize,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            scale: 100_000.0,
            precision: 4,
        }
    }
}

impl MarkerStyle {
    pub fn magnitude(&self, rate: f64) -> f64 {
        rate.max(0.0) * self.scale
    }

    pub fn label(&self, name: &str, rate: f64) -> String {
        format!("{}: {:.*}", name, self.precision, rate)
    }
}

pub fn build_view(
    dataset: &Dataset,
    request: &ViewRequest,
    style: &MarkerStyle,
) -> Result<ViewModel, FertilityError> {
    match request {
        ViewRequest::Series { filter, missing } => {
            build_series_set(dataset, filter, *missing).map(ViewModel::SeriesSet)
        }
        ViewRequest::Points { year } => {
            build_point_set(dataset, *year, style).map(ViewModel::PointSet)
        }
        ViewRequest::Table {
            filter,
            scope,
            limit,
        } => build_table_view(dataset, filter, *scope, *limit).map(ViewModel::TableSlice),
    }
}

/// Table slice with an optional row cap, for previews of the head of the table.
pub fn build_table_view(
    dataset: &Dataset,
    filter: &Filter,
    scope: TableScope,
    limit: Option<usize>,
) -> Result<TableSlice, FertilityError> {
    let mut slice = build_table_slice(dataset, filter, scope)?;
    if let Some(limit) = limit {
        slice.rows.truncate(limit);
    }
    Ok(slice)
}

/// One series per selected name, in selection order, with a point for every
/// year of the range. Names not present in the dataset are skipped.
pub fn build_series_set(
    dataset: &Dataset,
    filter: &Filter,
    missing: MissingValues,
) -> Result<SeriesSet, FertilityError> {
    let range = dataset.check_range(filter.year_range)?;

    let series = filter
        .distinct_names()
        .into_iter()
        .filter_map(|name| dataset.record(name))
        .map(|record| Series {
            name: record.name.clone(),
            code: record.code.clone(),
            points: range
                .years()
                .map(|year| SeriesPoint {
                    year,
                    value: match (record.rate(year), missing) {
                        (Some(rate), _) => Some(rate),
                        (None, MissingValues::Zero) => Some(0.0),
                        (None, MissingValues::Gap) => None,
                    },
                })
                .collect(),
        })
        .collect();

    Ok(SeriesSet { range, series })
}

/// Markers for every record with both a rate at `year` and a coordinate for
/// its code. Aggregate regions have no coordinates and drop out here.
pub fn build_point_set(
    dataset: &Dataset,
    year: i32,
    style: &MarkerStyle,
) -> Result<PointSet, FertilityError> {
    let year = dataset.check_year(year)?;

    let markers = dataset
        .records
        .iter()
        .filter_map(|record| {
            let rate = record.rate(year)?;
            let coordinate = dataset.coordinate(&record.code)?;
            Some(Marker {
                name: record.name.clone(),
                code: record.code.clone(),
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                rate,
                magnitude: style.magnitude(rate),
                label: style.label(&record.name, rate),
                band: RateBand::of(rate),
            })
        })
        .collect();

    Ok(PointSet { year, markers })
}

pub fn build_table_slice(
    dataset: &Dataset,
    filter: &Filter,
    scope: TableScope,
) -> Result<TableSlice, FertilityError> {
    let range = dataset.check_range(filter.year_range)?;

    let take_all = scope == TableScope::Full || filter.selected_names.is_empty();
    let rows = dataset
        .records
        .iter()
        .filter(|record| take_all || filter.selected_names.contains(&record.name))
        .map(|record| TableRow {
            name: record.name.clone(),
            code: record.code.clone(),
            values: range.years().map(|year| record.rate(year)).collect(),
        })
        .collect();

    let columns = [Column::Name, Column::Code]
        .into_iter()
        .chain(range.years().map(Column::Year))
        .collect();

    Ok(TableSlice { columns, rows })
}
