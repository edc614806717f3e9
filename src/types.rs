use crate::error::FertilityError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Headers the source table uses for its two identity columns.
pub const NAME_HEADER: &str = "Country Name";
pub const CODE_HEADER: &str = "Country Code";

/// Rates at or below this are drawn in the low band.
pub const REPLACEMENT_RATE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FertilityRecord {
    pub name: String,
    pub code: String,
    // Years without a recorded value are absent, never stored as 0.0
    pub rates: BTreeMap<i32, f64>,
}

impl FertilityRecord {
    pub fn rate(&self, year: i32) -> Option<f64> {
        self.rates.get(&year).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountryCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// The loaded table and coordinate lookup. Read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<FertilityRecord>,
    pub coordinates: HashMap<String, CountryCoordinate>,
    pub first_year: i32,
    pub last_year: i32,
}

impl Dataset {
    pub fn record(&self, name: &str) -> Option<&FertilityRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn coordinate(&self, code: &str) -> Option<&CountryCoordinate> {
        self.coordinates.get(code)
    }

    pub fn full_range(&self) -> YearRange {
        YearRange {
            start: self.first_year,
            end: self.last_year,
        }
    }

    pub fn check_range(&self, range: YearRange) -> Result<YearRange, FertilityError> {
        let in_bounds = |y: i32| (self.first_year..=self.last_year).contains(&y);
        if range.start > range.end || !in_bounds(range.start) || !in_bounds(range.end) {
            return Err(FertilityError::InvalidRange {
                start: range.start,
                end: range.end,
                first: self.first_year,
                last: self.last_year,
            });
        }
        Ok(range)
    }

    pub fn check_year(&self, year: i32) -> Result<i32, FertilityError> {
        self.check_range(YearRange::single(year)).map(|r| r.start)
    }

    /// Fills omitted ends with the dataset bounds, then validates.
    pub fn resolve_range(
        &self,
        start: Option<i32>,
        end: Option<i32>,
    ) -> Result<YearRange, FertilityError> {
        self.check_range(YearRange {
            start: start.unwrap_or(self.first_year),
            end: end.unwrap_or(self.last_year),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn single(year: i32) -> Self {
        Self {
            start: year,
            end: year,
        }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One render cycle's worth of user choices.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub selected_names: Vec<String>,
    pub year_range: YearRange,
    pub selected_year: i32,
}

impl Filter {
    pub fn new(selected_names: Vec<String>, year_range: YearRange) -> Self {
        Self {
            selected_names,
            selected_year: year_range.end,
            year_range,
        }
    }

    /// Selected names in supplied order, repeats dropped.
    pub fn distinct_names(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.selected_names.len());
        for name in &self.selected_names {
            if !seen.contains(&name.as_str()) {
                seen.push(name.as_str());
            }
        }
        seen
    }
}

/// How series views present years with no recorded rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValues {
    /// Plot missing years as 0.0. This is a display convention, not an
    /// imputation, and draws no-data years as zero fertility.
    #[default]
    Zero,
    /// Emit missing years as null so the chart can break the line.
    Gap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableScope {
    #[default]
    Selected,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub code: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    pub range: YearRange,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBand {
    Low,
    High,
}

impl RateBand {
    pub fn of(rate: f64) -> Self {
        if rate <= REPLACEMENT_RATE {
            RateBand::Low
        } else {
            RateBand::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub name: String,
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rate: f64,
    pub magnitude: f64,
    pub label: String,
    pub band: RateBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSet {
    pub year: i32,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "year", rename_all = "snake_case")]
pub enum Column {
    Name,
    Code,
    Year(i32),
}

impl Column {
    pub fn header(&self) -> String {
        match self {
            Column::Name => NAME_HEADER.to_string(),
            Column::Code => CODE_HEADER.to_string(),
            Column::Year(y) => y.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub name: String,
    pub code: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSlice {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

impl TableSlice {
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(Column::header).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewModel {
    SeriesSet(SeriesSet),
    PointSet(PointSet),
    TableSlice(TableSlice),
}

/// What the display surface asked for on this interaction.
#[derive(Debug, Clone)]
pub enum ViewRequest {
    Series {
        filter: Filter,
        missing: MissingValues,
    },
    Points {
        year: i32,
    },
    Table {
        filter: Filter,
        scope: TableScope,
        limit: Option<usize>,
    },
}
