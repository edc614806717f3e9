use crate::config::InputConfig;
use crate::error::FertilityError;
use crate::types::{CountryCoordinate, Dataset, FertilityRecord, CODE_HEADER, NAME_HEADER};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Cell contents treated as "no recorded value".
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "nan", "..", "null", "none"];

pub fn load_dataset(input: &InputConfig) -> Result<Dataset, FertilityError> {
    let (records, first_year, last_year) = load_table(&input.data_csv)?;
    info!(
        "Loaded {} records covering {}..={}",
        records.len(),
        first_year,
        last_year
    );

    let coordinates = load_coordinates(&input.coordinates)?;
    info!("Loaded coordinates for {} codes", coordinates.len());

    Ok(Dataset {
        records,
        coordinates,
        first_year,
        last_year,
    })
}

fn is_null(cell: &str) -> bool {
    let cell = cell.trim();
    NULL_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m))
}

fn load_table(path: &Path) -> Result<(Vec<FertilityRecord>, i32, i32), FertilityError> {
    let file = File::open(path).map_err(|e| FertilityError::unavailable(path, e))?;
    let mut rdr = ReaderBuilder::new().flexible(false).from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| FertilityError::unavailable(path, e))?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| FertilityError::unavailable(path, format!("column '{}' not found", name)))
    };
    let name_idx = column(NAME_HEADER)?;
    let code_idx = column(CODE_HEADER)?;

    // Every integer header is a year; the indicator columns fall out here.
    let year_columns: Vec<(usize, i32)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.trim().parse::<i32>().ok().map(|y| (i, y)))
        .collect();

    let (first_year, last_year) = match (year_columns.first(), year_columns.last()) {
        (Some(&(_, first)), Some(&(_, last))) => (first, last),
        _ => return Err(FertilityError::unavailable(path, "table has no year columns")),
    };
    let contiguous = year_columns
        .windows(2)
        .all(|pair| pair[1].1 == pair[0].1 + 1);
    if !contiguous {
        return Err(FertilityError::unavailable(
            path,
            "year columns are not contiguous and ascending",
        ));
    }

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| FertilityError::unavailable(path, e))?;
        let name = row.get(name_idx).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let code = row.get(code_idx).unwrap_or("").trim().to_string();

        let mut rates = BTreeMap::new();
        for &(idx, year) in &year_columns {
            let cell = row.get(idx).unwrap_or("");
            if is_null(cell) {
                continue;
            }
            let rate: f64 = cell.trim().parse().map_err(|_| {
                FertilityError::unavailable(
                    path,
                    format!("row {}: '{}' in {} is not a number", line + 2, cell, year),
                )
            })?;
            rates.insert(year, rate);
        }

        records.push(FertilityRecord { name, code, rates });
    }

    Ok((records, first_year, last_year))
}

fn load_coordinates(path: &Path) -> Result<HashMap<String, CountryCoordinate>, FertilityError> {
    let file = File::open(path).map_err(|e| FertilityError::unavailable(path, e))?;
    let reader = BufReader::new(file);
    let json: Value =
        serde_json::from_reader(reader).map_err(|e| FertilityError::unavailable(path, e))?;
    parse_coordinates(json).map_err(|reason| FertilityError::unavailable(path, reason))
}

/// Accepts `{CODE: {latitude, longitude}}` or that object wrapped in a
/// one-element array, which is how the country export ships it.
fn parse_coordinates(json: Value) -> Result<HashMap<String, CountryCoordinate>, String> {
    let table = match json {
        Value::Object(map) => map,
        Value::Array(mut items) if !items.is_empty() => match items.swap_remove(0) {
            Value::Object(map) => map,
            _ => return Err("first array element must be an object".to_string()),
        },
        _ => return Err("expected an object keyed by country code".to_string()),
    };

    table
        .into_iter()
        .map(|(code, entry)| -> Result<(String, CountryCoordinate), String> {
            let coordinate: CountryCoordinate = serde_json::from_value(entry)
                .map_err(|e| format!("entry '{}': {}", code, e))?;
            Ok((code, coordinate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const TABLE: &str = "\
Country Name,Country Code,Indicator Name,Indicator Code,1960,1961,1962
Aruba,ABW,\"Fertility rate, total (births per woman)\",SP.DYN.TFRT.IN,4.82,4.655,
Arab World,ARB,\"Fertility rate, total (births per woman)\",SP.DYN.TFRT.IN,6.97,..,6.95
";

    const COORDS: &str = r#"[{"ABW": {"latitude": 12.5, "longitude": -69.97, "name": "Aruba"}}]"#;

    fn fixture(table: &str, coords: &str) -> (TempDir, InputConfig) {
        let dir = tempdir().unwrap();
        let data_csv = dir.path().join("fertility.csv");
        let coordinates = dir.path().join("country.json");
        fs::write(&data_csv, table).unwrap();
        fs::write(&coordinates, coords).unwrap();
        (
            dir,
            InputConfig {
                data_csv,
                coordinates,
            },
        )
    }

    #[test]
    fn loads_records_and_year_bounds() {
        let (_dir, input) = fixture(TABLE, COORDS);
        let dataset = load_dataset(&input).unwrap();

        assert_eq!(dataset.first_year, 1960);
        assert_eq!(dataset.last_year, 1962);
        assert_eq!(dataset.records.len(), 2);

        let aruba = &dataset.records[0];
        assert_eq!(aruba.name, "Aruba");
        assert_eq!(aruba.code, "ABW");
        assert_eq!(aruba.rate(1960), Some(4.82));
        assert_eq!(aruba.rate(1962), None);

        let arab = dataset.record("Arab World").unwrap();
        assert_eq!(arab.rate(1961), None);
        assert_eq!(arab.rate(1962), Some(6.95));
    }

    #[test]
    fn accepts_wrapped_and_plain_coordinate_files() {
        let (_dir, input) = fixture(TABLE, COORDS);
        let wrapped = load_dataset(&input).unwrap();
        assert_eq!(
            wrapped.coordinate("ABW"),
            Some(&CountryCoordinate {
                latitude: 12.5,
                longitude: -69.97
            })
        );
        assert!(wrapped.coordinate("ARB").is_none());

        let (_dir, input) = fixture(TABLE, r#"{"ARB": {"latitude": 25.0, "longitude": 45.0}}"#);
        let plain = load_dataset(&input).unwrap();
        assert_eq!(plain.coordinates.len(), 1);
        assert!(plain.coordinate("ARB").is_some());
    }

    #[test]
    fn missing_files_are_unavailable() {
        let (dir, mut input) = fixture(TABLE, COORDS);
        input.coordinates = dir.path().join("nope.json");
        assert!(matches!(
            load_dataset(&input),
            Err(FertilityError::DataUnavailable { .. })
        ));

        let (dir, mut input) = fixture(TABLE, COORDS);
        input.data_csv = dir.path().join("nope.csv");
        assert!(matches!(
            load_dataset(&input),
            Err(FertilityError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn gapped_year_columns_are_rejected() {
        let table = "Country Name,Country Code,1960,1962\nAruba,ABW,4.8,4.6\n";
        let (_dir, input) = fixture(table, COORDS);
        assert!(matches!(
            load_dataset(&input),
            Err(FertilityError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn non_numeric_cell_is_rejected() {
        let table = "Country Name,Country Code,1960\nAruba,ABW,lots\n";
        let (_dir, input) = fixture(table, COORDS);
        let err = load_dataset(&input).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let (_dir, input) = fixture(TABLE, r#"{"ABW": {"latitude": "north"}}"#);
        assert!(load_dataset(&input).is_err());

        let (_dir, input) = fixture(TABLE, "[1, 2]");
        assert!(load_dataset(&input).is_err());
    }
}
