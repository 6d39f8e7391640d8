//! Flat CSV persistence of feature and target tables.
//!
//! Feature files carry `sensor,timestamp` followed by the rendered schema
//! columns; unset cells are empty fields. Target files carry
//! `variable,sensor,timestamp,value`. Reading checks the header against the
//! schema the caller expects, so a table written under a different
//! configuration is refused rather than silently re-labelled.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Writer};
use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::{
    FeatureSchema, FeatureTable, Observation, ObservationTable, TrainingKey,
};
use std::io::{self, Read, Write};
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const FEATURE_KEY_COLUMNS: [&str; 2] = ["sensor", "timestamp"];
const TARGET_COLUMNS: [&str; 4] = ["variable", "sensor", "timestamp", "value"];

pub fn write_features<W: Write>(table: &FeatureTable<TrainingKey>, writer: W) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    let header = FEATURE_KEY_COLUMNS.iter().map(|c| c.to_string()).chain(table.schema().names());
    csv_writer.write_record(header).map_err(csv_error)?;

    for row in table.rows() {
        let mut fields = Vec::with_capacity(row.cells.len() + 2);
        fields.push(row.key.sensor.to_string());
        fields.push(row.key.timestamp.format(TIMESTAMP_FORMAT).to_string());
        fields.extend(row.cells.iter().map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()));
        csv_writer.write_record(&fields).map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a feature table written by [`write_features`] under `schema`
pub fn read_features<R: Read>(reader: R, schema: Arc<FeatureSchema>) -> Result<FeatureTable<TrainingKey>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let header = csv_reader.headers().map_err(csv_error)?.clone();

    ensure_prefix(&header, &FEATURE_KEY_COLUMNS)?;
    let names: Vec<String> = header.iter().skip(FEATURE_KEY_COLUMNS.len()).map(String::from).collect();
    schema.ensure_names(&names).map_err(|err| match err {
        SensormeshError::SchemaMismatch { position, expected, found } => {
            SensormeshError::SchemaMismatch {
                position: position + FEATURE_KEY_COLUMNS.len(),
                expected,
                found,
            }
        }
        other => other,
    })?;

    let mut table = FeatureTable::new(schema);
    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        let number = line_of(&record);
        let fields: Vec<&str> = record.iter().collect();
        if fields.len() != header.len() {
            return Err(SensormeshError::Parse {
                line: number,
                reason: format!("expected {} fields, found {}", header.len(), fields.len()),
            });
        }

        let key = TrainingKey::new(fields[0], parse_timestamp(fields[1], number)?);
        let cells = fields[2..]
            .iter()
            .map(|field| parse_cell(field, number))
            .collect::<Result<Vec<_>>>()?;
        table.push(key, cells)?;
    }

    tracing::debug!(rows = table.len(), "Read feature table");
    Ok(table)
}

pub fn write_targets<W: Write>(targets: &ObservationTable, writer: W) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(TARGET_COLUMNS).map_err(csv_error)?;

    for (key, value) in targets.iter() {
        csv_writer
            .write_record([
                key.variable.clone(),
                key.sensor.to_string(),
                key.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                value.to_string(),
            ])
            .map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_targets<R: Read>(reader: R) -> Result<ObservationTable> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    ensure_prefix(csv_reader.headers().map_err(csv_error)?, &TARGET_COLUMNS)?;

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        let number = line_of(&record);
        let fields: Vec<&str> = record.iter().collect();
        if fields.len() != TARGET_COLUMNS.len() {
            return Err(SensormeshError::Parse {
                line: number,
                reason: format!("expected {} fields, found {}", TARGET_COLUMNS.len(), fields.len()),
            });
        }
        let value = parse_cell(fields[3], number)?.ok_or_else(|| SensormeshError::Parse {
            line: number,
            reason: "empty target value".to_string(),
        })?;
        records.push(Observation::new(fields[0], fields[1], parse_timestamp(fields[2], number)?, value));
    }

    ObservationTable::from_records(records)
}

fn ensure_prefix(header: &StringRecord, expected: &[&str]) -> Result<()> {
    for (position, &want) in expected.iter().enumerate() {
        let got = header.get(position).unwrap_or("<absent>");
        if got != want {
            return Err(SensormeshError::SchemaMismatch {
                position,
                expected: want.to_string(),
                found: got.to_string(),
            });
        }
    }
    Ok(())
}

/// 1-based line on which a record starts
fn line_of(record: &StringRecord) -> usize {
    record.position().map_or(0, |position| position.line() as usize)
}

fn csv_error(err: csv::Error) -> SensormeshError {
    match err.position() {
        Some(position) => {
            SensormeshError::Parse { line: position.line() as usize, reason: err.to_string() }
        }
        None => SensormeshError::Io(io::Error::from(err)),
    }
}

fn parse_timestamp(field: &str, line: usize) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT).map_err(|e| SensormeshError::Parse {
        line,
        reason: format!("invalid timestamp '{}': {}", field, e),
    })
}

fn parse_cell(field: &str, line: usize) -> Result<Option<f64>> {
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f64>().map(Some).map_err(|e| SensormeshError::Parse {
        line,
        reason: format!("invalid number '{}': {}", field, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sensormesh_core::models::CalendarGranularity;
    use std::io::{BufReader, Cursor};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(
            &["NO2".to_string()],
            1,
            CalendarGranularity::Hourly,
            &["primary".to_string()],
        ))
    }

    #[test]
    fn test_feature_csv_layout() {
        let mut table = FeatureTable::new(schema());
        table
            .push(
                TrainingKey::new("Site, North", ts(3)),
                vec![Some(20.5), Some(1.0), Some(0.0), Some(1.0), Some(3.0), None],
            )
            .unwrap();

        let mut buffer = Vec::new();
        write_features(&table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "sensor,timestamp,NO2_1,d_NO2_1,dow,day,hour,primary\n\
             \"Site, North\",2018-01-01 03:00:00,20.5,1,0,1,3,\n"
        );

        let restored = read_features(BufReader::new(Cursor::new(text)), schema()).unwrap();
        assert_eq!(restored.rows(), table.rows());
    }

    #[test]
    fn test_infinite_cells_survive() {
        let mut table = FeatureTable::new(schema());
        let cells = vec![Some(1.0), Some(2.0), Some(0.0), Some(1.0), Some(0.0), Some(f64::INFINITY)];
        table.push(TrainingKey::new("A", ts(0)), cells.clone()).unwrap();

        let mut buffer = Vec::new();
        write_features(&table, &mut buffer).unwrap();
        let restored = read_features(Cursor::new(buffer), schema()).unwrap();
        assert_eq!(restored.rows()[0].cells, cells);
    }

    #[test]
    fn test_header_mismatch_names_offending_column() {
        let text = "sensor,timestamp,NO2_1,d_NO2_1,dow,day,week,primary\n";
        let err = read_features(Cursor::new(text), schema()).unwrap_err();
        match err {
            SensormeshError::SchemaMismatch { position, expected, found } => {
                assert_eq!(position, 6);
                assert_eq!(expected, "hour");
                assert_eq!(found, "week");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_number_reports_line() {
        let text = "sensor,timestamp,NO2_1,d_NO2_1,dow,day,hour,primary\n\
                    A,2018-01-01 00:00:00,abc,1,0,1,0,\n";
        let err = read_features(Cursor::new(text), schema()).unwrap_err();
        assert!(matches!(err, SensormeshError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_targets_csv() {
        let targets = ObservationTable::from_records(vec![
            Observation::new("NO2", "A", ts(0), 12.0),
            Observation::new("NO2", "B", ts(1), 7.25),
        ])
        .unwrap();

        let mut buffer = Vec::new();
        write_targets(&targets, &mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("variable,sensor,timestamp,value\nNO2,A,2018-01-01 00:00:00,12\n"));

        assert_eq!(read_targets(Cursor::new(buffer)).unwrap(), targets);
    }

    #[test]
    fn test_multiline_sensor_names_survive() {
        let mut table = FeatureTable::new(schema());
        let cells = vec![Some(1.0), Some(2.0), Some(0.0), Some(1.0), Some(0.0), None];
        table.push(TrainingKey::new("Site\nNorth", ts(0)), cells.clone()).unwrap();
        table.push(TrainingKey::new("Plain", ts(0)), cells).unwrap();

        let mut buffer = Vec::new();
        write_features(&table, &mut buffer).unwrap();
        let restored = read_features(buffer.as_slice(), schema()).unwrap();
        assert_eq!(restored.rows(), table.rows());
    }

    #[test]
    fn test_sub_second_timestamps_stay_distinct() {
        let early = ts(0) + chrono::Duration::milliseconds(250);
        let late = ts(0) + chrono::Duration::milliseconds(750);
        let targets = ObservationTable::from_records(vec![
            Observation::new("NO2", "A", early, 1.0),
            Observation::new("NO2", "A", late, 2.0),
        ])
        .unwrap();

        let mut buffer = Vec::new();
        write_targets(&targets, &mut buffer).unwrap();
        let restored = read_targets(buffer.as_slice()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored, targets);
    }
}
