// CSV export of JSON records
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("no data to export")]
    Empty,
    #[error("row {0} is not an object")]
    NotAnObject(usize),
    #[error("failed to write CSV: {0}")]
    Write(#[from] csv::Error),
    #[error("failed to finish CSV output: {0}")]
    Finish(String),
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Renders `rows` as CSV. The header is the key list of the first row, in
/// insertion order; keys missing from later rows become empty cells.
pub fn export_to_csv(rows: &[Value]) -> Result<String, CsvError> {
    let first = rows.first().ok_or(CsvError::Empty)?;
    let headers: Vec<&String> = first.as_object().ok_or(CsvError::NotAnObject(0))?.keys().collect();

    let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(headers.iter().map(|h| h.as_str()))?;
    for (index, row) in rows.iter().enumerate() {
        let object = row.as_object().ok_or(CsvError::NotAnObject(index))?;
        wtr.write_record(headers.iter().map(|h| cell(object.get(h.as_str()))))?;
    }

    let bytes = wtr.into_inner().map_err(|e| CsvError::Finish(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Finish(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quotes_fields_with_commas() {
        let csv = export_to_csv(&[json!({ "a": 1, "b": "x,y" })]).unwrap();
        assert_eq!(csv, "a,b\n1,\"x,y\"\n");
    }

    #[test]
    fn test_doubles_embedded_quotes_and_fills_gaps() {
        let rows = [
            json!({ "name": "Cámara \"DSLR\"", "stock": 4.5, "note": null }),
            json!({ "name": "Laptop" }),
        ];
        let csv = export_to_csv(&rows).unwrap();
        assert_eq!(csv, "name,stock,note\n\"Cámara \"\"DSLR\"\"\",4.5,\nLaptop,,\n");
    }

    #[test]
    fn test_newline_inside_field_stays_in_one_record() {
        let csv = export_to_csv(&[json!({ "product_name": "Camisa\nAzul", "stock_level": 3 })]).unwrap();
        assert_eq!(csv, "product_name,stock_level\n\"Camisa\nAzul\",3\n");

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Camisa\nAzul");
    }

    #[test]
    fn test_rejects_empty_and_non_objects() {
        assert!(matches!(export_to_csv(&[]), Err(CsvError::Empty)));
        assert!(matches!(
            export_to_csv(&[json!({ "a": 1 }), json!([1])]),
            Err(CsvError::NotAnObject(1))
        ));
    }
}
