use crate::{Constant, CrustyError, DataType, TableSchema, Tuple};
use std::fs::File;
use std::io::Read;

/// Reads headerless CSV rows and types each column by the schema.
///
/// # Arguments
///
/// * `reader` - Source of the CSV text.
/// * `schema` - Schema the rows must match.
pub fn read_tuples<R: Read>(reader: R, schema: &TableSchema) -> Result<Vec<Tuple>, CrustyError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut tuples = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let rec = result?;
        if rec.len() != schema.size() {
            return Err(CrustyError::ValidationError(format!(
                "CSV row {} has {} columns, expected {}",
                line + 1,
                rec.len(),
                schema.size()
            )));
        }
        let mut vals = Vec::with_capacity(rec.len());
        for (field, attr) in rec.iter().zip(schema.attributes()) {
            match attr.dtype() {
                DataType::Int => {
                    let value = field.parse::<i32>().map_err(|_| {
                        CrustyError::ValidationError(format!(
                            "CSV row {}: '{}' is not an integer for {}",
                            line + 1,
                            field,
                            attr.name()
                        ))
                    })?;
                    vals.push(Constant::Int(value));
                }
                DataType::String(_) => vals.push(Constant::String(field.to_string())),
            }
        }
        tuples.push(Tuple::new(vals));
    }
    debug!("Read {} rows of CSV", tuples.len());
    Ok(tuples)
}

/// Reads a CSV file; see `read_tuples`.
pub fn read_tuples_from_file(path: &str, schema: &TableSchema) -> Result<Vec<Tuple>, CrustyError> {
    debug!("common::csv_utils trying to open file, path: {:?}", path);
    let file = File::open(path)?;
    read_tuples(file, schema)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_read_typed_rows() {
        init();
        let schema = get_int_string_schema("id", "name", 10);
        let rows = read_tuples("1, amy\n2,bob\n".as_bytes(), &schema).unwrap();
        assert_eq!(int_string_tuples(&[(1, "amy"), (2, "bob")]), rows);
    }

    #[test]
    fn test_bad_rows() {
        init();
        let schema = get_int_string_schema("id", "name", 10);
        assert!(read_tuples("x,amy\n".as_bytes(), &schema).is_err());
        assert!(read_tuples("1,amy,3\n".as_bytes(), &schema).is_err());
    }
}
