extern crate csv;
#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use sqlparser::ast;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
pub mod ops;
pub use ops::{AggOp, PredicateOp};
pub mod catalog;
pub mod config;
pub mod csv_utils;
pub mod database;
pub mod ids;
pub mod index;
pub mod storage_trait;
pub mod table;
pub mod testutil;

/// How big each page is
pub const PAGE_SIZE: usize = 4096;
// How many pages a buffer pool can hold
pub const PAGE_SLOTS: usize = 50;
/// Bytes reserved at the front of every record slot for its in-use flag.
pub const SLOT_HEADER_SIZE: usize = 4;
/// Length used for `varchar` columns declared without one.
pub const DEFAULT_STRING_LEN: usize = 32;

/// Custom error type.
#[derive(Debug, Clone, PartialEq)]
pub enum CrustyError {
    /// IO Errors.
    IOError(String),
    /// Custom errors.
    CrustyError(String),
    /// Validation errors.
    ValidationError(String),
    /// Execution errors.
    ExecutionError(String),
    /// A referenced field is not part of the schema it was looked up in.
    FieldNotFound(String),
    /// An aggregate was asked for a value before it saw any record.
    DegenerateAggregate(String),
    /// Transaction aborted.
    TransactionAbortedError,
}

impl fmt::Display for CrustyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CrustyError::ValidationError(s) => format!("Validation Error: {}", s),
                CrustyError::ExecutionError(s) => format!("Execution Error: {}", s),
                CrustyError::CrustyError(s) => format!("Crusty Error: {}", s),
                CrustyError::FieldNotFound(s) => format!("Field not found: {}", s),
                CrustyError::DegenerateAggregate(s) => format!("Degenerate aggregate: {}", s),
                CrustyError::IOError(s) => s.to_string(),
                CrustyError::TransactionAbortedError => String::from("Transaction Aborted Error"),
            }
        )
    }
}

// Implement std::convert::From for AppError; from io::Error
impl From<io::Error> for CrustyError {
    fn from(error: io::Error) -> Self {
        CrustyError::IOError(error.to_string())
    }
}

impl From<serde_cbor::Error> for CrustyError {
    fn from(error: serde_cbor::Error) -> Self {
        CrustyError::IOError(format!("Record encoding: {}", error))
    }
}

impl From<csv::Error> for CrustyError {
    fn from(error: csv::Error) -> Self {
        CrustyError::IOError(format!("CSV: {}", error))
    }
}

impl Error for CrustyError {}

/// Return type for a query result.
#[derive(Debug)]
pub struct QueryResult {
    result: String,
}

impl QueryResult {
    /// Return an empty result.
    pub fn empty() -> Self {
        Self {
            result: String::from(""),
        }
    }

    /// Return a result with string.
    ///
    /// # Arguments
    ///
    /// * `result` - Result to return.
    pub fn new(result: &str) -> Self {
        Self {
            result: result.to_string(),
        }
    }

    /// Get the result.
    pub fn result(&self) -> &str {
        &self.result
    }
}

/// Handle schemas.
///
/// Field names are unique within a schema; `merge` keeps the first
/// occurrence of a name.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct TableSchema {
    /// Attributes of the schema.
    attributes: Vec<Attribute>,
    /// Mapping from attribute name to order in the schema.
    name_map: HashMap<String, usize>,
}

impl Serialize for TableSchema {
    /// Custom serialize to avoid serializing name_map.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    /// Custom deserialize to avoid serializing name_map.
    fn deserialize<D>(deserializer: D) -> Result<TableSchema, D::Error>
    where
        D: Deserializer<'de>,
    {
        let attrs = Vec::deserialize(deserializer)?;
        Ok(TableSchema::new(attrs))
    }
}

impl TableSchema {
    /// Create a new schema.
    ///
    /// # Arguments
    ///
    /// * `attributes` - Attributes of the schema in the order that they are in the schema.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut schema = Self::default();
        for attr in attributes {
            schema.add_attribute(attr);
        }
        schema
    }

    /// Create a new schema with the given names and dtypes.
    ///
    /// # Arguments
    ///
    /// * `names` - Names of the new schema.
    /// * `dtypes` - Dypes of the new schema.
    pub fn from_vecs(names: Vec<&str>, dtypes: Vec<DataType>) -> Self {
        let mut attrs = Vec::new();
        for (name, dtype) in names.iter().zip(dtypes.iter()) {
            attrs.push(Attribute::new(name.to_string(), dtype.clone()));
        }
        TableSchema::new(attrs)
    }

    /// Appends an attribute unless one with the same name is already present.
    pub fn add_attribute(&mut self, attr: Attribute) {
        if self.name_map.contains_key(attr.name()) {
            return;
        }
        self.name_map
            .insert(attr.name().to_string(), self.attributes.len());
        self.attributes.push(attr);
    }

    /// Adds an integer field.
    pub fn add_int_field(&mut self, name: &str) {
        self.add_attribute(Attribute::new(name.to_string(), DataType::Int));
    }

    /// Adds a string field holding at most `len` characters.
    pub fn add_string_field(&mut self, name: &str, len: usize) {
        self.add_attribute(Attribute::new(name.to_string(), DataType::String(len)));
    }

    /// Copies the named field from another schema.
    ///
    /// # Arguments
    ///
    /// * `name` - Field to copy.
    /// * `other` - Schema that holds the field.
    pub fn add_from(&mut self, name: &str, other: &TableSchema) -> Result<(), CrustyError> {
        let attr = other
            .get_attribute_by_name(name)
            .ok_or_else(|| CrustyError::FieldNotFound(name.to_string()))?;
        self.add_attribute(attr.clone());
        Ok(())
    }

    /// Get the attribute from the given index.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the attribute to look for.
    pub fn get_attribute(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    /// Get the attribute with the given name.
    pub fn get_attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.name_map
            .get(name)
            .and_then(|i| self.attributes.get(*i))
    }

    /// Get the index of the attribute.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to get the index for.
    pub fn get_field_index(&self, name: &str) -> Option<&usize> {
        self.name_map.get(name)
    }

    /// Like `get_field_index`, but a missing field is an error.
    pub fn field_index(&self, name: &str) -> Result<usize, CrustyError> {
        self.name_map
            .get(name)
            .copied()
            .ok_or_else(|| CrustyError::FieldNotFound(name.to_string()))
    }

    /// Check if the attribute name is in the schema.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to look for.
    pub fn contains(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// Get an iterator of the attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// Merge two schemas into one.
    ///
    /// The other schema is appended to the current schema. Names already
    /// present in `self` are skipped.
    ///
    /// # Arguments
    ///
    /// * `other` - Other schema to add to current schema.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for attr in other.attributes() {
            merged.add_attribute(attr.clone());
        }
        merged
    }

    /// Restricts the schema to the given fields, in the given order.
    pub fn project(&self, fields: &[String]) -> Result<Self, CrustyError> {
        let mut projected = Self::default();
        for name in fields {
            projected.add_from(name, self)?;
        }
        Ok(projected)
    }

    /// Returns the length of the schema.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the size of the schema in bytes.
    pub fn byte_size(&self) -> usize {
        let mut total: usize = 0;
        for attr in self.attributes.iter() {
            total += attr.get_byte_len();
        }
        total
    }

    /// Bytes one record of this schema occupies in a block, header included.
    pub fn slot_size(&self) -> usize {
        SLOT_HEADER_SIZE + self.byte_size()
    }

    /// A record with every field set to its type's zero value.
    pub fn blank_tuple(&self) -> Tuple {
        Tuple::new(self.attributes.iter().map(|a| a.dtype.zero()).collect())
    }
}

/// Handle attributes. Pairs the name with the dtype.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute dtype.
    pub dtype: DataType,
}

impl Attribute {
    /// Create a new attribute with the given name and dtype.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute.
    /// * `dtype` - Dtype of the attribute.
    pub fn new(name: String, dtype: DataType) -> Self {
        Self { name, dtype }
    }

    /// Returns the name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dtype of the attribute.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    /// Returns the length of the dtype in bytes.
    pub fn get_byte_len(&self) -> usize {
        match self.dtype {
            DataType::Int => 4,
            DataType::String(len) => 4 + len,
        }
    }
}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Serialize, Deserialize, Clone, Debug)]
pub enum DataType {
    Int,
    /// Bounded string with its maximum length in characters.
    String(usize),
}

impl DataType {
    /// Value a freshly inserted record holds before any field is set.
    pub fn zero(&self) -> Constant {
        match self {
            DataType::Int => Constant::Int(0),
            DataType::String(_) => Constant::String(String::new()),
        }
    }
}

/// A single value held by a record field or written in a query.
///
/// Ordering and equality are only meaningful between values of the same variant.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Clone, Hash)]
pub enum Constant {
    Int(i32),
    String(String),
}

impl Constant {
    /// Returns the integer payload.
    pub fn as_int(&self) -> Result<i32, CrustyError> {
        match self {
            Constant::Int(i) => Ok(*i),
            _ => Err(CrustyError::ExecutionError(format!(
                "Expected an integer, found '{}'",
                self
            ))),
        }
    }

    /// Returns the string payload.
    pub fn as_str(&self) -> Result<&str, CrustyError> {
        match self {
            Constant::String(s) => Ok(&s),
            _ => Err(CrustyError::ExecutionError(format!(
                "Expected a string, found {}",
                self
            ))),
        }
    }
}

impl From<i32> for Constant {
    fn from(i: i32) -> Self {
        Constant::Int(i)
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::String(s.to_string())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(x) => write!(f, "{}", x),
            Constant::String(x) => write!(f, "{}", x),
        }
    }
}

/// Tuple type.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Hash)]
pub struct Tuple {
    /// Tuple data.
    pub field_vals: Vec<Constant>,
}

impl Tuple {
    /// Create a new tuple with the given data.
    ///
    /// # Arguments
    ///
    /// * `field_vals` - Field values of the tuple.
    pub fn new(field_vals: Vec<Constant>) -> Self {
        Self { field_vals }
    }

    /// Get the field at index.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the field.
    pub fn get_field(&self, i: usize) -> Option<&Constant> {
        self.field_vals.get(i)
    }

    /// Update the index at field.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the value to insert.
    /// * `f` - Value to add.
    pub fn set_field(&mut self, i: usize, f: Constant) -> Result<(), CrustyError> {
        let slot = self.field_vals.get_mut(i).ok_or_else(|| {
            CrustyError::ExecutionError(format!("Field index {} out of bounds", i))
        })?;
        *slot = f;
        Ok(())
    }

    /// Returns an iterator over the field values.
    pub fn field_vals(&self) -> impl Iterator<Item = &Constant> {
        self.field_vals.iter()
    }

    /// Return the length of the tuple.
    pub fn size(&self) -> usize {
        self.field_vals.len()
    }

    /// Append another tuple with self.
    ///
    /// # Arguments
    ///
    /// * `other` - Other tuple to append.
    pub fn merge(&self, other: &Self) -> Self {
        let mut fields = self.field_vals.clone();
        fields.append(&mut other.field_vals.clone());
        Self::new(fields)
    }

    pub fn get_bytes(&self) -> Result<Vec<u8>, CrustyError> {
        Ok(serde_cbor::to_vec(&self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CrustyError> {
        Ok(serde_cbor::from_slice(bytes)?)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for field in &self.field_vals {
            res.push_str(&field.to_string());
            res.push('\t');
        }
        write!(f, "{}", res)
    }
}

/// Retrieve the name from the command parser object.
///
/// # Argument
///
/// * `name` - Name object from the command parser.
pub fn get_name(name: &ast::ObjectName) -> Result<String, CrustyError> {
    match name.0.as_slice() {
        [single] => Ok(single.clone()),
        _ => Err(CrustyError::CrustyError(String::from(
            "Error no . names supported",
        ))),
    }
}

/// Retrieve the dtype from the command parser object.
///
/// # Argument
///
/// * `dtype` - Name object from the command parser.
pub fn get_attr(dtype: &ast::DataType) -> Result<DataType, CrustyError> {
    match dtype {
        ast::DataType::Int => Ok(DataType::Int),
        ast::DataType::Varchar(len) | ast::DataType::Char(len) => Ok(DataType::String(
            len.map(|l| l as usize).unwrap_or(DEFAULT_STRING_LEN),
        )),
        _ => Err(CrustyError::CrustyError(String::from(
            "Unsupported data type ",
        ))),
    }
}

#[cfg(test)]
mod libtests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_tuple_bytes() {
        let tuple = int_vec_to_tuple(vec![0, 1, 0]);
        let tuple_bytes = tuple.get_bytes().unwrap();
        let check_tuple: Tuple = Tuple::from_bytes(&tuple_bytes).unwrap();
        assert_eq!(tuple, check_tuple);
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let left = TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::Int]);
        let right = TableSchema::from_vecs(
            vec!["b", "c"],
            vec![DataType::String(5), DataType::String(5)],
        );
        let merged = left.merge(&right);
        assert_eq!(vec!["a", "b", "c"], merged.field_names());
        assert_eq!(&DataType::Int, merged.get_attribute(1).unwrap().dtype());
        assert_eq!(2, *merged.get_field_index("c").unwrap());
    }

    #[test]
    fn test_project_missing_field() {
        let schema = get_int_table_schema(vec!["a", "b"]);
        let err = schema
            .project(&[String::from("b"), String::from("z")])
            .unwrap_err();
        assert_eq!(CrustyError::FieldNotFound(String::from("z")), err);
        let proj = schema.project(&[String::from("b")]).unwrap();
        assert_eq!(vec!["b"], proj.field_names());
    }

    #[test]
    fn test_slot_size() {
        let schema = TableSchema::from_vecs(vec!["id", "name"], vec![DataType::Int, DataType::String(10)]);
        assert_eq!(SLOT_HEADER_SIZE + 4 + 14, schema.slot_size());
        assert_eq!(
            Tuple::new(vec![Constant::Int(0), Constant::String(String::new())]),
            schema.blank_tuple()
        );
    }

    #[test]
    fn test_constant_accessors() {
        assert_eq!(7, Constant::Int(7).as_int().unwrap());
        assert!(Constant::Int(7).as_str().is_err());
        assert_eq!("x", Constant::from("x").as_str().unwrap());
        assert!(Constant::Int(1) < Constant::Int(2));
        assert!(Constant::from("a") < Constant::from("b"));
    }
}
