//! Standard result shapes of the metadata calls.
//!
//! `get_info`, `get_objects` and `get_table_types` return Arrow data with a
//! fixed layout. This module defines those schemas and converts between them
//! and plain Rust values, so the manager can filter driver output and callers
//! (or in-process drivers) need not walk nested arrays by hand.
//!
//! # Layouts
//!
//! - info: `info_name: uint32`, `info_value: dense_union<string_value,
//!   bool_value, int64_value, int32_bitmask, string_list,
//!   int32_to_int32_list_map>`
//! - objects: `catalog_name`, `catalog_db_schemas: list<struct<db_schema_name,
//!   db_schema_tables: list<struct<table_name, table_type, table_columns,
//!   table_constraints>>>>`
//! - table types: `table_type: utf8 not null`

use std::collections::HashSet;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Int16Type, Int32Type, UInt32Type};
use arrow_array::{
    Array, ArrayRef, BooleanArray, Int16Array, Int32Array, Int64Array, ListArray, MapArray,
    RecordBatch, StringArray, StructArray, UInt32Array, UnionArray, new_empty_array,
    new_null_array,
};
use arrow_buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow_schema::{ArrowError, DataType, Field, Fields, Schema, SchemaRef, UnionFields, UnionMode};

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

fn int32_list_map_entries() -> Fields {
    Fields::from(vec![
        Field::new("key", DataType::Int32, false),
        Field::new("value", list_of(DataType::Int32), true),
    ])
}

fn int32_list_map_type() -> DataType {
    DataType::Map(
        Arc::new(Field::new(
            "entries",
            DataType::Struct(int32_list_map_entries()),
            false,
        )),
        false,
    )
}

fn info_value_fields() -> UnionFields {
    UnionFields::new(
        [0, 1, 2, 3, 4, 5],
        [
            Field::new("string_value", DataType::Utf8, true),
            Field::new("bool_value", DataType::Boolean, true),
            Field::new("int64_value", DataType::Int64, true),
            Field::new("int32_bitmask", DataType::Int32, true),
            Field::new("string_list", list_of(DataType::Utf8), true),
            Field::new("int32_to_int32_list_map", int32_list_map_type(), true),
        ],
    )
}

/// Schema of `get_info` results.
pub fn info_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("info_name", DataType::UInt32, false),
        Field::new(
            "info_value",
            DataType::Union(info_value_fields(), UnionMode::Dense),
            true,
        ),
    ]))
}

/// Schema of `get_table_types` results.
pub fn table_types_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new(
        "table_type",
        DataType::Utf8,
        false,
    )]))
}

fn usage_fields() -> Fields {
    Fields::from(vec![
        Field::new("fk_catalog", DataType::Utf8, true),
        Field::new("fk_db_schema", DataType::Utf8, true),
        Field::new("fk_table", DataType::Utf8, false),
        Field::new("fk_column_name", DataType::Utf8, false),
    ])
}

fn constraint_fields() -> Fields {
    Fields::from(vec![
        Field::new("constraint_name", DataType::Utf8, true),
        Field::new("constraint_type", DataType::Utf8, false),
        Field::new("constraint_column_names", list_of(DataType::Utf8), false),
        Field::new(
            "constraint_column_usage",
            list_of(DataType::Struct(usage_fields())),
            true,
        ),
    ])
}

fn column_fields() -> Fields {
    Fields::from(vec![
        Field::new("column_name", DataType::Utf8, false),
        Field::new("ordinal_position", DataType::Int32, true),
        Field::new("remarks", DataType::Utf8, true),
        Field::new("xdbc_data_type", DataType::Int16, true),
        Field::new("xdbc_type_name", DataType::Utf8, true),
        Field::new("xdbc_column_size", DataType::Int32, true),
        Field::new("xdbc_decimal_digits", DataType::Int16, true),
        Field::new("xdbc_num_prec_radix", DataType::Int16, true),
        Field::new("xdbc_nullable", DataType::Int16, true),
        Field::new("xdbc_column_def", DataType::Utf8, true),
        Field::new("xdbc_sql_data_type", DataType::Int16, true),
        Field::new("xdbc_datetime_sub", DataType::Int16, true),
        Field::new("xdbc_char_octet_length", DataType::Int32, true),
        Field::new("xdbc_is_nullable", DataType::Utf8, true),
        Field::new("xdbc_scope_catalog", DataType::Utf8, true),
        Field::new("xdbc_scope_schema", DataType::Utf8, true),
        Field::new("xdbc_scope_table", DataType::Utf8, true),
        Field::new("xdbc_is_autoincrement", DataType::Boolean, true),
        Field::new("xdbc_is_generatedcolumn", DataType::Boolean, true),
    ])
}

fn table_fields() -> Fields {
    Fields::from(vec![
        Field::new("table_name", DataType::Utf8, false),
        Field::new("table_type", DataType::Utf8, false),
        Field::new("table_columns", list_of(DataType::Struct(column_fields())), true),
        Field::new(
            "table_constraints",
            list_of(DataType::Struct(constraint_fields())),
            true,
        ),
    ])
}

fn db_schema_fields() -> Fields {
    Fields::from(vec![
        Field::new("db_schema_name", DataType::Utf8, true),
        Field::new(
            "db_schema_tables",
            list_of(DataType::Struct(table_fields())),
            true,
        ),
    ])
}

/// Schema of `get_objects` results.
pub fn objects_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("catalog_name", DataType::Utf8, true),
        Field::new(
            "catalog_db_schemas",
            list_of(DataType::Struct(db_schema_fields())),
            true,
        ),
    ]))
}

/// One value of a `get_info` row.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    String(String),
    Bool(bool),
    Int64(i64),
    Int32Bitmask(i32),
    StringList(Vec<String>),
    Int32ToInt32ListMap(Vec<(i32, Vec<i32>)>),
}

impl InfoValue {
    fn type_id(&self) -> i8 {
        match self {
            InfoValue::String(_) => 0,
            InfoValue::Bool(_) => 1,
            InfoValue::Int64(_) => 2,
            InfoValue::Int32Bitmask(_) => 3,
            InfoValue::StringList(_) => 4,
            InfoValue::Int32ToInt32ListMap(_) => 5,
        }
    }

    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            InfoValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        InfoValue::String(value.to_string())
    }
}

/// Builds a list array from optional per-row lengths over flattened values.
fn list_array(lengths: &[Option<usize>], values: ArrayRef) -> Result<ListArray, ArrowError> {
    let offsets = OffsetBuffer::<i32>::from_lengths(lengths.iter().map(|l| l.unwrap_or(0)));
    let nulls = lengths
        .iter()
        .any(Option::is_none)
        .then(|| NullBuffer::from(lengths.iter().map(Option::is_some).collect::<Vec<_>>()));
    let field = Arc::new(Field::new("item", values.data_type().clone(), true));
    ListArray::try_new(field, offsets, values, nulls)
}

/// Encodes `(code, value)` pairs in the standard info layout.
pub fn encode_info(entries: &[(u32, InfoValue)]) -> Result<RecordBatch, ArrowError> {
    let mut strings = Vec::new();
    let mut bools = Vec::new();
    let mut int64s = Vec::new();
    let mut bitmasks = Vec::new();
    let mut list_lengths = Vec::new();
    let mut list_values: Vec<&str> = Vec::new();
    let mut map_lengths = Vec::new();
    let mut map_keys = Vec::new();
    let mut map_value_lengths = Vec::new();
    let mut map_values = Vec::new();

    let mut type_ids = Vec::with_capacity(entries.len());
    let mut offsets = Vec::with_capacity(entries.len());
    for (_, value) in entries {
        let offset = match value {
            InfoValue::String(s) => {
                strings.push(s.as_str());
                strings.len()
            }
            InfoValue::Bool(b) => {
                bools.push(*b);
                bools.len()
            }
            InfoValue::Int64(v) => {
                int64s.push(*v);
                int64s.len()
            }
            InfoValue::Int32Bitmask(v) => {
                bitmasks.push(*v);
                bitmasks.len()
            }
            InfoValue::StringList(items) => {
                list_values.extend(items.iter().map(String::as_str));
                list_lengths.push(Some(items.len()));
                list_lengths.len()
            }
            InfoValue::Int32ToInt32ListMap(pairs) => {
                for (key, values) in pairs {
                    map_keys.push(*key);
                    map_value_lengths.push(Some(values.len()));
                    map_values.extend_from_slice(values);
                }
                map_lengths.push(pairs.len());
                map_lengths.len()
            }
        };
        type_ids.push(value.type_id());
        offsets.push(offset as i32 - 1);
    }

    let entries_struct = StructArray::try_new(
        int32_list_map_entries(),
        vec![
            Arc::new(Int32Array::from(map_keys)),
            Arc::new(list_array(
                &map_value_lengths,
                Arc::new(Int32Array::from(map_values)),
            )?),
        ],
        None,
    )?;
    let DataType::Map(map_field, _) = int32_list_map_type() else {
        unreachable!("map type is constructed above");
    };
    let map = MapArray::try_new(
        map_field,
        OffsetBuffer::<i32>::from_lengths(map_lengths),
        entries_struct,
        None,
        false,
    )?;

    let children: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(strings)),
        Arc::new(BooleanArray::from(bools)),
        Arc::new(Int64Array::from(int64s)),
        Arc::new(Int32Array::from(bitmasks)),
        Arc::new(list_array(
            &list_lengths,
            Arc::new(StringArray::from(list_values)),
        )?),
        Arc::new(map),
    ];
    let union = UnionArray::try_new(
        info_value_fields(),
        ScalarBuffer::from(type_ids),
        Some(ScalarBuffer::from(offsets)),
        children,
    )?;

    let codes = UInt32Array::from(entries.iter().map(|(code, _)| *code).collect::<Vec<_>>());
    RecordBatch::try_new(info_schema(), vec![Arc::new(codes), Arc::new(union)])
}

fn invalid(msg: impl Into<String>) -> ArrowError {
    ArrowError::InvalidArgumentError(msg.into())
}

fn column<'a>(batch_or_struct: &'a StructArray, name: &str) -> Result<&'a ArrayRef, ArrowError> {
    batch_or_struct
        .column_by_name(name)
        .ok_or_else(|| invalid(format!("missing field '{}'", name)))
}

fn strings<'a>(array: &'a ArrayRef, name: &str) -> Result<&'a StringArray, ArrowError> {
    array
        .as_string_opt::<i32>()
        .ok_or_else(|| invalid(format!("field '{}' is not utf8", name)))
}

fn lists<'a>(array: &'a ArrayRef, name: &str) -> Result<&'a ListArray, ArrowError> {
    array
        .as_list_opt::<i32>()
        .ok_or_else(|| invalid(format!("field '{}' is not a list", name)))
}

fn opt_string(array: &StringArray, row: usize) -> Option<String> {
    array.is_valid(row).then(|| array.value(row).to_string())
}

fn string_list(array: &ArrayRef) -> Result<Vec<String>, ArrowError> {
    let values = strings(array, "item")?;
    Ok((0..values.len()).filter_map(|i| opt_string(values, i)).collect())
}

/// Decodes a batch in the standard info layout.
pub fn decode_info(batch: &RecordBatch) -> Result<Vec<(u32, InfoValue)>, ArrowError> {
    let codes = batch
        .column_by_name("info_name")
        .and_then(|c| c.as_primitive_opt::<UInt32Type>())
        .ok_or_else(|| invalid("missing uint32 column 'info_name'"))?;
    let union = batch
        .column_by_name("info_value")
        .and_then(|c| c.as_any().downcast_ref::<UnionArray>())
        .ok_or_else(|| invalid("missing union column 'info_value'"))?;
    let DataType::Union(fields, _) = union.data_type() else {
        return Err(invalid("info_value is not a union"));
    };

    let mut out = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let type_id = union.type_id(row);
        let offset = union.value_offset(row);
        let name = fields
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, f)| f.name().as_str())
            .ok_or_else(|| invalid(format!("unknown union type id {}", type_id)))?;
        let child = union.child(type_id);
        let value = match name {
            "string_value" => InfoValue::String(strings(child, name)?.value(offset).to_string()),
            "bool_value" => InfoValue::Bool(
                child
                    .as_boolean_opt()
                    .ok_or_else(|| invalid("bool_value is not boolean"))?
                    .value(offset),
            ),
            "int64_value" => InfoValue::Int64(
                child
                    .as_primitive_opt::<arrow_array::types::Int64Type>()
                    .ok_or_else(|| invalid("int64_value is not int64"))?
                    .value(offset),
            ),
            "int32_bitmask" => InfoValue::Int32Bitmask(
                child
                    .as_primitive_opt::<Int32Type>()
                    .ok_or_else(|| invalid("int32_bitmask is not int32"))?
                    .value(offset),
            ),
            "string_list" => InfoValue::StringList(string_list(&lists(child, name)?.value(offset))?),
            "int32_to_int32_list_map" => {
                let map = child
                    .as_map_opt()
                    .ok_or_else(|| invalid("int32_to_int32_list_map is not a map"))?;
                let entries = map.value(offset);
                let keys = entries
                    .column(0)
                    .as_primitive_opt::<Int32Type>()
                    .ok_or_else(|| invalid("map keys are not int32"))?;
                let values = lists(entries.column(1), "value")?;
                let mut pairs = Vec::with_capacity(entries.len());
                for i in 0..entries.len() {
                    let list = values.value(i);
                    let ints = list
                        .as_primitive_opt::<Int32Type>()
                        .ok_or_else(|| invalid("map values are not int32 lists"))?;
                    pairs.push((keys.value(i), ints.iter().flatten().collect()));
                }
                InfoValue::Int32ToInt32ListMap(pairs)
            }
            other => return Err(invalid(format!("unknown info value kind '{}'", other))),
        };
        out.push((codes.value(row), value));
    }
    Ok(out)
}

/// Keeps the first value per code and, when `requested` is given, only
/// requested codes.
pub fn filter_info(
    entries: impl IntoIterator<Item = (u32, InfoValue)>,
    requested: Option<&HashSet<u32>>,
) -> Vec<(u32, InfoValue)> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(code, _)| requested.is_none_or(|r| r.contains(code)))
        .filter(|(code, _)| seen.insert(*code))
        .collect()
}

/// Encodes table type names.
pub fn encode_table_types<S: AsRef<str>>(types: &[S]) -> Result<RecordBatch, ArrowError> {
    let array = StringArray::from_iter_values(types.iter().map(|t| t.as_ref()));
    RecordBatch::try_new(table_types_schema(), vec![Arc::new(array)])
}

/// Decodes table type names.
pub fn decode_table_types(batch: &RecordBatch) -> Result<Vec<String>, ArrowError> {
    let column = batch
        .column_by_name("table_type")
        .ok_or_else(|| invalid("missing column 'table_type'"))?;
    let values = strings(column, "table_type")?;
    Ok((0..values.len()).filter_map(|i| opt_string(values, i)).collect())
}

/// A catalog and, depth permitting, its schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogObjects {
    pub catalog_name: Option<String>,
    /// `None` when the requested depth stops at catalogs.
    pub db_schemas: Option<Vec<DbSchemaObjects>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbSchemaObjects {
    pub db_schema_name: Option<String>,
    pub tables: Option<Vec<TableObjects>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableObjects {
    pub table_name: String,
    pub table_type: String,
    pub columns: Option<Vec<ColumnObjects>>,
    pub constraints: Option<Vec<ConstraintObjects>>,
}

/// Column metadata. XDBC fields not listed here are encoded as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnObjects {
    pub column_name: String,
    pub ordinal_position: Option<i32>,
    pub remarks: Option<String>,
    pub xdbc_type_name: Option<String>,
    pub xdbc_nullable: Option<i16>,
    pub xdbc_is_nullable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintObjects {
    pub constraint_name: Option<String>,
    pub constraint_type: String,
    pub column_names: Vec<String>,
}

fn encode_columns(columns: &[&ColumnObjects]) -> Result<StructArray, ArrowError> {
    let n = columns.len();
    let fields = column_fields();
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let array: ArrayRef = match field.name().as_str() {
            "column_name" => Arc::new(StringArray::from_iter_values(
                columns.iter().map(|c| c.column_name.as_str()),
            )),
            "ordinal_position" => Arc::new(Int32Array::from(
                columns.iter().map(|c| c.ordinal_position).collect::<Vec<_>>(),
            )),
            "remarks" => Arc::new(StringArray::from(
                columns.iter().map(|c| c.remarks.as_deref()).collect::<Vec<_>>(),
            )),
            "xdbc_type_name" => Arc::new(StringArray::from(
                columns.iter().map(|c| c.xdbc_type_name.as_deref()).collect::<Vec<_>>(),
            )),
            "xdbc_nullable" => Arc::new(Int16Array::from(
                columns.iter().map(|c| c.xdbc_nullable).collect::<Vec<_>>(),
            )),
            "xdbc_is_nullable" => Arc::new(StringArray::from(
                columns.iter().map(|c| c.xdbc_is_nullable.as_deref()).collect::<Vec<_>>(),
            )),
            _ => new_null_array(field.data_type(), n),
        };
        arrays.push(array);
    }
    StructArray::try_new(fields, arrays, None)
}

fn encode_constraints(constraints: &[&ConstraintObjects]) -> Result<StructArray, ArrowError> {
    let names = StringArray::from(
        constraints.iter().map(|c| c.constraint_name.as_deref()).collect::<Vec<_>>(),
    );
    let types = StringArray::from_iter_values(constraints.iter().map(|c| c.constraint_type.as_str()));
    let column_lengths: Vec<Option<usize>> =
        constraints.iter().map(|c| Some(c.column_names.len())).collect();
    let column_names: Vec<&str> = constraints
        .iter()
        .flat_map(|c| c.column_names.iter().map(String::as_str))
        .collect();
    let column_values = StringArray::from(column_names);
    let usage_lengths = vec![Some(0); constraints.len()];
    let usage = list_array(
        &usage_lengths,
        new_empty_array(&DataType::Struct(usage_fields())),
    )?;
    StructArray::try_new(
        constraint_fields(),
        vec![
            Arc::new(names),
            Arc::new(types),
            Arc::new(list_array(&column_lengths, Arc::new(column_values))?),
            Arc::new(usage),
        ],
        None,
    )
}

fn encode_tables(tables: &[&TableObjects]) -> Result<StructArray, ArrowError> {
    let mut column_lengths = Vec::with_capacity(tables.len());
    let mut columns = Vec::new();
    let mut constraint_lengths = Vec::with_capacity(tables.len());
    let mut constraints = Vec::new();
    for table in tables {
        column_lengths.push(table.columns.as_ref().map(|c| {
            columns.extend(c.iter());
            c.len()
        }));
        constraint_lengths.push(table.constraints.as_ref().map(|c| {
            constraints.extend(c.iter());
            c.len()
        }));
    }
    StructArray::try_new(
        table_fields(),
        vec![
            Arc::new(StringArray::from_iter_values(
                tables.iter().map(|t| t.table_name.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                tables.iter().map(|t| t.table_type.as_str()),
            )),
            Arc::new(list_array(&column_lengths, Arc::new(encode_columns(&columns)?))?),
            Arc::new(list_array(
                &constraint_lengths,
                Arc::new(encode_constraints(&constraints)?),
            )?),
        ],
        None,
    )
}

fn encode_db_schemas(schemas: &[&DbSchemaObjects]) -> Result<StructArray, ArrowError> {
    let mut table_lengths = Vec::with_capacity(schemas.len());
    let mut tables = Vec::new();
    for schema in schemas {
        table_lengths.push(schema.tables.as_ref().map(|t| {
            tables.extend(t.iter());
            t.len()
        }));
    }
    StructArray::try_new(
        db_schema_fields(),
        vec![
            Arc::new(StringArray::from(
                schemas.iter().map(|s| s.db_schema_name.as_deref()).collect::<Vec<_>>(),
            )),
            Arc::new(list_array(&table_lengths, Arc::new(encode_tables(&tables)?))?),
        ],
        None,
    )
}

/// Encodes catalogs in the standard objects layout.
pub fn encode_objects(catalogs: &[CatalogObjects]) -> Result<RecordBatch, ArrowError> {
    let mut schema_lengths = Vec::with_capacity(catalogs.len());
    let mut schemas = Vec::new();
    for catalog in catalogs {
        schema_lengths.push(catalog.db_schemas.as_ref().map(|s| {
            schemas.extend(s.iter());
            s.len()
        }));
    }
    let names = StringArray::from(
        catalogs.iter().map(|c| c.catalog_name.as_deref()).collect::<Vec<_>>(),
    );
    RecordBatch::try_new(
        objects_schema(),
        vec![
            Arc::new(names),
            Arc::new(list_array(&schema_lengths, Arc::new(encode_db_schemas(&schemas)?))?),
        ],
    )
}

fn structs<'a>(array: &'a ArrayRef, name: &str) -> Result<&'a StructArray, ArrowError> {
    array
        .as_struct_opt()
        .ok_or_else(|| invalid(format!("field '{}' is not a struct", name)))
}

/// Decodes row `row` of a list column into a struct array of its elements.
fn decode_nested<T>(
    list: &ListArray,
    row: usize,
    name: &str,
    decode: impl Fn(&StructArray) -> Result<Vec<T>, ArrowError>,
) -> Result<Option<Vec<T>>, ArrowError> {
    if list.is_null(row) {
        return Ok(None);
    }
    let values = list.value(row);
    decode(structs(&values, name)?).map(Some)
}

fn decode_columns(columns: &StructArray) -> Result<Vec<ColumnObjects>, ArrowError> {
    let names = strings(column(columns, "column_name")?, "column_name")?;
    let ordinals = column(columns, "ordinal_position")?
        .as_primitive_opt::<Int32Type>()
        .ok_or_else(|| invalid("ordinal_position is not int32"))?;
    let remarks = strings(column(columns, "remarks")?, "remarks")?;
    let type_names = strings(column(columns, "xdbc_type_name")?, "xdbc_type_name")?;
    let nullable = column(columns, "xdbc_nullable")?
        .as_primitive_opt::<Int16Type>()
        .ok_or_else(|| invalid("xdbc_nullable is not int16"))?;
    let is_nullable = strings(column(columns, "xdbc_is_nullable")?, "xdbc_is_nullable")?;
    Ok((0..columns.len())
        .map(|i| ColumnObjects {
            column_name: names.value(i).to_string(),
            ordinal_position: ordinals.is_valid(i).then(|| ordinals.value(i)),
            remarks: opt_string(remarks, i),
            xdbc_type_name: opt_string(type_names, i),
            xdbc_nullable: nullable.is_valid(i).then(|| nullable.value(i)),
            xdbc_is_nullable: opt_string(is_nullable, i),
        })
        .collect())
}

fn decode_constraints(constraints: &StructArray) -> Result<Vec<ConstraintObjects>, ArrowError> {
    let names = strings(column(constraints, "constraint_name")?, "constraint_name")?;
    let types = strings(column(constraints, "constraint_type")?, "constraint_type")?;
    let columns = lists(
        column(constraints, "constraint_column_names")?,
        "constraint_column_names",
    )?;
    (0..constraints.len())
        .map(|i| {
            Ok(ConstraintObjects {
                constraint_name: opt_string(names, i),
                constraint_type: types.value(i).to_string(),
                column_names: if columns.is_null(i) {
                    Vec::new()
                } else {
                    string_list(&columns.value(i))?
                },
            })
        })
        .collect()
}

fn decode_tables(tables: &StructArray) -> Result<Vec<TableObjects>, ArrowError> {
    let names = strings(column(tables, "table_name")?, "table_name")?;
    let types = strings(column(tables, "table_type")?, "table_type")?;
    let columns = lists(column(tables, "table_columns")?, "table_columns")?;
    let constraints = lists(column(tables, "table_constraints")?, "table_constraints")?;
    (0..tables.len())
        .map(|i| {
            Ok(TableObjects {
                table_name: names.value(i).to_string(),
                table_type: types.value(i).to_string(),
                columns: decode_nested(columns, i, "table_columns", decode_columns)?,
                constraints: decode_nested(constraints, i, "table_constraints", decode_constraints)?,
            })
        })
        .collect()
}

fn decode_db_schemas(schemas: &StructArray) -> Result<Vec<DbSchemaObjects>, ArrowError> {
    let names = strings(column(schemas, "db_schema_name")?, "db_schema_name")?;
    let tables = lists(column(schemas, "db_schema_tables")?, "db_schema_tables")?;
    (0..schemas.len())
        .map(|i| {
            Ok(DbSchemaObjects {
                db_schema_name: opt_string(names, i),
                tables: decode_nested(tables, i, "db_schema_tables", decode_tables)?,
            })
        })
        .collect()
}

/// Decodes a batch in the standard objects layout.
pub fn decode_objects(batch: &RecordBatch) -> Result<Vec<CatalogObjects>, ArrowError> {
    let root = StructArray::from(batch.clone());
    let names = strings(column(&root, "catalog_name")?, "catalog_name")?;
    let schemas = lists(column(&root, "catalog_db_schemas")?, "catalog_db_schemas")?;
    (0..root.len())
        .map(|i| {
            Ok(CatalogObjects {
                catalog_name: opt_string(names, i),
                db_schemas: decode_nested(schemas, i, "catalog_db_schemas", decode_db_schemas)?,
            })
        })
        .collect()
}
