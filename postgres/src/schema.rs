use std::fmt;

use pg_escape::quote_identifier;
use serde::Serialize;

/// Query returning `(column_name, data_type, is_nullable)` for one table, in column order.
///
/// Parameters: `$1` is the schema (namespace), `$2` the table name.
pub const TABLE_COLUMNS_QUERY: &str = "select column_name::text, data_type::text, is_nullable::text \
     from information_schema.columns \
     where table_schema::text = $1 and table_name::text = $2 \
     order by ordinal_position";

/// A fully qualified warehouse table name consisting of a schema and table name.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub struct TableName {
    /// The schema name containing the table
    pub schema: String,
    /// The name of the table within the schema
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the table name as a properly quoted Postgres identifier.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// Destination column type as far as value coercion is concerned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    TimestampTz,
    Timestamp,
    Uuid,
    Unrecognized,
}

macro_rules! define_data_type_mappings {
    (
        $(
            $data_type:literal => $logical_type:ident
        ),* $(,)?
    ) => {
        impl LogicalType {
            /// Maps an `information_schema.columns.data_type` value to a [`LogicalType`].
            ///
            /// Matching is case-insensitive. Unknown names map to [`LogicalType::Unrecognized`].
            pub fn from_data_type(data_type: &str) -> LogicalType {
                match data_type.trim().to_ascii_lowercase().as_str() {
                    $(
                        $data_type => LogicalType::$logical_type,
                    )*
                    _ => LogicalType::Unrecognized,
                }
            }
        }

        #[cfg(test)]
        fn data_type_mappings() -> Vec<(&'static str, LogicalType)> {
            vec![
                $(
                    ($data_type, LogicalType::$logical_type),
                )*
            ]
        }
    };
}

define_data_type_mappings! {
    // Character types
    "text" => Text,
    "character varying" => Text,
    "character" => Text,

    // Integer types
    "integer" => Integer,
    "bigint" => Integer,
    "smallint" => Integer,

    // Arbitrary precision and floating point types
    "numeric" => Decimal,
    "decimal" => Decimal,
    "real" => Decimal,
    "double precision" => Decimal,

    "boolean" => Boolean,

    // Date/time types
    "date" => Date,
    "time" => Time,
    "time without time zone" => Time,
    "timestamp with time zone" => TimestampTz,
    "timestamp" => Timestamp,
    "timestamp without time zone" => Timestamp,

    "uuid" => Uuid,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Text => "text",
            LogicalType::Integer => "integer",
            LogicalType::Decimal => "decimal",
            LogicalType::Boolean => "boolean",
            LogicalType::Date => "date",
            LogicalType::Time => "time",
            LogicalType::TimestampTz => "timestamptz",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Uuid => "uuid",
            LogicalType::Unrecognized => "unrecognized",
        };

        f.write_str(name)
    }
}

/// Type and nullability contract of one destination column.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnSchema {
    /// The name of the column
    pub name: String,
    /// The raw catalog `data_type` value
    pub data_type: String,
    /// The coercion target derived from `data_type`
    pub logical_type: LogicalType,
    /// Whether the column can contain NULL values
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        let data_type = data_type.into();
        let logical_type = LogicalType::from_data_type(&data_type);

        Self {
            name: name.into(),
            data_type,
            logical_type,
            nullable,
        }
    }

    /// Builds a column from one row of [`TABLE_COLUMNS_QUERY`], where `is_nullable` is `YES` or `NO`.
    pub fn from_catalog(name: String, data_type: String, is_nullable: &str) -> Self {
        Self::new(name, data_type, is_nullable.eq_ignore_ascii_case("yes"))
    }
}

/// Column contracts of one destination table, in catalog column order.
///
/// An empty schema means the table is unknown to the catalog.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TableSchema {
    pub column_schemas: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(column_schemas: Vec<ColumnSchema>) -> Self {
        Self { column_schemas }
    }

    pub fn is_empty(&self) -> bool {
        self.column_schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.column_schemas.len()
    }

    /// Returns the contract for `column`, if the catalog knows it.
    pub fn get(&self, column: &str) -> Option<&ColumnSchema> {
        self.column_schemas.iter().find(|cs| cs.name == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.column_schemas.iter()
    }
}

impl FromIterator<ColumnSchema> for TableSchema {
    fn from_iter<T: IntoIterator<Item = ColumnSchema>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
