use pg_escape::quote_identifier;

use crate::schema::TableName;

/// Foreign key target of a column: `(table, column)`.
type Reference = (&'static str, &'static str);

/// Definition of one column of a warehouse table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub name: &'static str,
    /// SQL type including any column constraints, e.g. `INT NOT NULL`.
    pub definition: &'static str,
    pub references: Option<Reference>,
}

const fn column(name: &'static str, definition: &'static str) -> ColumnDefinition {
    ColumnDefinition {
        name,
        definition,
        references: None,
    }
}

const fn foreign(
    name: &'static str,
    definition: &'static str,
    table: &'static str,
    target: &'static str,
) -> ColumnDefinition {
    ColumnDefinition {
        name,
        definition,
        references: Some((table, target)),
    }
}

/// A table of the dimensional model.
#[derive(Debug, Clone, Copy)]
pub struct WarehouseTable {
    pub name: &'static str,
    pub columns: &'static [ColumnDefinition],
}

impl WarehouseTable {
    /// Returns the names of the tables this table references, without duplicates.
    pub fn dependencies(&self) -> Vec<&'static str> {
        let mut dependencies: Vec<&'static str> = Vec::new();
        for (table, _) in self.columns.iter().filter_map(|c| c.references) {
            if !dependencies.contains(&table) {
                dependencies.push(table);
            }
        }

        dependencies
    }

    /// Returns the idempotent `CREATE TABLE IF NOT EXISTS` statement in `namespace`.
    pub fn create_statement(&self, namespace: &str) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut rendered = format!("{} {}", quote_identifier(column.name), column.definition);
                if let Some((table, target)) = column.references {
                    rendered.push_str(&format!(
                        " REFERENCES {}({})",
                        TableName::new(namespace, table).as_quoted_identifier(),
                        quote_identifier(target)
                    ));
                }
                rendered
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            TableName::new(namespace, self.name).as_quoted_identifier()
        )
    }
}

/// Looks up a table of the dimensional model by name.
pub fn find_table(name: &str) -> Option<&'static WarehouseTable> {
    DIMENSIONAL_MODEL.iter().find(|table| table.name == name)
}

const LINEAGE_VALID_FROM: ColumnDefinition =
    column("valid_from", "TIMESTAMP NOT NULL DEFAULT now()");
const LINEAGE_VALID_TO: ColumnDefinition =
    column("valid_to", "TIMESTAMP NOT NULL DEFAULT '9999-12-31 00:00:00'");
const LINEAGE_IS_CURRENT: ColumnDefinition = column("is_current", "BOOLEAN NOT NULL DEFAULT true");

/// Lineage column names carried by every fact table and filled by column defaults.
pub const LINEAGE_COLUMNS: [&str; 3] = ["valid_from", "valid_to", "is_current"];

/// Every table of the dimensional model, dimensions before the facts referencing them.
pub static DIMENSIONAL_MODEL: &[WarehouseTable] = &[
    WarehouseTable {
        name: "dim_currency",
        columns: &[
            column("currency_id", "INT PRIMARY KEY"),
            column("currency_code", "VARCHAR(3) NOT NULL"),
            column("currency_name", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_staff",
        columns: &[
            column("staff_id", "INT PRIMARY KEY"),
            column("first_name", "VARCHAR NOT NULL"),
            column("last_name", "VARCHAR NOT NULL"),
            column("department_name", "VARCHAR NOT NULL"),
            column("location", "VARCHAR NOT NULL"),
            column("email_address", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_location",
        columns: &[
            column("location_id", "INT PRIMARY KEY"),
            column("address_line_1", "VARCHAR NOT NULL"),
            column("address_line_2", "VARCHAR"),
            column("district", "VARCHAR"),
            column("city", "VARCHAR NOT NULL"),
            column("postal_code", "VARCHAR NOT NULL"),
            column("country", "VARCHAR NOT NULL"),
            column("phone", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_counterparty",
        columns: &[
            column("counterparty_id", "INT PRIMARY KEY"),
            column("counterparty_legal_name", "VARCHAR NOT NULL"),
            column("counterparty_legal_address_line_1", "VARCHAR NOT NULL"),
            column("counterparty_legal_address_line_2", "VARCHAR"),
            column("counterparty_legal_district", "VARCHAR"),
            column("counterparty_legal_city", "VARCHAR NOT NULL"),
            column("counterparty_legal_postal_code", "VARCHAR NOT NULL"),
            column("counterparty_legal_country", "VARCHAR NOT NULL"),
            column("counterparty_legal_phone_number", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_design",
        columns: &[
            column("design_id", "INT PRIMARY KEY"),
            column("design_name", "VARCHAR NOT NULL"),
            column("file_location", "VARCHAR NOT NULL"),
            column("file_name", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_date",
        columns: &[
            column("date_id", "DATE PRIMARY KEY"),
            column("year", "INT NOT NULL"),
            column("month", "INT NOT NULL"),
            column("day", "INT NOT NULL"),
            column("day_of_week", "INT NOT NULL"),
            column("day_name", "VARCHAR NOT NULL"),
            column("month_name", "VARCHAR NOT NULL"),
            column("quarter", "INT NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_payment_type",
        columns: &[
            column("payment_type_id", "INT PRIMARY KEY"),
            column("payment_type_name", "VARCHAR NOT NULL"),
        ],
    },
    WarehouseTable {
        name: "dim_transaction",
        columns: &[
            column("transaction_id", "INT PRIMARY KEY"),
            column("transaction_type", "VARCHAR NOT NULL"),
            column("sales_order_id", "INT"),
            column("purchase_order_id", "INT"),
        ],
    },
    WarehouseTable {
        name: "fact_sales_order",
        columns: &[
            column("sales_record_id", "SERIAL PRIMARY KEY"),
            column("sales_order_id", "INT NOT NULL"),
            foreign("created_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("created_time", "TIME NOT NULL"),
            foreign("last_updated_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("last_updated_time", "TIME NOT NULL"),
            foreign("sales_staff_id", "INT NOT NULL", "dim_staff", "staff_id"),
            foreign(
                "counterparty_id",
                "INT NOT NULL",
                "dim_counterparty",
                "counterparty_id",
            ),
            column("units_sold", "INT NOT NULL"),
            column("unit_price", "NUMERIC(10, 2) NOT NULL"),
            foreign("currency_id", "INT NOT NULL", "dim_currency", "currency_id"),
            foreign("design_id", "INT NOT NULL", "dim_design", "design_id"),
            foreign("agreed_payment_date", "DATE NOT NULL", "dim_date", "date_id"),
            foreign("agreed_delivery_date", "DATE NOT NULL", "dim_date", "date_id"),
            foreign(
                "agreed_delivery_location_id",
                "INT NOT NULL",
                "dim_location",
                "location_id",
            ),
            LINEAGE_VALID_FROM,
            LINEAGE_VALID_TO,
            LINEAGE_IS_CURRENT,
        ],
    },
    WarehouseTable {
        name: "fact_purchase_order",
        columns: &[
            column("purchase_record_id", "SERIAL PRIMARY KEY"),
            column("purchase_order_id", "INT NOT NULL"),
            foreign("created_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("created_time", "TIME NOT NULL"),
            foreign("last_updated_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("last_updated_time", "TIME NOT NULL"),
            foreign("staff_id", "INT NOT NULL", "dim_staff", "staff_id"),
            foreign(
                "counterparty_id",
                "INT NOT NULL",
                "dim_counterparty",
                "counterparty_id",
            ),
            column("item_code", "VARCHAR NOT NULL"),
            column("item_quantity", "INT NOT NULL"),
            column("item_unit_price", "NUMERIC NOT NULL"),
            foreign("currency_id", "INT NOT NULL", "dim_currency", "currency_id"),
            foreign("agreed_delivery_date", "DATE NOT NULL", "dim_date", "date_id"),
            foreign("agreed_payment_date", "DATE NOT NULL", "dim_date", "date_id"),
            foreign(
                "agreed_delivery_location_id",
                "INT NOT NULL",
                "dim_location",
                "location_id",
            ),
            LINEAGE_VALID_FROM,
            LINEAGE_VALID_TO,
            LINEAGE_IS_CURRENT,
        ],
    },
    WarehouseTable {
        name: "fact_payment",
        columns: &[
            column("payment_record_id", "SERIAL PRIMARY KEY"),
            column("payment_id", "INT NOT NULL"),
            foreign("created_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("created_time", "TIME NOT NULL"),
            foreign("last_updated_date", "DATE NOT NULL", "dim_date", "date_id"),
            column("last_updated_time", "TIME NOT NULL"),
            foreign(
                "transaction_id",
                "INT NOT NULL",
                "dim_transaction",
                "transaction_id",
            ),
            foreign(
                "counterparty_id",
                "INT NOT NULL",
                "dim_counterparty",
                "counterparty_id",
            ),
            column("payment_amount", "NUMERIC NOT NULL"),
            foreign("currency_id", "INT NOT NULL", "dim_currency", "currency_id"),
            foreign(
                "payment_type_id",
                "INT NOT NULL",
                "dim_payment_type",
                "payment_type_id",
            ),
            column("paid", "BOOLEAN NOT NULL"),
            foreign("payment_date", "DATE NOT NULL", "dim_date", "date_id"),
            LINEAGE_VALID_FROM,
            LINEAGE_VALID_TO,
            LINEAGE_IS_CURRENT,
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_tables_are_defined_earlier() {
        for (index, table) in DIMENSIONAL_MODEL.iter().enumerate() {
            for dependency in table.dependencies() {
                let position = DIMENSIONAL_MODEL
                    .iter()
                    .position(|t| t.name == dependency)
                    .unwrap();
                assert!(
                    position < index,
                    "{} references {dependency} which is defined later",
                    table.name
                );
            }
        }
    }

    #[test]
    fn fact_tables_carry_lineage_columns() {
        for table in DIMENSIONAL_MODEL
            .iter()
            .filter(|t| t.name.starts_with("fact_"))
        {
            for lineage in LINEAGE_COLUMNS {
                assert!(
                    table.columns.iter().any(|c| c.name == lineage),
                    "{} is missing {lineage}",
                    table.name
                );
            }
        }
    }

    #[test]
    fn create_statement_is_qualified_and_idempotent() {
        let statement = find_table("dim_currency")
            .unwrap()
            .create_statement("public");

        assert_eq!(
            statement,
            "CREATE TABLE IF NOT EXISTS public.dim_currency (currency_id INT PRIMARY KEY, currency_code VARCHAR(3) NOT NULL, currency_name VARCHAR NOT NULL)"
        );
    }

    #[test]
    fn fact_statement_references_dimensions_in_namespace() {
        let statement = find_table("fact_payment").unwrap().create_statement("dw");

        assert!(statement.starts_with("CREATE TABLE IF NOT EXISTS dw.fact_payment ("));
        assert!(statement.contains("REFERENCES dw.dim_payment_type(payment_type_id)"));
        assert!(statement.contains("REFERENCES dw.dim_transaction(transaction_id)"));
        assert_eq!(
            find_table("fact_payment").unwrap().dependencies(),
            vec![
                "dim_date",
                "dim_transaction",
                "dim_counterparty",
                "dim_currency",
                "dim_payment_type"
            ]
        );
    }

    #[test]
    fn unknown_table_is_not_found() {
        assert!(find_table("dim_weather").is_none());
    }
}
