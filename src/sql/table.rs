use super::Dialect;

#[macro_export]
macro_rules! warehouse_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                identity: None,
                sort_key: false,
                dist_key: false,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar,
    Int,
    /// 64-bit integer, `INT8` on Redshift.
    BigInt,
    Float,
    Timestamp,
}

impl SqlType {
    pub fn render(&self, dialect: Dialect) -> &'static str {
        match (dialect, self) {
            (Dialect::Redshift, SqlType::Varchar) => "VARCHAR",
            (Dialect::Redshift, SqlType::Int) => "INT",
            (Dialect::Redshift, SqlType::BigInt) => "INT8",
            (Dialect::Redshift, SqlType::Float) => "FLOAT",
            (Dialect::Redshift, SqlType::Timestamp) => "TIMESTAMP WITHOUT TIME ZONE",
            (Dialect::Sqlite, SqlType::Varchar) => "TEXT",
            (Dialect::Sqlite, SqlType::Int) => "INTEGER",
            (Dialect::Sqlite, SqlType::BigInt) => "INTEGER",
            (Dialect::Sqlite, SqlType::Float) => "REAL",
            // ISO-8601 text, see Dialect::epoch_millis_to_timestamp
            (Dialect::Sqlite, SqlType::Timestamp) => "TEXT",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::BigInt | SqlType::Float)
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub is_primary_key: bool,
    /// Surrogate key generated by the warehouse: (seed, step).
    pub identity: Option<(i64, i64)>,
    pub sort_key: bool,
    pub dist_key: bool,
}

impl Column {
    fn render(&self, dialect: Dialect) -> String {
        if self.identity.is_some() && dialect == Dialect::Sqlite {
            return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.name);
        }

        let mut sql = format!("{} {}", self.name, self.sql_type.render(dialect));
        if let (Some((seed, step)), Dialect::Redshift) = (self.identity, dialect) {
            sql.push_str(&format!(" IDENTITY({},{})", seed, step));
        }
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if dialect == Dialect::Redshift {
            if self.sort_key {
                sql.push_str(" SORTKEY");
            }
            if self.dist_key {
                sql.push_str(" DISTKEY");
            }
        }
        sql
    }
}

#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| format!("    {}", column.render(dialect)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", self.name, columns)
    }

    pub fn drop_sql(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Redshift => format!("DROP TABLE IF EXISTS {} CASCADE", self.name),
            Dialect::Sqlite => format!("DROP TABLE IF EXISTS {}", self.name),
        }
    }

    pub fn truncate_sql(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Redshift => format!("TRUNCATE {}", self.name),
            Dialect::Sqlite => format!("DELETE FROM {}", self.name),
        }
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}
