mod table;

pub use table::{Column, SqlType, Table};

/// Target SQL dialect for rendered statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Production warehouse (Redshift / Postgres wire protocol).
    Redshift,
    /// Local single-file warehouse used for development and tests.
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Redshift => "redshift",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Expression converting an epoch-milliseconds integer column into a
    /// timestamp, keeping the millisecond part.
    pub fn epoch_millis_to_timestamp(&self, column: &str) -> String {
        match self {
            Dialect::Redshift => format!(
                "TIMESTAMP 'epoch' + ({} / 1000.0) * INTERVAL '1 second'",
                column
            ),
            Dialect::Sqlite => format!(
                "strftime('%Y-%m-%d %H:%M:%f', {} / 1000.0, 'unixepoch')",
                column
            ),
        }
    }

    /// Expression extracting a calendar field from a timestamp column.
    pub fn extract(&self, part: DatePart, column: &str) -> String {
        match self {
            Dialect::Redshift => format!("EXTRACT({} FROM {})", part.redshift_name(), column),
            Dialect::Sqlite => format!(
                "CAST(strftime('{}', {}) AS INTEGER)",
                part.strftime_format(),
                column
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Hour,
    Day,
    Week,
    Month,
    Year,
    /// 0 = Sunday
    Weekday,
}

impl DatePart {
    fn redshift_name(&self) -> &'static str {
        match self {
            DatePart::Hour => "HOUR",
            DatePart::Day => "DAY",
            DatePart::Week => "WEEK",
            DatePart::Month => "MONTH",
            DatePart::Year => "YEAR",
            DatePart::Weekday => "DAYOFWEEK",
        }
    }

    fn strftime_format(&self) -> &'static str {
        match self {
            DatePart::Hour => "%H",
            DatePart::Day => "%d",
            // ISO week, same numbering as Redshift's EXTRACT(WEEK)
            DatePart::Week => "%V",
            DatePart::Month => "%m",
            DatePart::Year => "%Y",
            DatePart::Weekday => "%w",
        }
    }
}

/// Renders a string as a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
