//! Column types and default expressions.

use std::fmt;

use crate::Lit;

/// Postgres column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// SMALLINT (2 bytes)
    SmallInt,
    /// INTEGER (4 bytes)
    Integer,
    /// BIGINT (8 bytes)
    BigInt,
    /// REAL (4 bytes floating point)
    Real,
    /// DOUBLE PRECISION (8 bytes floating point)
    DoublePrecision,
    /// NUMERIC, optionally with (precision, scale)
    Numeric(Option<(u16, u16)>),
    /// BOOLEAN
    Boolean,
    /// TEXT
    Text,
    /// VARCHAR, optionally with a length limit
    Varchar(Option<u32>),
    /// DATE
    Date,
    /// TIME
    Time,
    /// TIMESTAMPTZ
    Timestamptz,
    /// UUID
    Uuid,
    /// JSONB
    Jsonb,
    /// TEXT[]
    TextArray,
    /// A type this crate has no variant for, as reported by the database.
    Other(String),
}

impl SqlType {
    /// Parse a type name as reported by `information_schema.columns.data_type`
    /// (or as written in DDL).
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "smallint" | "int2" => SqlType::SmallInt,
            "integer" | "int" | "int4" | "serial" => SqlType::Integer,
            "bigint" | "int8" | "bigserial" => SqlType::BigInt,
            "real" | "float4" => SqlType::Real,
            "double precision" | "float8" => SqlType::DoublePrecision,
            "numeric" | "decimal" => SqlType::Numeric(None),
            "boolean" | "bool" => SqlType::Boolean,
            "text" => SqlType::Text,
            "character varying" | "varchar" => SqlType::Varchar(None),
            "date" => SqlType::Date,
            "time" | "time without time zone" => SqlType::Time,
            "timestamptz" | "timestamp with time zone" => SqlType::Timestamptz,
            "uuid" => SqlType::Uuid,
            "jsonb" => SqlType::Jsonb,
            "text[]" | "_text" => SqlType::TextArray,
            _ => SqlType::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::SmallInt => write!(f, "smallint"),
            SqlType::Integer => write!(f, "integer"),
            SqlType::BigInt => write!(f, "bigint"),
            SqlType::Real => write!(f, "real"),
            SqlType::DoublePrecision => write!(f, "double precision"),
            SqlType::Numeric(None) => write!(f, "numeric"),
            SqlType::Numeric(Some((precision, scale))) => {
                write!(f, "numeric({}, {})", precision, scale)
            }
            SqlType::Boolean => write!(f, "boolean"),
            SqlType::Text => write!(f, "text"),
            SqlType::Varchar(None) => write!(f, "varchar"),
            SqlType::Varchar(Some(len)) => write!(f, "varchar({})", len),
            SqlType::Date => write!(f, "date"),
            SqlType::Time => write!(f, "time"),
            SqlType::Timestamptz => write!(f, "timestamptz"),
            SqlType::Uuid => write!(f, "uuid"),
            SqlType::Jsonb => write!(f, "jsonb"),
            SqlType::TextArray => write!(f, "text[]"),
            SqlType::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A column default expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// now()
    Now,
    /// CURRENT_DATE
    CurrentDate,
    /// gen_random_uuid()
    GenRandomUuid,
    /// A boolean literal
    Bool(bool),
    /// An integer literal
    Int(i64),
    /// A decimal literal, kept as written (e.g. `0.00`)
    Decimal(String),
    /// A string literal
    String(String),
    /// Raw SQL (escape hatch, also used for defaults read back from the database)
    Raw(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Now => write!(f, "now()"),
            Expr::CurrentDate => write!(f, "CURRENT_DATE"),
            Expr::GenRandomUuid => write!(f, "gen_random_uuid()"),
            Expr::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Decimal(d) => write!(f, "{}", d),
            Expr::String(s) => write!(f, "{}", Lit(s)),
            Expr::Raw(s) => write!(f, "{}", s),
        }
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}
