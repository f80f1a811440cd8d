//! Postgres DDL as a typed AST.
//!
//! Build statements as values, then render them to text with [`render`].
//! Every identifier goes through [`Ident`] and every string literal through
//! [`Lit`], so nothing declared in a schema can break out of its position
//! in the generated SQL.

mod expr;
pub use expr::*;

mod render;
pub use render::*;

mod stmt;
pub use stmt::*;

/// Postgres truncates identifiers longer than this many bytes.
pub const PG_IDENT_MAX: usize = 63;

/// A PostgreSQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use tricycle_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A PostgreSQL identifier wrapper.
///
/// Plain lowercase identifiers (`clientes`, `fecha_entrega`) render bare.
/// Anything else (reserved words, uppercase, spaces, quotes) is wrapped in
/// double quotes with embedded quotes doubled.
///
/// # Example
/// ```
/// use tricycle_sql::Ident;
/// assert_eq!(format!("{}", Ident("clientes")), "clientes");
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.0.as_ref();
        if is_bare_ident(name) {
            return write!(f, "{}", name);
        }

        write!(f, "\"")?;
        for c in name.chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Escape a string literal for SQL.
pub fn escape_string(s: &str) -> String {
    format!("{}", Lit(s))
}

/// Quote a PostgreSQL identifier if it needs quoting.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}

/// Whether `name` can be written without double quotes.
///
/// True for `[a-z_][a-z0-9_]*` that is not a reserved keyword.
pub fn is_bare_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return false;
    }
    RESERVED_KEYWORDS.binary_search(&name).is_err()
}

/// Reserved keywords of PostgreSQL (sorted for binary search).
const RESERVED_KEYWORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "constraint",
    "create",
    "current_catalog",
    "current_date",
    "current_role",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "from",
    "grant",
    "group",
    "having",
    "in",
    "initially",
    "intersect",
    "into",
    "lateral",
    "leading",
    "limit",
    "localtime",
    "localtimestamp",
    "not",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "placing",
    "primary",
    "references",
    "returning",
    "select",
    "session_user",
    "some",
    "symmetric",
    "table",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "when",
    "where",
    "window",
    "with",
];

/// Generate a standard index name for a table and columns.
///
/// Uses the convention `idx_{table}_{columns}` where columns are joined by underscore.
///
/// # Examples
///
/// ```
/// assert_eq!(tricycle_sql::index_name("clientes", &["email"]), "idx_clientes_email");
/// assert_eq!(
///     tricycle_sql::index_name("entregas", &["proveedor_id", "fecha_entrega"]),
///     "idx_entregas_proveedor_id_fecha_entrega"
/// );
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    fit_ident("idx", &format!("{}_{}", table, cols.join("_")))
}

/// Name of the per-table function that maintains `updated_at`.
pub fn updated_at_function_name(table: &str) -> String {
    fit_ident("set", &format!("{}_updated_at", table))
}

/// Name of the per-table trigger that maintains `updated_at`.
pub fn updated_at_trigger_name(table: &str) -> String {
    fit_ident("trg", &format!("{}_updated_at", table))
}

/// Join `prefix` and `body` with an underscore, keeping the result within
/// [`PG_IDENT_MAX`] bytes.
///
/// Over-long names keep a readable head and get a stable hash suffix, so
/// two long names sharing a prefix still differ.
fn fit_ident(prefix: &str, body: &str) -> String {
    let full = format!("{}_{}", prefix, body);
    if full.len() <= PG_IDENT_MAX {
        return full;
    }

    let hex = blake3::hash(full.as_bytes()).to_hex().to_string();
    let suffix = &hex[..12];
    let mut len = PG_IDENT_MAX - suffix.len() - 1;
    // Table names are expected to be ASCII snake_case; still, avoid splitting UTF-8.
    while len > 0 && !full.is_char_boundary(len) {
        len -= 1;
    }
    format!("{}_{}", &full[..len], suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keywords_are_sorted() {
        let mut sorted = RESERVED_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_KEYWORDS);
    }

    #[test]
    fn test_bare_identifiers() {
        assert!(is_bare_ident("clientes"));
        assert!(is_bare_ident("factura_items"));
        assert!(is_bare_ident("_private"));
        assert!(is_bare_ident("col2"));

        assert!(!is_bare_ident(""));
        assert!(!is_bare_ident("2col"));
        assert!(!is_bare_ident("Clientes"));
        assert!(!is_bare_ident("order"));
        assert!(!is_bare_ident("with space"));
        assert!(!is_bare_ident("x; DROP TABLE clientes"));
    }

    #[test]
    fn test_quote_ident_blocks_injection() {
        assert_eq!(
            quote_ident("x\"; DROP TABLE clientes; --"),
            "\"x\"\"; DROP TABLE clientes; --\""
        );
    }

    #[test]
    fn test_generated_names() {
        assert_eq!(updated_at_function_name("tareas"), "set_tareas_updated_at");
        assert_eq!(updated_at_trigger_name("tareas"), "trg_tareas_updated_at");
    }

    #[test]
    fn test_long_names_fit_the_limit() {
        let table = "a".repeat(80);
        let a = index_name(&table, &["x"]);
        let b = index_name(&table, &["y"]);
        assert_eq!(a.len(), PG_IDENT_MAX);
        assert_eq!(b.len(), PG_IDENT_MAX);
        assert_ne!(a, b);
        assert!(a.starts_with("idx_aaaa"));
        // stable across calls
        assert_eq!(a, index_name(&table, &["x"]));
    }
}
