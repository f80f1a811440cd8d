//! The Tricycle CRM tables.

use crate::{
    ColumnSpec, Expr, MalformedSpec, ReferentialAction, Registry, RlsPolicy, SqlType, TableSpec,
};

/// The CRM registry in the `public` schema.
pub fn crm() -> Result<Registry, MalformedSpec> {
    Registry::new(crm_tables())
}

fn id() -> ColumnSpec {
    ColumnSpec::new(SqlType::Integer)
        .primary_key()
        .auto_increment()
}

fn text() -> ColumnSpec {
    ColumnSpec::new(SqlType::Text)
}

fn money() -> ColumnSpec {
    ColumnSpec::new(SqlType::Numeric(Some((12, 2))))
        .not_null()
        .default(Expr::Decimal("0".into()))
}

fn status(initial: &str) -> ColumnSpec {
    text().not_null().default(Expr::String(initial.into()))
}

fn timestamp() -> ColumnSpec {
    ColumnSpec::new(SqlType::Timestamptz)
        .not_null()
        .default(Expr::Now)
}

fn fk(table: &str) -> ColumnSpec {
    ColumnSpec::new(SqlType::Integer).references(table, "id")
}

fn with_policy(table: TableSpec) -> TableSpec {
    let policy = RlsPolicy::authenticated_full_access(&table.name);
    table.row_level_security(policy)
}

/// Every CRM table, referenced tables first.
pub fn crm_tables() -> Vec<TableSpec> {
    vec![
        with_policy(
            TableSpec::new("clientes")
                .column("id", id())
                .column("nombre", text().not_null())
                .column("cif", text())
                .column("email", text())
                .column("telefono", text())
                .column("direccion", text())
                .column("ciudad", text())
                .column("pais", text().default(Expr::String("España".into())))
                .column("notas", text())
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("nombre")
                .index("email"),
        ),
        with_policy(
            TableSpec::new("proveedores")
                .column("id", id())
                .column("nombre", text().not_null())
                .column("cif", text())
                .column("email", text())
                .column("telefono", text())
                .column("direccion", text())
                .column("ciudad", text())
                .column("pais", text())
                .column("materiales", ColumnSpec::new(SqlType::TextArray))
                .column("notas", text())
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("nombre"),
        ),
        with_policy(
            TableSpec::new("facturas")
                .column("id", id())
                .column("numero", text().not_null())
                .column(
                    "cliente_id",
                    fk("clientes")
                        .not_null()
                        .on_delete(ReferentialAction::Restrict),
                )
                .column(
                    "fecha",
                    ColumnSpec::new(SqlType::Date)
                        .not_null()
                        .default(Expr::CurrentDate),
                )
                .column("fecha_vencimiento", ColumnSpec::new(SqlType::Date))
                .column("estado", status("pendiente"))
                .column("moneda", text().not_null().default(Expr::String("EUR".into())))
                .column("subtotal", money())
                .column("iva", money())
                .column("total", money())
                .column("notas", text())
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("cliente_id")
                .index("numero")
                .index("estado"),
        ),
        with_policy(
            TableSpec::new("factura_items")
                .column("id", id())
                .column(
                    "factura_id",
                    fk("facturas")
                        .not_null()
                        .on_delete(ReferentialAction::Cascade),
                )
                .column("descripcion", text().not_null())
                .column(
                    "cantidad",
                    ColumnSpec::new(SqlType::Numeric(Some((12, 3))))
                        .not_null()
                        .default(Expr::Decimal("0".into())),
                )
                .column("unidad", text().not_null().default(Expr::String("kg".into())))
                .column("precio_unitario", money())
                .column("total", money())
                .index("factura_id"),
        ),
        with_policy(
            TableSpec::new("proformas")
                .column("id", id())
                .column("numero", text().not_null())
                .column(
                    "cliente_id",
                    fk("clientes")
                        .not_null()
                        .on_delete(ReferentialAction::Restrict),
                )
                .column(
                    "fecha",
                    ColumnSpec::new(SqlType::Date)
                        .not_null()
                        .default(Expr::CurrentDate),
                )
                .column("validez_dias", ColumnSpec::new(SqlType::Integer).default(Expr::Int(30)))
                .column("estado", status("borrador"))
                .column("moneda", text().not_null().default(Expr::String("EUR".into())))
                .column("subtotal", money())
                .column("iva", money())
                .column("total", money())
                .column(
                    "factura_id",
                    fk("facturas").on_delete(ReferentialAction::SetNull),
                )
                .column("notas", text())
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("cliente_id")
                .index("estado"),
        ),
        with_policy(
            TableSpec::new("proforma_items")
                .column("id", id())
                .column(
                    "proforma_id",
                    fk("proformas")
                        .not_null()
                        .on_delete(ReferentialAction::Cascade),
                )
                .column("descripcion", text().not_null())
                .column(
                    "cantidad",
                    ColumnSpec::new(SqlType::Numeric(Some((12, 3))))
                        .not_null()
                        .default(Expr::Decimal("0".into())),
                )
                .column("unidad", text().not_null().default(Expr::String("kg".into())))
                .column("precio_unitario", money())
                .column("total", money())
                .index("proforma_id"),
        ),
        with_policy(
            TableSpec::new("entregas")
                .column("id", id())
                .column(
                    "proveedor_id",
                    fk("proveedores").on_delete(ReferentialAction::SetNull),
                )
                .column(
                    "cliente_id",
                    fk("clientes").on_delete(ReferentialAction::SetNull),
                )
                .column(
                    "factura_id",
                    fk("facturas").on_delete(ReferentialAction::SetNull),
                )
                .column("fecha_entrega", ColumnSpec::new(SqlType::Date).not_null())
                .column("material", text().not_null())
                .column("peso_kg", ColumnSpec::new(SqlType::Numeric(Some((12, 3)))))
                .column("matricula", text())
                .column("estado", status("programada"))
                .column("notas", text())
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("proveedor_id")
                .index("cliente_id")
                .index("fecha_entrega"),
        ),
        with_policy(
            TableSpec::new("archivos")
                .column("id", id())
                .column("nombre", text().not_null())
                .column("ruta", text().not_null())
                .column("tipo_mime", text())
                .column("tamano_bytes", ColumnSpec::new(SqlType::BigInt))
                .column(
                    "cliente_id",
                    fk("clientes").on_delete(ReferentialAction::Cascade),
                )
                .column(
                    "proveedor_id",
                    fk("proveedores").on_delete(ReferentialAction::Cascade),
                )
                .column(
                    "factura_id",
                    fk("facturas").on_delete(ReferentialAction::SetNull),
                )
                .column("subido_por", ColumnSpec::new(SqlType::Uuid))
                .column("created_at", timestamp())
                .index("cliente_id")
                .index("proveedor_id"),
        ),
        with_policy(
            TableSpec::new("tareas")
                .column("id", id())
                .column("titulo", text().not_null())
                .column("descripcion", text())
                .column("columna", status("pendiente"))
                .column(
                    "posicion",
                    ColumnSpec::new(SqlType::Integer)
                        .not_null()
                        .default(Expr::Int(0)),
                )
                .column("prioridad", status("media"))
                .column("fecha_limite", ColumnSpec::new(SqlType::Date))
                .column("asignado_a", ColumnSpec::new(SqlType::Uuid))
                .column(
                    "cliente_id",
                    fk("clientes").on_delete(ReferentialAction::SetNull),
                )
                .column("etiquetas", ColumnSpec::new(SqlType::TextArray))
                .column("created_at", timestamp())
                .column("updated_at", timestamp())
                .index("columna"),
        ),
    ]
}
