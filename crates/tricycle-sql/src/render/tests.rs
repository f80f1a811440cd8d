use crate::*;

fn public(name: &str) -> QualifiedName {
    QualifiedName::new("public", name)
}

#[test]
fn test_create_table() {
    let stmt = CreateTableStmt::new(public("clientes"))
        .column(
            ColumnDef::new("id", SqlType::Integer)
                .primary_key()
                .identity()
                .not_null(),
        )
        .column(ColumnDef::new("nombre", SqlType::Text).not_null());

    assert_eq!(
        render(&stmt),
        "CREATE TABLE IF NOT EXISTS public.clientes (\n  id integer PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY,\n  nombre text NOT NULL\n);"
    );
}

#[test]
fn test_create_table_with_defaults_and_references() {
    let stmt = CreateTableStmt::new(public("factura_items"))
        .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
        .column(
            ColumnDef::new("factura_id", SqlType::Integer)
                .not_null()
                .references(References {
                    table: public("facturas"),
                    column: "id".into(),
                    on_delete: Some(ReferentialAction::Cascade),
                }),
        )
        .column(
            ColumnDef::new("cantidad", SqlType::Numeric(Some((12, 3))))
                .not_null()
                .default(Expr::Decimal("0".into())),
        )
        .column(
            ColumnDef::new("unidad", SqlType::Text)
                .not_null()
                .default(Expr::String("kg".into())),
        )
        .column(
            ColumnDef::new("created_at", SqlType::Timestamptz)
                .not_null()
                .default(Expr::Now),
        );

    insta::assert_snapshot!(render(&stmt), @r"
CREATE TABLE IF NOT EXISTS public.factura_items (
  id bigint PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY,
  factura_id integer NOT NULL REFERENCES public.facturas(id) ON DELETE CASCADE,
  cantidad numeric(12, 3) NOT NULL DEFAULT 0,
  unidad text NOT NULL DEFAULT 'kg',
  created_at timestamptz NOT NULL DEFAULT now()
);
");
}

#[test]
fn test_reserved_identifiers_are_quoted() {
    let stmt = CreateTableStmt::new(public("order"))
        .column(ColumnDef::new("id", SqlType::Integer).primary_key())
        .column(ColumnDef::new("user", SqlType::Text));

    insta::assert_snapshot!(render(&stmt), @r#"
CREATE TABLE IF NOT EXISTS public."order" (
  id integer PRIMARY KEY,
  "user" text
);
"#);
}

#[test]
fn test_add_column() {
    let stmt = AddColumnStmt::new(public("clientes"), ColumnDef::new("email", SqlType::Text));
    assert_eq!(
        render(&stmt),
        "ALTER TABLE public.clientes ADD COLUMN IF NOT EXISTS email text;"
    );
}

#[test]
fn test_add_column_with_clauses() {
    let stmt = AddColumnStmt::new(
        public("entregas"),
        ColumnDef::new("factura_id", SqlType::Integer).references(References {
            table: public("facturas"),
            column: "id".into(),
            on_delete: Some(ReferentialAction::SetNull),
        }),
    );
    assert_eq!(
        render(&stmt),
        "ALTER TABLE public.entregas ADD COLUMN IF NOT EXISTS factura_id integer REFERENCES public.facturas(id) ON DELETE SET NULL;"
    );
}

#[test]
fn test_create_index() {
    let stmt = CreateIndexStmt::new(
        index_name("facturas", &["cliente_id"]),
        public("facturas"),
        vec!["cliente_id".into()],
    );
    assert_eq!(
        render(&stmt),
        "CREATE INDEX IF NOT EXISTS idx_facturas_cliente_id ON public.facturas (cliente_id);"
    );
}

#[test]
fn test_updated_at_trigger() {
    let script: Script = [
        Stmt::CreateUpdatedAtFunction(UpdatedAtFunctionStmt {
            function: public(&updated_at_function_name("tareas")),
            column: "updated_at".into(),
        }),
        Stmt::DropTrigger(DropTriggerStmt {
            name: updated_at_trigger_name("tareas"),
            table: public("tareas"),
            if_exists: true,
        }),
        Stmt::CreateTrigger(CreateTriggerStmt {
            name: updated_at_trigger_name("tareas"),
            table: public("tareas"),
            function: public(&updated_at_function_name("tareas")),
        }),
    ]
    .into_iter()
    .collect();

    insta::assert_snapshot!(render(&script), @r"
CREATE OR REPLACE FUNCTION public.set_tareas_updated_at()
RETURNS trigger
LANGUAGE plpgsql
AS $$
BEGIN
  NEW.updated_at = now();
  RETURN NEW;
END;
$$;
DROP TRIGGER IF EXISTS trg_tareas_updated_at ON public.tareas;
CREATE TRIGGER trg_tareas_updated_at BEFORE UPDATE ON public.tareas FOR EACH ROW EXECUTE FUNCTION public.set_tareas_updated_at();
");
}

#[test]
fn test_guarded_policy() {
    let script: Script = [
        Stmt::EnableRowLevelSecurity(public("archivos")),
        Stmt::CreatePolicy(CreatePolicyStmt {
            name: "Authenticated users manage archivos".into(),
            table: public("archivos"),
            command: PolicyCommand::All,
            roles: vec!["authenticated".into()],
            using: "true".into(),
            with_check: Some("true".into()),
            if_not_exists: true,
        }),
    ]
    .into_iter()
    .collect();

    insta::assert_snapshot!(render(&script), @r#"
ALTER TABLE public.archivos ENABLE ROW LEVEL SECURITY;
DO $$
BEGIN
  IF NOT EXISTS (
    SELECT 1 FROM pg_policies
    WHERE schemaname = 'public' AND tablename = 'archivos' AND policyname = 'Authenticated users manage archivos'
  ) THEN
    CREATE POLICY "Authenticated users manage archivos" ON public.archivos FOR ALL TO authenticated USING (true) WITH CHECK (true);
  END IF;
END
$$;
"#);
}

#[test]
fn test_unguarded_policy() {
    let stmt = CreatePolicyStmt {
        name: "read_all".into(),
        table: public("tareas"),
        command: PolicyCommand::Select,
        roles: vec![],
        using: "true".into(),
        with_check: None,
        if_not_exists: false,
    };
    assert_eq!(
        render(&stmt),
        "CREATE POLICY read_all ON public.tareas FOR SELECT USING (true);"
    );
}

#[test]
fn test_empty_script_renders_nothing() {
    assert_eq!(render(&Script::new()), "");
}

#[test]
fn test_script_joins_statements_with_newlines() {
    let mut script = Script::new();
    script.push(Stmt::AddColumn(AddColumnStmt::new(
        public("clientes"),
        ColumnDef::new("email", SqlType::Text),
    )));
    script.push(Stmt::AddColumn(AddColumnStmt::new(
        public("clientes"),
        ColumnDef::new("activo", SqlType::Boolean)
            .not_null()
            .default(Expr::Bool(true)),
    )));
    assert_eq!(script.len(), 2);
    assert_eq!(
        render(&script),
        "ALTER TABLE public.clientes ADD COLUMN IF NOT EXISTS email text;\n\
         ALTER TABLE public.clientes ADD COLUMN IF NOT EXISTS activo boolean NOT NULL DEFAULT true;"
    );
}
