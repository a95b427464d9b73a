//! Builds parameterized DDL, INSERT, SELECT, UPDATE and DELETE from a model definition.

use crate::case::column_name;
use crate::config::DatabaseOptions;
use crate::models::{FieldDef, FieldKind, FieldValue, ModelDef, Scope};

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<FieldValue>,
    /// Fields returned by the statement, in select order.
    pub returning: Vec<&'static FieldDef>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            returning: Vec::new(),
        }
    }

    fn push_param(&mut self, v: FieldValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// SQL for one model under the configured identifier policy.
pub struct SqlBuilder<'a> {
    model: &'static ModelDef,
    options: &'a DatabaseOptions,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(model: &'static ModelDef, options: &'a DatabaseOptions) -> Self {
        SqlBuilder { model, options }
    }

    fn ident(&self, s: &str) -> String {
        if self.options.quote_identifiers {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }

    fn table(&self) -> String {
        self.ident(self.model.table)
    }

    fn column(&self, attribute: &str) -> String {
        self.ident(&column_name(attribute, self.options.define.underscored))
    }

    fn column_list(&self, fields: &[&'static FieldDef]) -> String {
        fields
            .iter()
            .map(|f| self.column(f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn all_fields(&self) -> Vec<&'static FieldDef> {
        self.model.visible_fields(Scope::Unscoped, &self.options.define)
    }

    pub fn create_table(&self) -> String {
        let columns: Vec<String> = self
            .model
            .fields
            .iter()
            .map(|f| {
                let mut def = format!("{} {}", self.column(f.name), column_type(f.kind));
                if f.primary_key {
                    def.push_str(" PRIMARY KEY");
                } else {
                    if !f.nullable {
                        def.push_str(" NOT NULL");
                    }
                    if f.unique {
                        def.push_str(" UNIQUE");
                    }
                }
                if let Some(r) = f.references {
                    def.push_str(&format!(
                        " REFERENCES {} ({}) ON DELETE CASCADE",
                        self.ident(r.table),
                        self.column(r.field)
                    ));
                }
                def
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table(),
            columns.join(", ")
        )
    }

    pub fn drop_table(&self, cascade: bool) -> String {
        let mut sql = format!("DROP TABLE IF EXISTS {}", self.table());
        if cascade {
            sql.push_str(" CASCADE");
        }
        sql
    }

    /// INSERT every attribute of a prepared record, returning all columns.
    pub fn insert(&self, values: Vec<(&'static FieldDef, FieldValue)>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut cols = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (field, value) in values {
            cols.push(self.column(field.name));
            let n = q.push_param(value);
            placeholders.push(format!("${}", n));
        }
        q.returning = self.all_fields();
        q.sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            self.table(),
            cols.join(", "),
            placeholders.join(", "),
            self.column_list(&q.returning)
        );
        q
    }

    /// SELECT with exact-match filters, ordered by primary key.
    pub fn select_list(&self, filters: Vec<(&'static FieldDef, FieldValue)>, scope: Scope) -> QueryBuf {
        let mut q = QueryBuf::new();
        q.returning = self.model.visible_fields(scope, &self.options.define);
        let mut sql = format!("SELECT {} FROM {}", self.column_list(&q.returning), self.table());
        let mut conditions = Vec::with_capacity(filters.len());
        for (field, value) in filters {
            let n = q.push_param(value);
            conditions.push(format!("{} = ${}", self.column(field.name), n));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {}", self.column(self.model.primary_key)));
        q.sql = sql;
        q
    }

    /// SELECT by primary key.
    pub fn select_by_pk(&self, id: FieldValue, scope: Scope) -> QueryBuf {
        let mut q = QueryBuf::new();
        q.returning = self.model.visible_fields(scope, &self.options.define);
        let n = q.push_param(id);
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = ${}",
            self.column_list(&q.returning),
            self.table(),
            self.column(self.model.primary_key),
            n
        );
        q
    }

    /// UPDATE by primary key, returning all columns. `values` must not be empty.
    pub fn update(&self, id: FieldValue, values: Vec<(&'static FieldDef, FieldValue)>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut sets = Vec::with_capacity(values.len());
        for (field, value) in values {
            let n = q.push_param(value);
            sets.push(format!("{} = ${}", self.column(field.name), n));
        }
        let n = q.push_param(id);
        q.returning = self.all_fields();
        q.sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            self.table(),
            sets.join(", "),
            self.column(self.model.primary_key),
            n,
            self.column_list(&q.returning)
        );
        q
    }

    /// DELETE by primary key, returning the removed row.
    pub fn delete(&self, id: FieldValue) -> QueryBuf {
        let mut q = QueryBuf::new();
        let n = q.push_param(id);
        q.returning = self.all_fields();
        q.sql = format!(
            "DELETE FROM {} WHERE {} = ${} RETURNING {}",
            self.table(),
            self.column(self.model.primary_key),
            n,
            self.column_list(&q.returning)
        );
        q
    }
}

fn column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Uuid => "UUID",
        FieldKind::Text => "VARCHAR(255)",
        FieldKind::Bool => "BOOLEAN",
        FieldKind::Timestamp => "TIMESTAMPTZ",
    }
}
