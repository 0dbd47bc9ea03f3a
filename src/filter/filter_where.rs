use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Translates a Mongo-style filter document into a parameterized SQL
/// predicate. Store identifiers live in uuid columns (`id`, `*_id`) while
/// filter values arrive as JSON strings, so comparisons against those
/// columns cast the bound parameter.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(0);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() {
            return Ok(());
        }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.param_values.clear();
        self.conditions.clear();
        self.param_index = 0;

        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            if let Some(sql) = self.build_sql_condition(condition)? {
                sql_conditions.push(sql);
            }
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires array", op))
                })?;
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = Self::generate_subclause(v, self.param_index)?;
                    self.param_index += params.len();
                    self.param_values.extend(params);
                    sql_parts.push(format!("({})", sql));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                let combined = sql_parts.join(joiner);
                self.conditions.push(FilterWhereInfo {
                    column: combined,
                    operator: FilterOp::Sql,
                    data: Value::Null,
                });
                Ok(())
            }
            "$not" => {
                let (sql, params) = Self::generate_subclause(value, self.param_index)?;
                self.param_index += params.len();
                self.param_values.extend(params);
                self.conditions.push(FilterWhereInfo {
                    column: format!("NOT ({})", sql),
                    operator: FilterOp::Sql,
                    data: Value::Null,
                });
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    // Subclauses are rendered with their own placeholder numbering starting
    // after the parameters already collected by the parent.
    fn generate_subclause(
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut sub = Self::new(starting_param_index);
        sub.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = sub.conditions.clone();
        for condition in &conditions_snapshot {
            if let Some(sql) = sub.build_sql_condition(condition)? {
                sql_conditions.push(sql);
            }
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, sub.param_values.clone()))
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        Self::validate_column_name(field)?;
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo {
                    column: field.to_string(),
                    operator,
                    data: op_val.clone(),
                });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            });
        }
        Ok(())
    }

    fn validate_column_name(column: &str) -> Result<(), FilterError> {
        let mut chars = column.chars();
        let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        let valid_tail = column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_head || !valid_tail {
            return Err(FilterError::InvalidColumn(format!(
                "Invalid column name format: {}",
                column
            )));
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$between" => FilterOp::Between,
            "$any" => FilterOp::Any,
            "$all" => FilterOp::All,
            "$size" => FilterOp::Size,
            "$find" => FilterOp::Find,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<Option<String>, FilterError> {
        // Pre-rendered fragments produced by the logical operators
        if matches!(condition.operator, FilterOp::Sql) {
            return Ok(Some(condition.column.clone()));
        }

        let quoted_column = format!("\"{}\"", condition.column);
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    Ok(Some(format!("{} IS NULL", quoted_column)))
                } else {
                    let param = self.typed_param(condition.data.clone(), &condition.column);
                    Ok(Some(format!("{} = {}", quoted_column, param)))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    Ok(Some(format!("{} IS NOT NULL", quoted_column)))
                } else {
                    let param = self.typed_param(condition.data.clone(), &condition.column);
                    Ok(Some(format!("{} <> {}", quoted_column, param)))
                }
            }
            FilterOp::Gt => {
                let param = self.typed_param(condition.data.clone(), &condition.column);
                Ok(Some(format!("{} > {}", quoted_column, param)))
            }
            FilterOp::Gte => {
                let param = self.typed_param(condition.data.clone(), &condition.column);
                Ok(Some(format!("{} >= {}", quoted_column, param)))
            }
            FilterOp::Lt => {
                let param = self.typed_param(condition.data.clone(), &condition.column);
                Ok(Some(format!("{} < {}", quoted_column, param)))
            }
            FilterOp::Lte => {
                let param = self.typed_param(condition.data.clone(), &condition.column);
                Ok(Some(format!("{} <= {}", quoted_column, param)))
            }
            FilterOp::Like => {
                let param = self.param(condition.data.clone());
                Ok(Some(format!("{} LIKE {}", quoted_column, param)))
            }
            FilterOp::ILike => {
                let param = self.param(condition.data.clone());
                Ok(Some(format!("{} ILIKE {}", quoted_column, param)))
            }
            FilterOp::In => {
                if let Value::Array(values) = &condition.data {
                    if values.is_empty() {
                        return Ok(Some("1=0".to_string()));
                    }
                    let params: Vec<String> = values
                        .iter()
                        .map(|v| self.typed_param(v.clone(), &condition.column))
                        .collect();
                    Ok(Some(format!("{} IN ({})", quoted_column, params.join(", "))))
                } else {
                    let param = self.typed_param(condition.data.clone(), &condition.column);
                    Ok(Some(format!("{} = {}", quoted_column, param)))
                }
            }
            FilterOp::Between => {
                if let Value::Array(values) = &condition.data {
                    if values.len() != 2 {
                        return Err(FilterError::InvalidOperatorData(
                            "$between requires exactly 2 values".to_string(),
                        ));
                    }
                    let low = self.typed_param(values[0].clone(), &condition.column);
                    let high = self.typed_param(values[1].clone(), &condition.column);
                    Ok(Some(format!("{} BETWEEN {} AND {}", quoted_column, low, high)))
                } else {
                    Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            }
            FilterOp::Any => {
                if let Value::Array(values) = &condition.data {
                    if values.is_empty() {
                        return Ok(Some("1=0".to_string()));
                    }
                    let params: Vec<String> =
                        values.iter().map(|v| self.param(v.clone())).collect();
                    Ok(Some(format!("{} && ARRAY[{}]", quoted_column, params.join(", "))))
                } else {
                    let param = self.param(condition.data.clone());
                    Ok(Some(format!("{} && ARRAY[{}]", quoted_column, param)))
                }
            }
            FilterOp::All => {
                if let Value::Array(values) = &condition.data {
                    let params: Vec<String> =
                        values.iter().map(|v| self.param(v.clone())).collect();
                    Ok(Some(format!("{} @> ARRAY[{}]", quoted_column, params.join(", "))))
                } else {
                    let param = self.param(condition.data.clone());
                    Ok(Some(format!("{} @> ARRAY[{}]", quoted_column, param)))
                }
            }
            FilterOp::Size => {
                let param = self.param(condition.data.clone());
                Ok(Some(format!(
                    "coalesce(array_length({}, 1), 0) = {}",
                    quoted_column, param
                )))
            }
            FilterOp::Find => {
                let pattern = match &condition.data {
                    Value::String(s) => Value::String(format!("%{}%", s)),
                    other => {
                        return Err(FilterError::InvalidOperatorData(format!(
                            "$find requires a string, got {}",
                            other
                        )))
                    }
                };
                let param = self.param(pattern);
                Ok(Some(format!(
                    "EXISTS (SELECT 1 FROM unnest({}) AS elem WHERE elem ILIKE {})",
                    quoted_column, param
                )))
            }
            FilterOp::And | FilterOp::Or | FilterOp::Not | FilterOp::Sql => Ok(None),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    /// Placeholder with a cast when the column holds store identifiers.
    fn typed_param(&mut self, value: Value, column: &str) -> String {
        let placeholder = self.param(value);
        if column == "id" || column.ends_with("_id") {
            format!("{}::uuid", placeholder)
        } else {
            placeholder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_binds_a_parameter() {
        let (sql, params) = FilterWhere::generate(&json!({ "is_published": true })).unwrap();
        assert_eq!(sql, "\"is_published\" = $1");
        assert_eq!(params, vec![json!(true)]);
    }

    #[test]
    fn id_columns_compare_through_uuid_cast() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "category_id": "0a0b0c0d-0000-4000-8000-000000000001" }),
        )
        .unwrap();
        assert_eq!(sql, "\"category_id\" = $1::uuid");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn or_composes_subclauses_with_sequential_params() {
        let (sql, params) = FilterWhere::generate(&json!({
            "$or": [
                { "id": "0a0b0c0d-0000-4000-8000-000000000001" },
                { "slug": "hello-world" }
            ]
        }))
        .unwrap();
        assert_eq!(sql, "(\"id\" = $1::uuid) OR (\"slug\" = $2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn search_document_mixes_ilike_and_find() {
        let (sql, params) = FilterWhere::generate(&json!({
            "is_published": true,
            "$or": [
                { "title": { "$ilike": "%react%" } },
                { "content": { "$ilike": "%react%" } },
                { "tags": { "$find": "react" } }
            ]
        }))
        .unwrap();
        assert!(sql.contains("\"title\" ILIKE $1"));
        assert!(sql.contains("\"content\" ILIKE $2"));
        assert!(sql.contains("unnest(\"tags\") AS elem WHERE elem ILIKE $3"));
        assert!(sql.contains("\"is_published\" = $4"));
        assert_eq!(params.len(), 4);
        assert_eq!(params[2], json!("%react%"));
    }

    #[test]
    fn in_with_empty_array_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } })).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = FilterWhere::generate(&json!({ "title": { "$regexp": "x" } })).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
    }

    #[test]
    fn hostile_column_names_are_rejected() {
        let err = FilterWhere::generate(&json!({ "title\" OR 1=1 --": "x" })).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }
}
