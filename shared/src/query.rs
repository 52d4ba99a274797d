//! Typed descriptions of reads against the backing store
//!
//! A [`QueryDescriptor`] names a table (or a stored procedure with JSON
//! arguments), the filters to apply, the ordering keys and whether an exact
//! row count is wanted. It carries no paging information: paging is added by
//! the fetcher through [`PageRange`].

use serde::{Deserialize, Serialize};

/// Where rows come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuerySource {
    /// A table or view
    Table { name: String },
    /// A stored procedure invoked with named JSON arguments
    Procedure {
        name: String,
        args: serde_json::Value,
    },
}

impl QuerySource {
    pub fn name(&self) -> &str {
        match self {
            QuerySource::Table { name } | QuerySource::Procedure { name, .. } => name,
        }
    }
}

/// Comparison applied to a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FilterOp {
    Eq(String),
    Neq(String),
    Gt(String),
    Gte(String),
    Lt(String),
    Lte(String),
    /// Case-sensitive pattern, `*` as wildcard
    Like(String),
    /// Case-insensitive pattern, `*` as wildcard
    ILike(String),
    In(Vec<String>),
    IsNull,
}

/// A filter on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp) -> Self {
        Self {
            column: column.into(),
            op,
        }
    }
}

/// Ordering key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

/// Full description of a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub source: QuerySource,
    /// Column list, `None` selects everything
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub count_exact: bool,
}

impl QueryDescriptor {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            source: QuerySource::Table { name: name.into() },
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            count_exact: false,
        }
    }

    pub fn procedure(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            source: QuerySource::Procedure {
                name: name.into(),
                args,
            },
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            count_exact: false,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter::new(column, op));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq(value.to_string()))
    }

    pub fn gte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gte(value.to_string()))
    }

    pub fn lte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lte(value.to_string()))
    }

    pub fn in_list<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, FilterOp::In(values))
    }

    /// Append an ascending ordering key
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push(OrderBy::asc(column));
        self
    }

    pub fn with_exact_count(mut self) -> Self {
        self.count_exact = true;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

/// One page window requested from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub offset: usize,
    pub limit: usize,
}

impl PageRange {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Last row index covered by the window (inclusive)
    pub fn last_index(&self) -> usize {
        (self.offset + self.limit).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_filters_and_order() {
        let query = QueryDescriptor::table("detalle_salidas")
            .eq("codigo_articulo", "ART-001")
            .gte("fecha", "2025-01-01")
            .lte("fecha", "2025-03-31")
            .order_by("fecha")
            .order_by("id")
            .with_exact_count();

        assert_eq!(query.source_name(), "detalle_salidas");
        assert_eq!(query.filters.len(), 3);
        assert_eq!(query.filters[0].op, FilterOp::Eq("ART-001".to_string()));
        assert_eq!(query.order.len(), 2);
        assert!(query.count_exact);
    }

    #[test]
    fn test_in_list_converts_values() {
        let query = QueryDescriptor::table("personal").in_list("identificacion", [10, 20]);
        assert_eq!(
            query.filters[0].op,
            FilterOp::In(vec!["10".to_string(), "20".to_string()])
        );
    }

    #[test]
    fn test_page_range_last_index() {
        assert_eq!(PageRange::new(0, 1000).last_index(), 999);
        assert_eq!(PageRange::new(2000, 500).last_index(), 2499);
    }
}
