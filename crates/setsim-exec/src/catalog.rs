//! Named tables that `LazyPlan::scan` resolves against.

use std::collections::BTreeMap;
use std::sync::Arc;

use setsim_core::prelude::{Schema, Table};
use setsim_planner::SchemaProvider;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, Arc<Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` under `name`, returning any table it replaces.
    pub fn register(&mut self, name: impl Into<String>, table: Table) -> Option<Arc<Table>> {
        self.tables.insert(name.into(), Arc::new(table))
    }

    pub fn deregister(&mut self, name: &str) -> Option<Arc<Table>> {
        self.tables.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaProvider for Catalog {
    fn table_schema(&self, name: &str) -> Option<Schema> {
        self.tables.get(name).map(|t| t.schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsim_core::prelude::Column;

    #[test]
    fn register_replaces_and_reports_previous() {
        let mut cat = Catalog::new();
        let t1 = Table::new(vec![Column::int64("x", vec![1])]).unwrap();
        let t2 = Table::new(vec![Column::int64("y", vec![2])]).unwrap();
        assert!(cat.register("t", t1.clone()).is_none());
        let prev = cat.register("t", t2).expect("replaced");
        assert_eq!(*prev, t1);
        assert_eq!(cat.table_schema("t").unwrap().fields[0].name, "y");
        assert!(cat.table_schema("missing").is_none());
    }
}
