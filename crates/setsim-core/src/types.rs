//! Columnar value model: primitive and list columns over `Arc`-shared buffers.
//!
//! Cloning a `Column` or `Table` never copies buffers. Operators that derive a
//! new table (append a column, project, hstack) share the untouched columns
//! with their input.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, Field, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view used by comparisons; `None` for null and non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I64(v) => Some(*v as f64),
            Scalar::U64(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Flat buffer of `T` plus an optional validity mask (`false` = null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveColumn<T> {
    values: Arc<[T]>,
    validity: Option<Arc<[bool]>>,
}

impl<T> PrimitiveColumn<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values: values.into(),
            validity: None,
        }
    }

    pub fn with_validity(values: Vec<T>, validity: Vec<bool>) -> Result<Self> {
        if values.len() != validity.len() {
            return Err(Error::Invariant(format!(
                "validity length {} does not match {} values",
                validity.len(),
                values.len()
            )));
        }
        Ok(Self {
            values: values.into(),
            validity: Some(validity.into()),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn validity(&self) -> Option<&[bool]> {
        self.validity.as_deref()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v[idx])
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |v| v.iter().filter(|ok| !**ok).count())
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        if idx < self.len() && self.is_valid(idx) {
            Some(&self.values[idx])
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

impl<T: Clone + Default> PrimitiveColumn<T> {
    /// Build from optional values; `None` slots hold `T::default()`.
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        if values.iter().all(Option::is_some) {
            return Self::new(values.into_iter().flatten().collect());
        }
        let validity: Vec<bool> = values.iter().map(Option::is_some).collect();
        let values: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        Self {
            values: values.into(),
            validity: Some(validity.into()),
        }
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        let values: Vec<T> = indices.iter().map(|&i| self.values[i].clone()).collect();
        let validity = self
            .validity
            .as_ref()
            .map(|v| indices.iter().map(|&i| v[i]).collect::<Vec<_>>().into());
        Self {
            values: values.into(),
            validity,
        }
    }
}

/// Ragged `list[i64]` column: row `i` spans `values[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ListColumnParts", into = "ListColumnParts")]
pub struct ListColumn {
    offsets: Arc<[usize]>,
    values: Arc<[i64]>,
    validity: Option<Arc<[bool]>>,
}

#[derive(Serialize, Deserialize)]
struct ListColumnParts {
    offsets: Arc<[usize]>,
    values: Arc<[i64]>,
    validity: Option<Arc<[bool]>>,
}

impl TryFrom<ListColumnParts> for ListColumn {
    type Error = Error;

    fn try_from(parts: ListColumnParts) -> Result<Self> {
        check_offsets(&parts.offsets, parts.values.len(), parts.validity.as_deref())?;
        Ok(Self {
            offsets: parts.offsets,
            values: parts.values,
            validity: parts.validity,
        })
    }
}

impl From<ListColumn> for ListColumnParts {
    fn from(col: ListColumn) -> Self {
        Self {
            offsets: col.offsets,
            values: col.values,
            validity: col.validity,
        }
    }
}

impl ListColumn {
    pub fn try_new(
        offsets: Vec<usize>,
        values: Vec<i64>,
        validity: Option<Vec<bool>>,
    ) -> Result<Self> {
        check_offsets(&offsets, values.len(), validity.as_deref())?;
        Ok(Self {
            offsets: offsets.into(),
            values: values.into(),
            validity: validity.map(Into::into),
        })
    }

    /// Build from non-null rows.
    pub fn from_rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[i64]>,
    {
        let mut offsets = vec![0usize];
        let mut values = Vec::new();
        for row in rows {
            values.extend_from_slice(row.as_ref());
            offsets.push(values.len());
        }
        Self {
            offsets: offsets.into(),
            values: values.into(),
            validity: None,
        }
    }

    /// Build from optional rows; a `None` row is null and spans zero values.
    pub fn from_options(rows: Vec<Option<Vec<i64>>>) -> Self {
        let has_nulls = rows.iter().any(Option::is_none);
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0usize);
        let mut values = Vec::new();
        let mut validity = Vec::with_capacity(rows.len());
        for row in rows {
            validity.push(row.is_some());
            if let Some(row) = row {
                values.extend(row);
            }
            offsets.push(values.len());
        }
        Self {
            offsets: offsets.into(),
            values: values.into(),
            validity: has_nulls.then(|| validity.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v[idx])
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |v| v.iter().filter(|ok| !**ok).count())
    }

    /// Borrow the buffers without copying. The invariants were checked when
    /// the column was built, so this cannot fail.
    pub fn view(&self) -> ListColumnView<'_> {
        ListColumnView {
            offsets: &self.offsets,
            values: &self.values,
            validity: self.validity.as_deref(),
        }
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        let view = self.view();
        let mut offsets = Vec::with_capacity(indices.len() + 1);
        offsets.push(0usize);
        let mut values = Vec::new();
        for &i in indices {
            values.extend_from_slice(view.row(i));
            offsets.push(values.len());
        }
        let validity = self
            .validity
            .as_ref()
            .map(|v| indices.iter().map(|&i| v[i]).collect::<Vec<_>>().into());
        Self {
            offsets: offsets.into(),
            values: values.into(),
            validity,
        }
    }
}

/// Zero-copy read-only view over a ragged list column.
#[derive(Debug, Clone, Copy)]
pub struct ListColumnView<'a> {
    offsets: &'a [usize],
    values: &'a [i64],
    validity: Option<&'a [bool]>,
}

impl<'a> ListColumnView<'a> {
    /// Wrap externally owned buffers, validating the offsets contract.
    pub fn try_new(
        offsets: &'a [usize],
        values: &'a [i64],
        validity: Option<&'a [bool]>,
    ) -> Result<Self> {
        check_offsets(offsets, values.len(), validity)?;
        Ok(Self {
            offsets,
            values,
            validity,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offsets(&self) -> &'a [usize] {
        self.offsets
    }

    pub fn values(&self) -> &'a [i64] {
        self.values
    }

    pub fn validity(&self) -> Option<&'a [bool]> {
        self.validity
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.map_or(true, |v| v[idx])
    }

    pub fn row(&self, idx: usize) -> &'a [i64] {
        &self.values[self.offsets[idx]..self.offsets[idx + 1]]
    }
}

fn check_offsets(offsets: &[usize], values_len: usize, validity: Option<&[bool]>) -> Result<()> {
    let (first, last) = match (offsets.first(), offsets.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Err(Error::Invariant("list offsets must hold at least one entry".into())),
    };
    if first != 0 {
        return Err(Error::Invariant(format!("list offsets start at {first}, expected 0")));
    }
    if last != values_len {
        return Err(Error::Invariant(format!(
            "list offsets end at {last}, but there are {values_len} values"
        )));
    }
    if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
        return Err(Error::Invariant(format!(
            "list offsets decrease at index {}",
            pos + 1
        )));
    }
    if let Some(v) = validity {
        if v.len() != offsets.len() - 1 {
            return Err(Error::Invariant(format!(
                "validity length {} does not match {} rows",
                v.len(),
                offsets.len() - 1
            )));
        }
    }
    Ok(())
}

/// Float buffers travel as raw IEEE-754 bit patterns so NaN, the infinities
/// and signed zero survive text formats such as JSON.
mod f64_bits {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::PrimitiveColumn;

    #[derive(Serialize, Deserialize)]
    struct Bits {
        values: Vec<u64>,
        validity: Option<Vec<bool>>,
    }

    pub fn serialize<S: Serializer>(
        col: &PrimitiveColumn<f64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        Bits {
            values: col.values().iter().map(|v| v.to_bits()).collect(),
            validity: col.validity().map(<[bool]>::to_vec),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<PrimitiveColumn<f64>, D::Error> {
        let bits = Bits::deserialize(deserializer)?;
        let values = bits.values.into_iter().map(f64::from_bits).collect();
        match bits.validity {
            Some(validity) => {
                PrimitiveColumn::with_validity(values, validity).map_err(D::Error::custom)
            }
            None => Ok(PrimitiveColumn::new(values)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Boolean(PrimitiveColumn<bool>),
    Int64(PrimitiveColumn<i64>),
    UInt64(PrimitiveColumn<u64>),
    #[serde(with = "f64_bits")]
    Float64(PrimitiveColumn<f64>),
    Utf8(PrimitiveColumn<String>),
    List(ListColumn),
}

impl ColumnData {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Boolean(_) => DataType::Boolean,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::UInt64(_) => DataType::UInt64,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Utf8(_) => DataType::Utf8,
            ColumnData::List(_) => DataType::list_i64(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(c) => c.len(),
            ColumnData::Int64(c) => c.len(),
            ColumnData::UInt64(c) => c.len(),
            ColumnData::Float64(c) => c.len(),
            ColumnData::Utf8(c) => c.len(),
            ColumnData::List(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Boolean(c) => c.null_count(),
            ColumnData::Int64(c) => c.null_count(),
            ColumnData::UInt64(c) => c.null_count(),
            ColumnData::Float64(c) => c.null_count(),
            ColumnData::Utf8(c) => c.null_count(),
            ColumnData::List(c) => c.null_count(),
        }
    }

    pub fn as_list(&self) -> Option<&ListColumn> {
        match self {
            ColumnData::List(c) => Some(c),
            _ => None,
        }
    }

    /// Scalar value at `idx`; list cells are not representable and read as `Null`.
    pub fn scalar_at(&self, idx: usize) -> Scalar {
        match self {
            ColumnData::Boolean(c) => c.get(idx).map_or(Scalar::Null, |v| Scalar::Bool(*v)),
            ColumnData::Int64(c) => c.get(idx).map_or(Scalar::Null, |v| Scalar::I64(*v)),
            ColumnData::UInt64(c) => c.get(idx).map_or(Scalar::Null, |v| Scalar::U64(*v)),
            ColumnData::Float64(c) => c.get(idx).map_or(Scalar::Null, |v| Scalar::F64(*v)),
            ColumnData::Utf8(c) => c.get(idx).map_or(Scalar::Null, |v| Scalar::Str(v.clone())),
            ColumnData::List(_) => Scalar::Null,
        }
    }

    /// Gather rows by index (used by filters).
    pub fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Boolean(c) => ColumnData::Boolean(c.take(indices)),
            ColumnData::Int64(c) => ColumnData::Int64(c.take(indices)),
            ColumnData::UInt64(c) => ColumnData::UInt64(c.take(indices)),
            ColumnData::Float64(c) => ColumnData::Float64(c.take(indices)),
            ColumnData::Utf8(c) => ColumnData::Utf8(c.take(indices)),
            ColumnData::List(c) => ColumnData::List(c.take(indices)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn int64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int64(PrimitiveColumn::new(values)))
    }

    pub fn uint64(name: impl Into<String>, values: Vec<u64>) -> Self {
        Self::new(name, ColumnData::UInt64(PrimitiveColumn::new(values)))
    }

    pub fn float64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Float64(PrimitiveColumn::new(values)))
    }

    pub fn utf8(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, ColumnData::Utf8(PrimitiveColumn::new(values)))
    }

    pub fn list<I, R>(name: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[i64]>,
    {
        Self::new(name, ColumnData::List(ListColumn::from_rows(rows)))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.data_type(), self.data.null_count() > 0)
    }
}

/// In-memory table: named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking equal row counts and unique column names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            for col in &columns[1..] {
                if col.len() != first.len() {
                    return Err(Error::ShapeMismatch {
                        left: first.len(),
                        right: col.len(),
                    });
                }
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Schema(format!("duplicate column '{}'", col.name)));
            }
        }
        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(Column::field).collect())
    }

    /// Return a new table with `column` appended, or replacing a column of the
    /// same name in place. Other columns are shared with `self`.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        if !self.columns.is_empty() && column.len() != self.num_rows() {
            return Err(Error::ShapeMismatch {
                left: self.num_rows(),
                right: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(slot) => *slot = column,
            None => columns.push(column),
        }
        Ok(Table { columns })
    }

    /// Keep only `names`, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| Error::Schema(format!("column '{name}' not found")))
            })
            .collect::<Result<Vec<_>>>()?;
        Table::new(columns)
    }

    /// Gather the given rows from every column.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
        }
    }

    /// Concatenate two tables side-by-side.
    ///
    /// Both sides must have the same row count. Right-hand columns whose name
    /// already exists on the left get a `_right` suffix.
    pub fn hstack(left: &Table, right: &Table) -> Result<Table> {
        if !left.columns.is_empty() && !right.columns.is_empty() && left.num_rows() != right.num_rows() {
            return Err(Error::ShapeMismatch {
                left: left.num_rows(),
                right: right.num_rows(),
            });
        }

        let mut columns = Vec::with_capacity(left.columns.len() + right.columns.len());
        columns.extend(left.columns.iter().cloned());
        for col in &right.columns {
            let mut new_col = col.clone();
            if left.columns.iter().any(|c| c.name == col.name) {
                new_col.name = format!("{}_right", col.name);
            }
            columns.push(new_col);
        }
        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_view_rows_follow_offsets() {
        let col = ListColumn::from_rows(vec![vec![1, 2, 3], vec![], vec![5, 5]]);
        let view = col.view();
        assert_eq!(view.len(), 3);
        assert_eq!(view.row(0), &[1, 2, 3]);
        assert!(view.row(1).is_empty());
        assert_eq!(view.row(2), &[5, 5]);
        assert_eq!(view.offsets(), &[0, 3, 3, 5]);
    }

    #[test]
    fn view_rejects_bad_offsets() {
        let values = [1i64, 2, 3];
        assert!(ListColumnView::try_new(&[1, 3], &values, None).is_err());
        assert!(ListColumnView::try_new(&[0, 2], &values, None).is_err());
        assert!(ListColumnView::try_new(&[0, 2, 1, 3], &values, None).is_err());
        assert!(ListColumnView::try_new(&[], &values, None).is_err());
        assert!(ListColumnView::try_new(&[0, 1, 3], &values, Some(&[true])).is_err());
        assert!(ListColumnView::try_new(&[0, 1, 3], &values, Some(&[true, false])).is_ok());
    }

    #[test]
    fn list_from_options_marks_nulls() {
        let col = ListColumn::from_options(vec![Some(vec![1]), None, Some(vec![])]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.null_count(), 1);
        assert!(!col.is_valid(1));
        assert!(col.view().row(1).is_empty());
    }

    #[test]
    fn list_deserialize_validates_offsets() {
        let bad = r#"{"offsets":[0,4],"values":[1,2],"validity":null}"#;
        assert!(serde_json::from_str::<ListColumn>(bad).is_err());

        let good = ListColumn::from_rows(vec![vec![7, 8], vec![9]]);
        let json = serde_json::to_string(&good).unwrap();
        let back: ListColumn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, good);
    }

    #[test]
    fn float_columns_survive_json_bit_exact() {
        let col = PrimitiveColumn::with_validity(
            vec![1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0],
            vec![true, true, true, true, false],
        )
        .unwrap();
        let data = ColumnData::Float64(col);
        let json = serde_json::to_string(&data).unwrap();
        let ColumnData::Float64(back) = serde_json::from_str::<ColumnData>(&json).unwrap() else {
            panic!("float column came back as another type");
        };
        let bits: Vec<u64> = back.values().iter().map(|v| v.to_bits()).collect();
        let expected: Vec<u64> = [1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0]
            .iter()
            .map(|v| v.to_bits())
            .collect();
        assert_eq!(bits, expected);
        assert_eq!(back.validity(), Some(&[true, true, true, true, false][..]));
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::int64("a", vec![1, 2]),
            Column::int64("b", vec![1]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { left: 2, right: 1 }));
    }

    #[test]
    fn with_column_shares_existing_buffers() {
        let table = Table::new(vec![Column::list("xs", vec![vec![1, 2], vec![3]])]).unwrap();
        let out = table.with_column(Column::float64("score", vec![0.5, 1.0])).unwrap();
        assert_eq!(table.num_columns(), 1);
        assert_eq!(out.num_columns(), 2);

        let (ColumnData::List(a), ColumnData::List(b)) =
            (&table.columns()[0].data, &out.columns()[0].data)
        else {
            panic!("expected list columns");
        };
        assert!(std::ptr::eq(a.view().values(), b.view().values()));
    }

    #[test]
    fn hstack_suffixes_clashing_names() {
        let left = Table::new(vec![Column::int64("id", vec![1, 2])]).unwrap();
        let right = Table::new(vec![Column::int64("id", vec![3, 4])]).unwrap();
        let out = Table::hstack(&left, &right).unwrap();
        let names: Vec<_> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "id_right"]);
    }

    #[test]
    fn primitive_from_options_tracks_validity() {
        let col = PrimitiveColumn::from_options(vec![Some(1.5), None, Some(2.0)]);
        assert_eq!(col.null_count(), 1);
        assert_eq!(col.get(1), None);
        assert_eq!(col.get(2), Some(&2.0));
        let taken = col.take(&[2, 1]);
        assert_eq!(taken.iter().collect::<Vec<_>>(), vec![Some(&2.0), None]);
    }
}
