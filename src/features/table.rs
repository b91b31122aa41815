use crate::app::errors::{AppError, AppResult};

/// One row of the feature table. `numeric` and `text` are aligned with the
/// owning table's numeric and text columns; missing numbers are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub index: usize,
    pub numeric: Vec<f64>,
    pub text: Vec<String>,
}

/// In-memory feature table. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    numeric_columns: Vec<String>,
    text_columns: Vec<String>,
    rows: Vec<EntityRecord>,
}

impl EntityTable {
    /// Builds a table from column names and `(numeric, text)` row values.
    /// Row indices are assigned in order.
    pub fn new(
        numeric_columns: Vec<String>,
        text_columns: Vec<String>,
        rows: Vec<(Vec<f64>, Vec<String>)>,
    ) -> AppResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for column in numeric_columns.iter().chain(text_columns.iter()) {
            if !seen.insert(column.as_str()) {
                return Err(AppError::Load(format!("duplicate column {column:?}")));
            }
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, (numeric, text))| {
                if numeric.len() != numeric_columns.len() || text.len() != text_columns.len() {
                    return Err(AppError::Load(format!(
                        "row {index} has {} numeric and {} text values, expected {} and {}",
                        numeric.len(),
                        text.len(),
                        numeric_columns.len(),
                        text_columns.len()
                    )));
                }
                Ok(EntityRecord {
                    index,
                    numeric,
                    text,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            numeric_columns,
            text_columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[EntityRecord] {
        &self.rows
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    #[cfg(test)]
    pub fn text_columns(&self) -> &[String] {
        &self.text_columns
    }

    pub fn numeric_column_index(&self, name: &str) -> Option<usize> {
        self.numeric_columns.iter().position(|c| c == name)
    }

    pub fn text_column_index(&self, name: &str) -> Option<usize> {
        self.text_columns.iter().position(|c| c == name)
    }

    /// Values of one numeric column in row order.
    pub fn numeric_values(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row.numeric[column])
    }

    #[cfg(test)]
    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        let column = self.text_column_index(column)?;
        self.rows.get(row).map(|r| r.text[column].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let result = EntityTable::new(
            vec!["f1".into()],
            vec!["name".into()],
            vec![(vec![1.0, 2.0], vec!["A".into()])],
        );
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let result = EntityTable::new(vec!["x".into()], vec!["x".into()], vec![]);
        assert!(matches!(result, Err(AppError::Load(_))));
    }

    #[test]
    fn lookups() {
        let table = EntityTable::new(
            vec!["f1".into()],
            vec!["name".into()],
            vec![
                (vec![1.0], vec!["A".into()]),
                (vec![2.0], vec!["B".into()]),
            ],
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.text(1, "name"), Some("B"));
        assert_eq!(table.text(2, "name"), None);
        assert_eq!(table.text(0, "missing"), None);
        assert_eq!(table.numeric_values(0).collect::<Vec<_>>(), vec![1.0, 2.0]);
        assert_eq!(table.rows()[1].index, 1);
    }
}
