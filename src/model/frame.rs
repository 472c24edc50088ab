/// Row-major table of named `f64` columns, the input shape every
/// [`Regressor`](super::Regressor) consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureFrame {
    /// Builds a frame from `(column, value)` records. The column set comes
    /// from the first record, so zero records give a frame with no columns.
    /// Every later record must carry the same columns in the same order.
    pub fn from_records<'a, R>(records: impl IntoIterator<Item = R>) -> Result<Self, String>
    where
        R: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut columns: Option<Vec<String>> = None;
        let mut values = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let (names, row): (Vec<&str>, Vec<f64>) = record.into_iter().unzip();
            match &columns {
                None => columns = Some(names.iter().map(|s| s.to_string()).collect()),
                Some(existing) => {
                    if existing.iter().map(String::as_str).ne(names.iter().copied()) {
                        return Err(format!(
                            "record {index} has columns {names:?}, expected {existing:?}"
                        ));
                    }
                }
            }
            values.extend(row);
        }

        Ok(FeatureFrame {
            columns: columns.unwrap_or_default(),
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            self.values.len() / self.columns.len()
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on zero, and a column-less frame has no rows anyway.
        self.values.chunks_exact(self.columns.len().max(1))
    }
}
