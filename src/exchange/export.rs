use super::xliff::{write_document, XliffFile, XliffUnit};
use super::{column_header, csv, KEY_HEADER, NAMESPACE_HEADER};
use crate::catalog::LocaleCode;
use crate::error::{CatalogError, CatalogResult};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xliff,
}

impl ExportFormat {
    pub fn parse(value: &str) -> CatalogResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xliff" | "xlf" => Ok(ExportFormat::Xliff),
            other => Err(CatalogError::InvalidArgument(format!(
                "unknown export format '{}' (expected json, csv or xliff)",
                other
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xliff => "application/x-xliff+xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xliff => "xlf",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportFilter {
    pub namespace: Option<String>,
    /// Export only this locale next to the baseline
    pub locale: Option<String>,
    /// Keep only keys that are absent or empty in some exported locale
    #[serde(default)]
    pub missing_only: bool,
}

#[derive(Debug, Clone)]
pub struct Exported {
    pub format: ExportFormat,
    pub content: String,
    pub rows: usize,
}

/// Baseline keys by column. The baseline is always the first column.
struct Matrix {
    baseline: String,
    columns: Vec<String>,
    rows: Vec<MatrixRow>,
}

struct MatrixRow {
    namespace: String,
    key: String,
    values: BTreeMap<String, String>,
}

impl MatrixRow {
    fn value(&self, locale: &str) -> &str {
        self.values.get(locale).map(String::as_str).unwrap_or("")
    }
}

impl Workspace {
    pub fn export_catalog(&self, format: ExportFormat, filter: &ExportFilter) -> CatalogResult<Exported> {
        let matrix = self.key_matrix(filter)?;
        let content = match format {
            ExportFormat::Json => to_json(&matrix)?,
            ExportFormat::Csv => to_csv(&matrix),
            ExportFormat::Xliff => to_xliff(&matrix),
        };
        info!(
            "Exported {} keys x {} locales as {}",
            matrix.rows.len(),
            matrix.columns.len(),
            format.extension()
        );
        Ok(Exported {
            format,
            content,
            rows: matrix.rows.len(),
        })
    }

    fn key_matrix(&self, filter: &ExportFilter) -> CatalogResult<Matrix> {
        let baseline = self.baseline()?;
        let catalogs = self.store.load_all()?;
        let base = catalogs
            .get(&baseline)
            .ok_or_else(|| CatalogError::NotFound(format!("baseline locale '{}'", baseline)))?;

        let mut columns = vec![baseline.clone()];
        if let Some(locale) = &filter.locale {
            LocaleCode::parse(locale)?;
        }
        match &filter.locale {
            Some(locale) if !catalogs.contains_key(locale) => {
                return Err(CatalogError::NotFound(format!("locale '{}'", locale)));
            }
            Some(locale) if *locale != baseline => columns.push(locale.clone()),
            Some(_) => {}
            None => columns.extend(catalogs.keys().filter(|l| **l != baseline).cloned()),
        }

        if let Some(namespace) = &filter.namespace {
            if !base.has_namespace(namespace) {
                return Err(CatalogError::NotFound(format!("namespace '{}'", namespace)));
            }
        }

        let rows = base
            .entries()
            .into_iter()
            .filter(|e| filter.namespace.as_ref().map_or(true, |ns| *ns == e.namespace))
            .map(|e| {
                let values = columns
                    .iter()
                    .filter_map(|locale| {
                        catalogs
                            .get(locale)
                            .and_then(|c| c.get(&e.namespace, &e.key))
                            .map(|v| (locale.clone(), v.to_string()))
                    })
                    .collect();
                MatrixRow {
                    namespace: e.namespace,
                    key: e.key,
                    values,
                }
            })
            .filter(|row| {
                !filter.missing_only
                    || columns[1..].iter().any(|locale| row.value(locale).is_empty())
            })
            .collect();

        Ok(Matrix {
            baseline,
            columns,
            rows,
        })
    }
}

fn to_json(matrix: &Matrix) -> CatalogResult<String> {
    let mut document: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, &str>>> = BTreeMap::new();
    for row in &matrix.rows {
        let cells = matrix
            .columns
            .iter()
            .map(|locale| (locale.as_str(), row.value(locale)))
            .collect();
        document
            .entry(row.namespace.as_str())
            .or_default()
            .insert(row.key.as_str(), cells);
    }
    serde_json::to_string_pretty(&document).map_err(|e| CatalogError::serialization("export", e))
}

fn to_csv(matrix: &Matrix) -> String {
    let mut header = vec![NAMESPACE_HEADER.to_string(), KEY_HEADER.to_string()];
    header.extend(matrix.columns.iter().map(|l| column_header(l)));

    let mut out = csv::write_row(&header);
    for row in &matrix.rows {
        let mut fields = vec![row.namespace.as_str(), row.key.as_str()];
        fields.extend(matrix.columns.iter().map(|l| row.value(l)));
        out.push_str(&csv::write_row(&fields));
    }
    out
}

/// One `<file>` per namespace and target locale.
fn to_xliff(matrix: &Matrix) -> String {
    let mut files = Vec::new();
    for target in &matrix.columns[1..] {
        let mut by_namespace: BTreeMap<&str, Vec<XliffUnit>> = BTreeMap::new();
        for row in &matrix.rows {
            by_namespace.entry(row.namespace.as_str()).or_default().push(XliffUnit {
                id: format!("{}.{}", row.namespace, row.key),
                source: row.value(&matrix.baseline).to_string(),
                target: row.value(target).to_string(),
            });
        }
        files.extend(by_namespace.into_iter().map(|(namespace, units)| XliffFile {
            original: namespace.to_string(),
            source_language: matrix.baseline.clone(),
            target_language: target.clone(),
            units,
        }));
    }
    write_document(&files)
}
