//! The sibling plans/urls columnar writer for the TOC plan extractor,
//! plus the small JSON-wrapper variant for small result sets.

use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{StringBuilder, UInt64Builder};
use arrow_array::{ArrayRef, RecordBatch};
use serde::Serialize;

use super::schema;
use super::ParquetSink;
use crate::error::WriterError;
use crate::toc::{PlanRow, UrlRow};

/// Writes the two sibling Parquet files (`<base>.plans.parquet`,
/// `<base>.urls.parquet`) the TOC extractor produces by default.
pub struct TocParquetWriter {
    plans: ParquetSink,
    urls: ParquetSink,
}

impl TocParquetWriter {
    pub fn create<P: AsRef<Path>>(base_path: P) -> Result<Self, WriterError> {
        let base = base_path.as_ref();
        let plans_path = with_suffix(base, "plans");
        let urls_path = with_suffix(base, "urls");
        Ok(TocParquetWriter {
            plans: ParquetSink::create(plans_path, schema::toc_plans_schema())?,
            urls: ParquetSink::create(urls_path, schema::toc_urls_schema())?,
        })
    }

    pub fn write_plans(&mut self, rows: &[PlanRow]) -> Result<(), WriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let n = rows.len();
        let mut structure_id = UInt64Builder::with_capacity(n);
        let mut plan_name = StringBuilder::new();
        let mut plan_id = StringBuilder::new();
        let mut plan_id_type = StringBuilder::new();
        let mut plan_market_type = StringBuilder::new();
        let mut issuer_name = StringBuilder::new();
        let mut description = StringBuilder::new();

        for row in rows {
            structure_id.append_value(row.structure_id);
            plan_name.append_value(&row.plan_name);
            match &row.plan_id {
                Some(v) => plan_id.append_value(v),
                None => plan_id.append_null(),
            }
            plan_id_type.append_value(row.plan_id_type.as_str());
            plan_market_type.append_value(row.plan_market_type.as_str());
            match &row.issuer_name {
                Some(v) => issuer_name.append_value(v),
                None => issuer_name.append_null(),
            }
            match &row.description {
                Some(v) => description.append_value(v),
                None => description.append_null(),
            }
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(structure_id.finish()),
            Arc::new(plan_name.finish()),
            Arc::new(plan_id.finish()),
            Arc::new(plan_id_type.finish()),
            Arc::new(plan_market_type.finish()),
            Arc::new(issuer_name.finish()),
            Arc::new(description.finish()),
        ];
        let batch = RecordBatch::try_new(schema::toc_plans_schema(), columns)?;
        self.plans.write_batch(&batch)
    }

    pub fn write_urls(&mut self, rows: &[UrlRow]) -> Result<(), WriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let n = rows.len();
        let mut structure_id = UInt64Builder::with_capacity(n);
        let mut url = StringBuilder::new();
        for row in rows {
            structure_id.append_value(row.structure_id);
            url.append_value(&row.url);
        }
        let columns: Vec<ArrayRef> = vec![Arc::new(structure_id.finish()), Arc::new(url.finish())];
        let batch = RecordBatch::try_new(schema::toc_urls_schema(), columns)?;
        self.urls.write_batch(&batch)
    }

    pub fn close(self) -> Result<(u64, u64), WriterError> {
        Ok((self.plans.close()?, self.urls.close()?))
    }
}

fn with_suffix(base: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(suffix);
    name.push_str(".parquet");
    match base.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => std::path::PathBuf::from(name),
    }
}

/// One plan plus its matched structure's URLs, inlined — the JSON-wrapper
/// shape for small result sets.
#[derive(Debug, Serialize)]
pub struct PlanWithUrls<'a> {
    pub structure_id: u64,
    pub plan_name: &'a str,
    pub plan_id: Option<&'a str>,
    pub plan_id_type: &'static str,
    pub plan_market_type: &'static str,
    pub issuer_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub urls: Vec<&'a str>,
}

/// Builds the JSON-wrapper output: each plan with its structure's URLs
/// inlined, rather than the normalized plans/urls pair.
pub fn to_json_wrapper<'a>(plans: &'a [PlanRow], urls: &'a [UrlRow]) -> String {
    let wrapped: Vec<PlanWithUrls<'a>> = plans
        .iter()
        .map(|plan| {
            let plan_urls = urls
                .iter()
                .filter(|u| u.structure_id == plan.structure_id)
                .map(|u| u.url.as_str())
                .collect();
            PlanWithUrls {
                structure_id: plan.structure_id,
                plan_name: &plan.plan_name,
                plan_id: plan.plan_id.as_deref(),
                plan_id_type: plan.plan_id_type.as_str(),
                plan_market_type: plan.plan_market_type.as_str(),
                issuer_name: plan.issuer_name.as_deref(),
                description: plan.description.as_deref(),
                urls: plan_urls,
            }
        })
        .collect();
    serde_json::to_string_pretty(&wrapped).unwrap_or_default()
}
