//! The sibling rates/providers columnar writer for the in-network rate
//! converter.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use arrow_array::builder::{Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, Float64Array, RecordBatch};

use super::schema;
use super::ParquetSink;
use crate::error::WriterError;
use crate::rates::{ProviderRow, RateRow};

/// Writes the two sibling Parquet files (`<base>.rates.parquet`,
/// `<base>.providers.parquet`) the in-network rate converter produces.
pub struct RatesParquetWriter {
    rates: ParquetSink,
    providers: ParquetSink,
}

impl RatesParquetWriter {
    pub fn create<P: AsRef<Path>>(base_path: P) -> Result<Self, WriterError> {
        let base = base_path.as_ref();
        let rates_path = with_suffix(base, "rates");
        let providers_path = with_suffix(base, "providers");
        Ok(RatesParquetWriter {
            rates: ParquetSink::create(rates_path, schema::rate_row_schema())?,
            providers: ParquetSink::create(providers_path, schema::provider_row_schema())?,
        })
    }

    pub fn write_rates(&mut self, rows: &[RateRow]) -> Result<(), WriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut negotiation_arrangement = StringBuilder::new();
        let mut name = StringBuilder::new();
        let mut billing_code_type = StringBuilder::new();
        let mut billing_code_type_version = StringBuilder::new();
        let mut billing_code = StringBuilder::new();
        let mut description = StringBuilder::new();
        let mut negotiated_type = StringBuilder::new();
        let mut negotiated_rate = Vec::with_capacity(rows.len());
        let mut expiration_date = StringBuilder::new();
        let mut billing_class = StringBuilder::new();
        let mut provider_group_ids = StringBuilder::new();

        for row in rows {
            negotiation_arrangement.append_value(&row.negotiation_arrangement);
            name.append_value(&row.name);
            billing_code_type.append_value(&row.billing_code_type);
            billing_code_type_version.append_value(&row.billing_code_type_version);
            billing_code.append_value(&row.billing_code);
            description.append_value(&row.description);
            negotiated_type.append_value(&row.negotiated_type);
            negotiated_rate.push(row.negotiated_rate);
            expiration_date.append_value(&row.expiration_date);
            match &row.billing_class {
                Some(v) => billing_class.append_value(v),
                None => billing_class.append_null(),
            }
            provider_group_ids.append_value(&row.provider_group_ids);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(negotiation_arrangement.finish()),
            Arc::new(name.finish()),
            Arc::new(billing_code_type.finish()),
            Arc::new(billing_code_type_version.finish()),
            Arc::new(billing_code.finish()),
            Arc::new(description.finish()),
            Arc::new(negotiated_type.finish()),
            Arc::new(Float64Array::from(negotiated_rate)),
            Arc::new(expiration_date.finish()),
            Arc::new(billing_class.finish()),
            Arc::new(provider_group_ids.finish()),
        ];
        let batch = RecordBatch::try_new(schema::rate_row_schema(), columns)?;
        self.rates.write_batch(&batch)
    }

    pub fn write_providers(&mut self, rows: &[ProviderRow]) -> Result<(), WriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut provider_group_id = Int64Builder::with_capacity(rows.len());
        let mut npi = Int64Builder::with_capacity(rows.len());
        let mut tin_type = StringBuilder::new();
        let mut tin_value = StringBuilder::new();

        for row in rows {
            provider_group_id.append_value(row.provider_group_id);
            npi.append_value(row.npi);
            tin_type.append_value(&row.tin_type);
            tin_value.append_value(&row.tin_value);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(provider_group_id.finish()),
            Arc::new(npi.finish()),
            Arc::new(tin_type.finish()),
            Arc::new(tin_value.finish()),
        ];
        let batch = RecordBatch::try_new(schema::provider_row_schema(), columns)?;
        self.providers.write_batch(&batch)
    }

    pub fn close(self) -> Result<(u64, u64), WriterError> {
        Ok((self.rates.close()?, self.providers.close()?))
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(suffix);
    name.push_str(".parquet");
    match base.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}
