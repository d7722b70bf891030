//! The columnar writer: a thin, strongly-typed wrapper over
//! `parquet`'s `ArrowWriter`, tuned for read-heavy analytical access —
//! Zstd-3 compression, ~64 MiB row groups, ~8 KiB data pages, page-level
//! min/max statistics, and dictionary-friendly string columns.

pub mod reader;
pub mod rates_writer;
pub mod schema;
pub mod toc_writer;

pub use reader::{read_charge_rows, ChargeRowReader};

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};

use crate::error::WriterError;
use crate::row::ChargeRow;

/// Row count per row group, chosen so that a typical ~260-byte `ChargeRow`
/// keeps a row group near the ~64 MiB uncompressed target.
const ROWS_PER_ROW_GROUP: usize = 250_000;

const DATA_PAGE_SIZE_BYTES: usize = 8 * 1024;

fn writer_properties() -> Result<WriterProperties, WriterError> {
    let zstd = ZstdLevel::try_new(3)?;
    Ok(WriterProperties::builder()
        .set_compression(Compression::ZSTD(zstd))
        .set_max_row_group_size(ROWS_PER_ROW_GROUP)
        .set_data_page_size_limit(DATA_PAGE_SIZE_BYTES)
        .set_statistics_enabled(EnabledStatistics::Page)
        .set_dictionary_enabled(true)
        .build())
}

/// Thin wrapper around `ArrowWriter<File>` shared by every columnar output
/// this crate produces (the charge-row file and the TOC plans/urls pair).
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    rows_written: u64,
}

impl ParquetSink {
    pub fn create<P: AsRef<Path>>(path: P, schema: SchemaRef) -> Result<Self, WriterError> {
        let file = File::create(path)?;
        let props = writer_properties()?;
        let writer = ArrowWriter::try_new(file, schema, Some(props))?;
        Ok(ParquetSink {
            writer,
            rows_written: 0,
        })
    }

    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        self.writer.write(batch)?;
        self.rows_written += batch.num_rows() as u64;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.rows_written
    }

    pub fn close(mut self) -> Result<u64, WriterError> {
        self.writer.finish()?;
        Ok(self.rows_written)
    }
}

/// Builds one `RecordBatch` of `ChargeRow`s per `write()` call. Callers
/// should batch 8-10k rows per call to amortize per-batch overhead; row order should follow the recommended (description, payer_name)
/// sort for maximum row-group skip on common query patterns.
pub struct ChargeRowWriter {
    sink: ParquetSink,
}

macro_rules! push_opt_str {
    ($builder:expr, $value:expr) => {
        match $value {
            Some(v) => $builder.append_value(v),
            None => $builder.append_null(),
        }
    };
}

macro_rules! push_opt_f64 {
    ($builder:expr, $value:expr) => {
        match $value {
            Some(v) => $builder.append_value(*v),
            None => $builder.append_null(),
        }
    };
}

impl ChargeRowWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, WriterError> {
        Ok(ChargeRowWriter {
            sink: ParquetSink::create(path, schema::charge_row_schema())?,
        })
    }

    /// Appends one batch of rows as a single `RecordBatch`.
    pub fn write(&mut self, rows: &[ChargeRow]) -> Result<(), WriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let batch = build_record_batch(rows)?;
        self.sink.write_batch(&batch)
    }

    pub fn count(&self) -> u64 {
        self.sink.count()
    }

    pub fn close(self) -> Result<u64, WriterError> {
        self.sink.close()
    }
}

fn build_record_batch(rows: &[ChargeRow]) -> Result<RecordBatch, WriterError> {
    let n = rows.len();
    let mut description = StringBuilder::with_capacity(n, n * 16);
    let mut setting = StringBuilder::new();
    let mut cpt = StringBuilder::new();
    let mut hcpcs = StringBuilder::new();
    let mut ms_drg = StringBuilder::new();
    let mut ndc = StringBuilder::new();
    let mut rc = StringBuilder::new();
    let mut icd = StringBuilder::new();
    let mut drg = StringBuilder::new();
    let mut cdm = StringBuilder::new();
    let mut local = StringBuilder::new();
    let mut apc = StringBuilder::new();
    let mut eapg = StringBuilder::new();
    let mut hipps = StringBuilder::new();
    let mut cdt = StringBuilder::new();
    let mut r_drg = StringBuilder::new();
    let mut s_drg = StringBuilder::new();
    let mut aps_drg = StringBuilder::new();
    let mut ap_drg = StringBuilder::new();
    let mut apr_drg = StringBuilder::new();
    let mut tris_drg = StringBuilder::new();
    let mut payer_name = StringBuilder::new();
    let mut plan_name = StringBuilder::new();
    let mut gross_charge = Float64Builder::new();
    let mut discounted_cash = Float64Builder::new();
    let mut negotiated_dollar = Float64Builder::new();
    let mut negotiated_percentage = Float64Builder::new();
    let mut estimated_amount = Float64Builder::new();
    let mut min_charge = Float64Builder::new();
    let mut max_charge = Float64Builder::new();
    let mut negotiated_algorithm = StringBuilder::new();
    let mut methodology = StringBuilder::new();
    let mut drug_unit_of_measurement = Float64Builder::new();
    let mut drug_type_of_measurement = StringBuilder::new();
    let mut modifiers = StringBuilder::new();
    let mut additional_generic_notes = StringBuilder::new();
    let mut additional_payer_notes = StringBuilder::new();
    let mut billing_class = StringBuilder::new();
    let mut financial_aid_policy = StringBuilder::new();
    let mut general_contract_provisions = StringBuilder::new();
    let mut hospital_name = StringBuilder::with_capacity(n, n * 16);
    let mut last_updated_on = StringBuilder::new();
    let mut version = StringBuilder::new();
    let mut hospital_location = StringBuilder::new();
    let mut hospital_address = StringBuilder::new();
    let mut license_number = StringBuilder::new();
    let mut license_state = StringBuilder::new();
    let mut affirmation = BooleanBuilder::new();

    for row in rows {
        description.append_value(&row.description);
        push_opt_str!(setting, row.setting.map(|s| s.as_str()));
        push_opt_str!(cpt, row.cpt.as_deref());
        push_opt_str!(hcpcs, row.hcpcs.as_deref());
        push_opt_str!(ms_drg, row.ms_drg.as_deref());
        push_opt_str!(ndc, row.ndc.as_deref());
        push_opt_str!(rc, row.rc.as_deref());
        push_opt_str!(icd, row.icd.as_deref());
        push_opt_str!(drg, row.drg.as_deref());
        push_opt_str!(cdm, row.cdm.as_deref());
        push_opt_str!(local, row.local.as_deref());
        push_opt_str!(apc, row.apc.as_deref());
        push_opt_str!(eapg, row.eapg.as_deref());
        push_opt_str!(hipps, row.hipps.as_deref());
        push_opt_str!(cdt, row.cdt.as_deref());
        push_opt_str!(r_drg, row.r_drg.as_deref());
        push_opt_str!(s_drg, row.s_drg.as_deref());
        push_opt_str!(aps_drg, row.aps_drg.as_deref());
        push_opt_str!(ap_drg, row.ap_drg.as_deref());
        push_opt_str!(apr_drg, row.apr_drg.as_deref());
        push_opt_str!(tris_drg, row.tris_drg.as_deref());
        push_opt_str!(payer_name, row.payer_name.as_deref());
        push_opt_str!(plan_name, row.plan_name.as_deref());
        push_opt_f64!(gross_charge, &row.gross_charge);
        push_opt_f64!(discounted_cash, &row.discounted_cash);
        push_opt_f64!(negotiated_dollar, &row.negotiated_dollar);
        push_opt_f64!(negotiated_percentage, &row.negotiated_percentage);
        push_opt_f64!(estimated_amount, &row.estimated_amount);
        push_opt_f64!(min_charge, &row.min_charge);
        push_opt_f64!(max_charge, &row.max_charge);
        push_opt_str!(negotiated_algorithm, row.negotiated_algorithm.as_deref());
        push_opt_str!(methodology, row.methodology.map(methodology_str));
        push_opt_f64!(drug_unit_of_measurement, &row.drug_unit_of_measurement);
        push_opt_str!(
            drug_type_of_measurement,
            row.drug_type_of_measurement.map(|d| d.as_str())
        );
        push_opt_str!(modifiers, row.modifiers.as_deref());
        push_opt_str!(
            additional_generic_notes,
            row.additional_generic_notes.as_deref()
        );
        push_opt_str!(
            additional_payer_notes,
            row.additional_payer_notes.as_deref()
        );
        push_opt_str!(billing_class, row.billing_class.as_deref());
        push_opt_str!(financial_aid_policy, row.financial_aid_policy.as_deref());
        push_opt_str!(
            general_contract_provisions,
            row.general_contract_provisions.as_deref()
        );
        hospital_name.append_value(&row.hospital_name);
        last_updated_on.append_value(&row.last_updated_on);
        version.append_value(&row.version);
        push_opt_str!(hospital_location, row.hospital_location.as_deref());
        push_opt_str!(hospital_address, row.hospital_address.as_deref());
        push_opt_str!(license_number, row.license_number.as_deref());
        push_opt_str!(license_state, row.license_state.as_deref());
        affirmation.append_value(row.affirmation);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(description.finish()),
        Arc::new(setting.finish()),
        Arc::new(cpt.finish()),
        Arc::new(hcpcs.finish()),
        Arc::new(ms_drg.finish()),
        Arc::new(ndc.finish()),
        Arc::new(rc.finish()),
        Arc::new(icd.finish()),
        Arc::new(drg.finish()),
        Arc::new(cdm.finish()),
        Arc::new(local.finish()),
        Arc::new(apc.finish()),
        Arc::new(eapg.finish()),
        Arc::new(hipps.finish()),
        Arc::new(cdt.finish()),
        Arc::new(r_drg.finish()),
        Arc::new(s_drg.finish()),
        Arc::new(aps_drg.finish()),
        Arc::new(ap_drg.finish()),
        Arc::new(apr_drg.finish()),
        Arc::new(tris_drg.finish()),
        Arc::new(payer_name.finish()),
        Arc::new(plan_name.finish()),
        Arc::new(gross_charge.finish()),
        Arc::new(discounted_cash.finish()),
        Arc::new(negotiated_dollar.finish()),
        Arc::new(negotiated_percentage.finish()),
        Arc::new(estimated_amount.finish()),
        Arc::new(min_charge.finish()),
        Arc::new(max_charge.finish()),
        Arc::new(negotiated_algorithm.finish()),
        Arc::new(methodology.finish()),
        Arc::new(drug_unit_of_measurement.finish()),
        Arc::new(drug_type_of_measurement.finish()),
        Arc::new(modifiers.finish()),
        Arc::new(additional_generic_notes.finish()),
        Arc::new(additional_payer_notes.finish()),
        Arc::new(billing_class.finish()),
        Arc::new(financial_aid_policy.finish()),
        Arc::new(general_contract_provisions.finish()),
        Arc::new(hospital_name.finish()),
        Arc::new(last_updated_on.finish()),
        Arc::new(version.finish()),
        Arc::new(hospital_location.finish()),
        Arc::new(hospital_address.finish()),
        Arc::new(license_number.finish()),
        Arc::new(license_state.finish()),
        Arc::new(affirmation.finish()),
    ];

    Ok(RecordBatch::try_new(schema::charge_row_schema(), columns)?)
}

fn methodology_str(m: crate::row::Methodology) -> &'static str {
    match m {
        crate::row::Methodology::CaseRate => "case_rate",
        crate::row::Methodology::FeeSchedule => "fee_schedule",
        crate::row::Methodology::PercentOfTotalBilledCharges => {
            "percent_of_total_billed_charges"
        }
        crate::row::Methodology::PerDiem => "per_diem",
        crate::row::Methodology::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::HospitalMeta;
    use tempfile::tempdir;

    #[test]
    fn round_trips_row_count_through_a_real_parquet_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("charges.parquet");

        let meta = HospitalMeta {
            hospital_name: "Test General Hospital".to_string(),
            last_updated_on: "2024-01-15".to_string(),
            version: "2.1.0".to_string(),
            affirmation: true,
            ..Default::default()
        };

        let mut writer = ChargeRowWriter::create(&path).unwrap();
        let mut row = ChargeRow::with_meta(&meta, "ECHOCARDIOGRAM");
        row.cpt = Some("93306".to_string());
        row.gross_charge = Some(1500.0);
        writer.write(&[row.clone(), row]).unwrap();
        let total = writer.close().unwrap();
        assert_eq!(total, 2);

        let file = File::open(&path).unwrap();
        let reader = parquet::file::reader::SerializedFileReader::new(file).unwrap();
        use parquet::file::reader::FileReader;
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    }
}
