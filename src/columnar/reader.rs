//! Reads a [`ChargeRow`] columnar file back in ~8k-row pages. This is the
//! read half of [`super::ChargeRowWriter`]; the relational loader drives the
//! whole pipeline through this reader.

use std::fs::File;
use std::path::Path;

use arrow_array::{BooleanArray, Float64Array, RecordBatch, StringArray};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use crate::error::WriterError;
use crate::row::{ChargeRow, DrugUnitOfMeasurement, Methodology, Setting};

/// Row count requested per `RecordBatch`, matching the "~8k rows"
/// page size for the relational loader's sequential scan.
const LOADER_PAGE_SIZE: usize = 8192;

pub struct ChargeRowReader {
    inner: ParquetRecordBatchReader,
}

impl ChargeRowReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WriterError> {
        let file = File::open(path)?;
        let inner = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(LOADER_PAGE_SIZE)
            .build()?;
        Ok(ChargeRowReader { inner })
    }

    /// Returns the next page of rows, or `None` once the file is exhausted.
    pub fn next_page(&mut self) -> Option<Result<Vec<ChargeRow>, WriterError>> {
        self.inner.next().map(|batch| {
            let batch = batch.map_err(WriterError::from)?;
            read_charge_rows(&batch)
        })
    }
}

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("column {name} is not Utf8"))
}

fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Float64Array {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap_or_else(|| panic!("column {name} is not Float64"))
}

fn bool_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a BooleanArray {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap_or_else(|| panic!("column {name} is not Boolean"))
}

fn opt_str(col: &StringArray, i: usize) -> Option<String> {
    if col.is_null(i) {
        None
    } else {
        Some(col.value(i).to_string())
    }
}

fn opt_f64(col: &Float64Array, i: usize) -> Option<f64> {
    if col.is_null(i) {
        None
    } else {
        Some(col.value(i))
    }
}

/// Rebuilds `ChargeRow`s from one `RecordBatch`, the inverse of
/// `build_record_batch` in [`super`]. Field-by-field round-trip is the
/// columnar round-trip invariant.
pub fn read_charge_rows(batch: &RecordBatch) -> Result<Vec<ChargeRow>, WriterError> {
    let n = batch.num_rows();

    let description = str_col(batch, "description");
    let setting = str_col(batch, "setting");
    let cpt = str_col(batch, "cpt");
    let hcpcs = str_col(batch, "hcpcs");
    let ms_drg = str_col(batch, "ms_drg");
    let ndc = str_col(batch, "ndc");
    let rc = str_col(batch, "rc");
    let icd = str_col(batch, "icd");
    let drg = str_col(batch, "drg");
    let cdm = str_col(batch, "cdm");
    let local = str_col(batch, "local");
    let apc = str_col(batch, "apc");
    let eapg = str_col(batch, "eapg");
    let hipps = str_col(batch, "hipps");
    let cdt = str_col(batch, "cdt");
    let r_drg = str_col(batch, "r_drg");
    let s_drg = str_col(batch, "s_drg");
    let aps_drg = str_col(batch, "aps_drg");
    let ap_drg = str_col(batch, "ap_drg");
    let apr_drg = str_col(batch, "apr_drg");
    let tris_drg = str_col(batch, "tris_drg");
    let payer_name = str_col(batch, "payer_name");
    let plan_name = str_col(batch, "plan_name");
    let gross_charge = f64_col(batch, "gross_charge");
    let discounted_cash = f64_col(batch, "discounted_cash");
    let negotiated_dollar = f64_col(batch, "negotiated_dollar");
    let negotiated_percentage = f64_col(batch, "negotiated_percentage");
    let estimated_amount = f64_col(batch, "estimated_amount");
    let min_charge = f64_col(batch, "min_charge");
    let max_charge = f64_col(batch, "max_charge");
    let negotiated_algorithm = str_col(batch, "negotiated_algorithm");
    let methodology = str_col(batch, "methodology");
    let drug_unit_of_measurement = f64_col(batch, "drug_unit_of_measurement");
    let drug_type_of_measurement = str_col(batch, "drug_type_of_measurement");
    let modifiers = str_col(batch, "modifiers");
    let additional_generic_notes = str_col(batch, "additional_generic_notes");
    let additional_payer_notes = str_col(batch, "additional_payer_notes");
    let billing_class = str_col(batch, "billing_class");
    let financial_aid_policy = str_col(batch, "financial_aid_policy");
    let general_contract_provisions = str_col(batch, "general_contract_provisions");
    let hospital_name = str_col(batch, "hospital_name");
    let last_updated_on = str_col(batch, "last_updated_on");
    let version = str_col(batch, "version");
    let hospital_location = str_col(batch, "hospital_location");
    let hospital_address = str_col(batch, "hospital_address");
    let license_number = str_col(batch, "license_number");
    let license_state = str_col(batch, "license_state");
    let affirmation = bool_col(batch, "affirmation");

    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        rows.push(ChargeRow {
            description: description.value(i).to_string(),
            setting: opt_str(setting, i).as_deref().and_then(Setting::parse),
            cpt: opt_str(cpt, i),
            hcpcs: opt_str(hcpcs, i),
            ms_drg: opt_str(ms_drg, i),
            ndc: opt_str(ndc, i),
            rc: opt_str(rc, i),
            icd: opt_str(icd, i),
            drg: opt_str(drg, i),
            cdm: opt_str(cdm, i),
            local: opt_str(local, i),
            apc: opt_str(apc, i),
            eapg: opt_str(eapg, i),
            hipps: opt_str(hipps, i),
            cdt: opt_str(cdt, i),
            r_drg: opt_str(r_drg, i),
            s_drg: opt_str(s_drg, i),
            aps_drg: opt_str(aps_drg, i),
            ap_drg: opt_str(ap_drg, i),
            apr_drg: opt_str(apr_drg, i),
            tris_drg: opt_str(tris_drg, i),
            payer_name: opt_str(payer_name, i),
            plan_name: opt_str(plan_name, i),
            gross_charge: opt_f64(gross_charge, i),
            discounted_cash: opt_f64(discounted_cash, i),
            negotiated_dollar: opt_f64(negotiated_dollar, i),
            negotiated_percentage: opt_f64(negotiated_percentage, i),
            estimated_amount: opt_f64(estimated_amount, i),
            min_charge: opt_f64(min_charge, i),
            max_charge: opt_f64(max_charge, i),
            negotiated_algorithm: opt_str(negotiated_algorithm, i),
            methodology: opt_str(methodology, i).as_deref().and_then(Methodology::parse),
            drug_unit_of_measurement: opt_f64(drug_unit_of_measurement, i),
            drug_type_of_measurement: opt_str(drug_type_of_measurement, i)
                .as_deref()
                .and_then(DrugUnitOfMeasurement::parse),
            modifiers: opt_str(modifiers, i),
            additional_generic_notes: opt_str(additional_generic_notes, i),
            additional_payer_notes: opt_str(additional_payer_notes, i),
            billing_class: opt_str(billing_class, i),
            financial_aid_policy: opt_str(financial_aid_policy, i),
            general_contract_provisions: opt_str(general_contract_provisions, i),
            hospital_name: hospital_name.value(i).to_string(),
            last_updated_on: last_updated_on.value(i).to_string(),
            version: version.value(i).to_string(),
            hospital_location: opt_str(hospital_location, i),
            hospital_address: opt_str(hospital_address, i),
            license_number: opt_str(license_number, i),
            license_state: opt_str(license_state, i),
            affirmation: affirmation.value(i),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::ChargeRowWriter;
    use crate::row::HospitalMeta;
    use tempfile::tempdir;

    #[test]
    fn round_trips_every_field_through_a_real_parquet_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("charges.parquet");

        let meta = HospitalMeta {
            hospital_name: "Test General Hospital".to_string(),
            last_updated_on: "2024-01-15".to_string(),
            version: "2.1.0".to_string(),
            hospital_location: Some("Main Campus".to_string()),
            license_number: Some("H12345".to_string()),
            license_state: Some("NY".to_string()),
            affirmation: true,
            ..Default::default()
        };
        let mut row = ChargeRow::with_meta(&meta, "ECHOCARDIOGRAM");
        row.setting = Some(Setting::Outpatient);
        row.cpt = Some("93306".to_string());
        row.payer_name = Some("Aetna".to_string());
        row.plan_name = Some("PPO".to_string());
        row.gross_charge = Some(1500.0);
        row.negotiated_dollar = Some(900.0);
        row.methodology = Some(Methodology::FeeSchedule);
        row.modifiers = Some("26|59".to_string());

        let mut writer = ChargeRowWriter::create(&path).unwrap();
        writer.write(&[row.clone()]).unwrap();
        writer.close().unwrap();

        let mut reader = ChargeRowReader::open(&path).unwrap();
        let page = reader.next_page().unwrap().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0], row);
        assert!(reader.next_page().is_none());
    }
}
