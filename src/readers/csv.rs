//! Hospital standard-charge CSV reader: autodetects Tall vs Wide layout and
//! streams [`ChargeRow`] batches.
//!
//! The CSV disclosure carries three header rows (hospital-metadata field
//! names, their values, then the per-row data column headers) followed by
//! data rows.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::ReaderError;
use crate::row::{ChargeRow, CodeSlot, HospitalMeta, Setting};
use crate::util::{opt_numeric, opt_text};

use super::{ChargeReader, NextBatch, ReaderFormat, READ_BUFFER_CAPACITY};

/// Source rows consumed per `next_batch()` call. Readers may expand one
/// source row into several `ChargeRow`s (Wide payer fan-out), so this bounds
/// CSV-row I/O per call rather than output row count.
const SOURCE_ROWS_PER_BATCH: usize = 1024;

/// Independently trims each pipe-separated segment of a header cell, then
/// rejoins with `|`. Case is
/// preserved; structural lookups lowercase separately so payer/plan names
/// embedded in Wide headers keep their original case.
fn normalize_header_cell(raw: &str) -> String {
    raw.split('|')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, Default)]
struct WideGroup {
    payer: String,
    plan: String,
    dollar_col: Option<usize>,
    percentage_col: Option<usize>,
    algorithm_col: Option<usize>,
    estimated_col: Option<usize>,
    methodology_col: Option<usize>,
    notes_col: Option<usize>,
}

impl WideGroup {
    fn any_populated(&self, row: &StringRecord) -> bool {
        for col in [
            self.dollar_col,
            self.percentage_col,
            self.algorithm_col,
            self.estimated_col,
            self.methodology_col,
            self.notes_col,
        ] {
            if let Some(c) = col {
                if row.get(c).map(|v| !v.trim().is_empty()).unwrap_or(false) {
                    return true;
                }
            }
        }
        false
    }
}

enum WideSuffix {
    Dollar,
    Percentage,
    Algorithm,
    Estimated,
    Methodology,
    Notes,
}

/// Parses a single Wide header cell (already normalized) into
/// `(payer, plan, suffix)`, or `None` if it's not a payer/plan column.
/// Handles plan names that themselves contain `|` by taking `parts[1]` as
/// payer and the last part as the suffix, joining everything between as the
/// plan name.
fn parse_wide_header(normalized: &str) -> Option<(String, String, WideSuffix)> {
    let parts: Vec<&str> = normalized.split('|').collect();
    if parts.is_empty() {
        return None;
    }
    match parts[0].to_lowercase().as_str() {
        "standard_charge" if parts.len() >= 4 => {
            let suffix = match parts.last().unwrap().to_lowercase().as_str() {
                "negotiated_dollar" => WideSuffix::Dollar,
                "negotiated_percentage" => WideSuffix::Percentage,
                "negotiated_algorithm" => WideSuffix::Algorithm,
                "methodology" => WideSuffix::Methodology,
                _ => return None,
            };
            let payer = parts[1].to_string();
            let plan = parts[2..parts.len() - 1].join("|");
            Some((payer, plan, suffix))
        }
        "estimated_amount" if parts.len() >= 3 => {
            let payer = parts[1].to_string();
            let plan = parts[2..].join("|");
            Some((payer, plan, WideSuffix::Estimated))
        }
        "additional_payer_notes" if parts.len() >= 3 => {
            let payer = parts[1].to_string();
            let plan = parts[2..].join("|");
            Some((payer, plan, WideSuffix::Notes))
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct HeaderLayout {
    description_col: Option<usize>,
    setting_col: Option<usize>,
    payer_name_col: Option<usize>,
    plan_name_col: Option<usize>,
    gross_col: Option<usize>,
    discounted_col: Option<usize>,
    negotiated_dollar_col: Option<usize>,
    negotiated_percentage_col: Option<usize>,
    negotiated_algorithm_col: Option<usize>,
    methodology_col: Option<usize>,
    estimated_col: Option<usize>,
    min_col: Option<usize>,
    max_col: Option<usize>,
    modifiers_col: Option<usize>,
    generic_notes_col: Option<usize>,
    payer_notes_col: Option<usize>,
    drug_unit_col: Option<usize>,
    drug_type_col: Option<usize>,
    billing_class_col: Option<usize>,
    financial_aid_col: Option<usize>,
    general_contract_col: Option<usize>,
    code_cols: Vec<(usize, usize)>, // (value_col, type_col)
    wide_groups: Vec<WideGroup>,
}

impl HeaderLayout {
    fn from_headers(headers: &StringRecord) -> (Self, ReaderFormat) {
        let normalized: Vec<String> = headers.iter().map(normalize_header_cell).collect();
        let structural: HashMap<String, usize> = normalized
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_lowercase(), i))
            .collect();

        let payer_name_col = structural.get("payer_name").copied();
        let plan_name_col = structural.get("plan_name").copied();

        // Tall/Wide detection: map lookup of payer_name/plan_name first,
        // required so a file carrying both a literal payer_name column and
        // pipe-structured negotiated columns still resolves deterministically.
        let is_tall = payer_name_col.is_some();
        let is_wide = !is_tall
            && normalized
                .iter()
                .any(|h| h.contains('|') && h.to_lowercase().contains("negotiated_dollar"));

        let mut layout = HeaderLayout {
            description_col: structural.get("description").copied(),
            setting_col: structural.get("setting").copied(),
            payer_name_col,
            plan_name_col,
            gross_col: structural.get("standard_charge|gross").copied(),
            discounted_col: structural.get("standard_charge|discounted_cash").copied(),
            negotiated_dollar_col: structural.get("standard_charge|negotiated_dollar").copied(),
            negotiated_percentage_col: structural
                .get("standard_charge|negotiated_percentage")
                .copied(),
            negotiated_algorithm_col: structural
                .get("standard_charge|negotiated_algorithm")
                .copied(),
            methodology_col: structural.get("standard_charge|methodology").copied(),
            estimated_col: structural.get("estimated_amount").copied(),
            min_col: structural.get("standard_charge|min").copied(),
            max_col: structural.get("standard_charge|max").copied(),
            modifiers_col: structural.get("standard_charge|modifiers").copied(),
            generic_notes_col: structural.get("additional_generic_notes").copied(),
            payer_notes_col: structural.get("additional_payer_notes").copied(),
            drug_unit_col: structural.get("drug_unit_of_measurement").copied(),
            drug_type_col: structural.get("drug_type_of_measurement").copied(),
            billing_class_col: structural.get("billing_class").copied(),
            financial_aid_col: structural.get("financial_aid_policy").copied(),
            general_contract_col: structural.get("general_contract_provisions").copied(),
            code_cols: Vec::new(),
            wide_groups: Vec::new(),
        };

        // Code columns: `code|N` paired with sibling `code|N|type`.
        for (i, h) in normalized.iter().enumerate() {
            let lower = h.to_lowercase();
            let parts: Vec<&str> = lower.split('|').collect();
            if parts.len() == 2 && parts[0] == "code" && parts[1].parse::<u32>().is_ok() {
                let type_key = format!("code|{}|type", parts[1]);
                if let Some(&type_col) = structural.get(&type_key) {
                    layout.code_cols.push((i, type_col));
                }
            }
        }

        // Wide payer/plan groups, deduplicated on `payer\0plan`.
        if is_wide {
            let mut group_index: HashMap<String, usize> = HashMap::new();
            for (i, h) in normalized.iter().enumerate() {
                if let Some((payer, plan, suffix)) = parse_wide_header(h) {
                    let key = format!("{payer}\0{plan}");
                    let idx = *group_index.entry(key).or_insert_with(|| {
                        layout.wide_groups.push(WideGroup {
                            payer: payer.clone(),
                            plan: plan.clone(),
                            ..Default::default()
                        });
                        layout.wide_groups.len() - 1
                    });
                    let group = &mut layout.wide_groups[idx];
                    match suffix {
                        WideSuffix::Dollar => group.dollar_col = Some(i),
                        WideSuffix::Percentage => group.percentage_col = Some(i),
                        WideSuffix::Algorithm => group.algorithm_col = Some(i),
                        WideSuffix::Estimated => group.estimated_col = Some(i),
                        WideSuffix::Methodology => group.methodology_col = Some(i),
                        WideSuffix::Notes => group.notes_col = Some(i),
                    }
                }
            }
        }

        let format = if is_tall {
            ReaderFormat::Tall
        } else if is_wide {
            ReaderFormat::Wide
        } else {
            ReaderFormat::Tall
        };

        (layout, format)
    }
}

/// Reads the three hospital-metadata header rows (field names, values, and
/// the per-row data header) and returns the metadata plus the data header.
fn read_hospital_meta<R: Read>(
    records: &mut csv::StringRecordsIntoIter<R>,
) -> Result<(HospitalMeta, StringRecord), ReaderError> {
    let field_names = records.next().ok_or_else(|| ReaderError::Structure {
        stage: "csv-header",
        ordinal: 0,
        message: "missing hospital metadata field-name row".to_string(),
    })??;
    let field_values = records.next().ok_or_else(|| ReaderError::Structure {
        stage: "csv-header",
        ordinal: 1,
        message: "missing hospital metadata value row".to_string(),
    })??;
    let data_header = records.next().ok_or_else(|| ReaderError::Structure {
        stage: "csv-header",
        ordinal: 2,
        message: "missing data column header row".to_string(),
    })??;

    let mut meta = HospitalMeta {
        affirmation: true,
        ..Default::default()
    };
    let mut locations: Vec<String> = Vec::new();

    for (name_cell, value_cell) in field_names.iter().zip(field_values.iter()) {
        let name = normalize_header_cell(name_cell);
        let lower = name.to_lowercase();
        let value = value_cell.trim().to_string();

        if let Some(state) = lower.strip_prefix("license_number|") {
            if !value.is_empty() {
                meta.license_number = Some(value.clone());
                meta.license_state = Some(state.to_uppercase());
            }
            continue;
        }

        match lower.as_str() {
            "hospital_name" => meta.hospital_name = value,
            "last_updated_on" => meta.last_updated_on = value,
            "version" => meta.version = value,
            "hospital_address" => meta.hospital_address = opt_text(Some(&value)),
            "hospital_location" => {
                if !value.is_empty() {
                    locations.push(value);
                }
            }
            "license_number" => meta.license_number = opt_text(Some(&value)),
            "license_state" => meta.license_state = opt_text(Some(&value)),
            "affirmation" => {
                meta.affirmation = matches!(value.to_lowercase().as_str(), "true" | "yes" | "1")
            }
            _ => {}
        }
    }

    if !locations.is_empty() {
        meta.hospital_location = Some(locations.join("; "));
    }

    Ok((meta, data_header))
}

/// Streaming CSV reader for hospital standard-charge disclosures.
pub struct CsvReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    layout: HeaderLayout,
    format: ReaderFormat,
    meta: HospitalMeta,
    next_ordinal: u64,
    done: bool,
}

impl CsvReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::with_capacity(READ_BUFFER_CAPACITY, file))
    }
}

impl<R: Read> CsvReader<R> {
    pub fn from_reader(reader: R) -> Result<Self, ReaderError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        // `csv` handles the BOM itself for UTF-8, but strip defensively for
        // readers built directly over raw bytes elsewhere in the pipeline.
        let _ = csv_reader.headers();

        let mut records = csv_reader.into_records();
        let (meta, data_header) = read_hospital_meta(&mut records)?;
        let (layout, format) = HeaderLayout::from_headers(&data_header);

        Ok(CsvReader {
            records,
            layout,
            format,
            meta,
            next_ordinal: 3,
            done: false,
        })
    }

    fn expand_row(&self, record: &StringRecord) -> ChargeRow {
        let mut base = ChargeRow::with_meta(&self.meta, "");
        let get = |col: Option<usize>| col.and_then(|c| record.get(c));

        base.description = get(self.layout.description_col).unwrap_or("").trim().to_string();
        base.setting = get(self.layout.setting_col).and_then(Setting::parse);
        base.gross_charge = opt_numeric(get(self.layout.gross_col));
        base.discounted_cash = opt_numeric(get(self.layout.discounted_col));
        base.min_charge = opt_numeric(get(self.layout.min_col));
        base.max_charge = opt_numeric(get(self.layout.max_col));
        base.modifiers = opt_text(get(self.layout.modifiers_col));
        base.additional_generic_notes = opt_text(get(self.layout.generic_notes_col));
        base.drug_unit_of_measurement = opt_numeric(get(self.layout.drug_unit_col));
        base.drug_type_of_measurement = get(self.layout.drug_type_col)
            .and_then(crate::row::DrugUnitOfMeasurement::parse);
        base.billing_class = opt_text(get(self.layout.billing_class_col));
        base.financial_aid_policy = opt_text(get(self.layout.financial_aid_col));
        base.general_contract_provisions = opt_text(get(self.layout.general_contract_col));

        for &(value_col, type_col) in &self.layout.code_cols {
            let value = record.get(value_col).unwrap_or("").trim();
            let type_str = record.get(type_col).unwrap_or("");
            if value.is_empty() {
                continue;
            }
            if let Some(slot) = CodeSlot::parse(type_str) {
                base.set_code(slot, value);
            }
            // Unknown type strings are ignored: the value
            // is dropped rather than aborting the read.
        }

        match self.format {
            ReaderFormat::Tall => {
                base.payer_name = opt_text(get(self.layout.payer_name_col));
                base.plan_name = opt_text(get(self.layout.plan_name_col));
                base.negotiated_dollar = opt_numeric(get(self.layout.negotiated_dollar_col));
                base.negotiated_percentage =
                    opt_numeric(get(self.layout.negotiated_percentage_col));
                base.negotiated_algorithm = opt_text(get(self.layout.negotiated_algorithm_col));
                base.methodology = get(self.layout.methodology_col).and_then(crate::row::Methodology::parse);
                base.estimated_amount = opt_numeric(get(self.layout.estimated_col));
                base.additional_payer_notes = opt_text(get(self.layout.payer_notes_col));
                base
            }
            _ => base,
        }
    }

    /// Wide-mode expansion: one source row fans out into N `ChargeRow`s, one
    /// per payer/plan group carrying at least one non-null value. Underscores in payer/plan names become spaces, a CMS
    /// encoding convention.
    fn expand_wide_row(&self, record: &StringRecord, base: ChargeRow) -> Vec<ChargeRow> {
        let populated_groups: Vec<&WideGroup> = self
            .layout
            .wide_groups
            .iter()
            .filter(|g| g.any_populated(record))
            .collect();

        if populated_groups.is_empty() {
            return vec![base];
        }

        populated_groups
            .into_iter()
            .map(|group| {
                let mut row = base.clone();
                row.payer_name = Some(group.payer.replace('_', " "));
                row.plan_name = Some(group.plan.replace('_', " "));
                row.negotiated_dollar = opt_numeric(
                    group.dollar_col.and_then(|c| record.get(c)),
                );
                row.negotiated_percentage = opt_numeric(
                    group.percentage_col.and_then(|c| record.get(c)),
                );
                row.negotiated_algorithm =
                    opt_text(group.algorithm_col.and_then(|c| record.get(c)));
                row.methodology = group
                    .methodology_col
                    .and_then(|c| record.get(c))
                    .and_then(crate::row::Methodology::parse);
                row.estimated_amount = opt_numeric(
                    group.estimated_col.and_then(|c| record.get(c)),
                );
                row.additional_payer_notes =
                    opt_text(group.notes_col.and_then(|c| record.get(c)));
                row
            })
            .collect()
    }
}

impl<R: Read> ChargeReader for CsvReader<R> {
    fn next_batch(&mut self) -> Result<NextBatch, ReaderError> {
        if self.done {
            return Ok(NextBatch::End);
        }

        let mut rows = Vec::new();
        let mut consumed = 0;

        while consumed < SOURCE_ROWS_PER_BATCH {
            match self.records.next() {
                None => {
                    self.done = true;
                    break;
                }
                Some(record) => {
                    let record = record?;
                    self.next_ordinal += 1;
                    consumed += 1;

                    let base = self.expand_row(&record);
                    match self.format {
                        ReaderFormat::Wide => rows.extend(self.expand_wide_row(&record, base)),
                        _ => rows.push(base),
                    }
                }
            }
        }

        if rows.is_empty() {
            Ok(NextBatch::End)
        } else {
            Ok(NextBatch::Rows(rows))
        }
    }

    fn format(&self) -> ReaderFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tall_fixture() -> &'static str {
        "hospital_name,last_updated_on,version\n\
         Test General Hospital,2024-01-15,2.0.0\n\
         description,code|1,code|1|type,setting,payer_name,plan_name,standard_charge|gross,standard_charge|discounted_cash,standard_charge|negotiated_dollar,standard_charge|min,standard_charge|max,standard_charge|modifiers\n\
         ECHOCARDIOGRAM,93306,CPT,outpatient,Aetna,PPO,1500,1200,900,500,2000,26 59\n\
         ECHOCARDIOGRAM,93306,CPT,outpatient,UHC,HMO,1500,1200,1100,500,2000,\n\
         HEART TRANSPLANT WITH MCC,001,MS-DRG,inpatient,,,,,,,,26 59\n"
    }

    #[test]
    fn detects_tall_and_expands_one_row_per_payer() {
        let mut reader = CsvReader::from_reader(std::io::Cursor::new(tall_fixture())).unwrap();
        assert_eq!(reader.format(), ReaderFormat::Tall);

        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].payer_name.as_deref(), Some("Aetna"));
        assert_eq!(rows[0].cpt.as_deref(), Some("93306"));
        assert_eq!(rows[0].negotiated_dollar, Some(900.0));
        assert_eq!(rows[0].hospital_name, "Test General Hospital");

        assert_eq!(rows[1].payer_name.as_deref(), Some("UHC"));
        assert_eq!(rows[1].negotiated_dollar, Some(1100.0));

        assert_eq!(rows[2].ms_drg.as_deref(), Some("001"));
        assert_eq!(rows[2].payer_name, None);
        assert_eq!(rows[2].modifiers.as_deref(), Some("26 59"));
    }

    fn wide_fixture() -> &'static str {
        "hospital_name,last_updated_on,version\n\
         Test General Hospital,2024-01-15,2.0.0\n\
         description,code|1,code|1|type,setting,standard_charge|gross,standard_charge|min,standard_charge|max,standard_charge|Aetna|PPO|negotiated_dollar,standard_charge|Aetna|PPO|methodology,standard_charge|UHC|HMO|negotiated_dollar,standard_charge|UHC|HMO|methodology\n\
         X-RAY CHEST,71046,CPT,outpatient,300,100,500,250,fee schedule,275,fee schedule\n\
         MRI BRAIN,70551,CPT,outpatient,2000,800,3000,1200,fee schedule,,\n"
    }

    #[test]
    fn detects_wide_and_skips_empty_payer_groups() {
        let mut reader = CsvReader::from_reader(std::io::Cursor::new(wide_fixture())).unwrap();
        assert_eq!(reader.format(), ReaderFormat::Wide);

        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 3, "expected 2 payers for x-ray + 1 for mri");

        let xray: Vec<_> = rows.iter().filter(|r| r.cpt.as_deref() == Some("71046")).collect();
        assert_eq!(xray.len(), 2);
        assert!(xray.iter().any(|r| r.payer_name.as_deref() == Some("Aetna")));
        assert!(xray.iter().any(|r| r.payer_name.as_deref() == Some("UHC")));

        let mri: Vec<_> = rows.iter().filter(|r| r.cpt.as_deref() == Some("70551")).collect();
        assert_eq!(mri.len(), 1, "UHC group empty for MRI, only Aetna emitted");
        assert_eq!(mri[0].payer_name.as_deref(), Some("Aetna"));
    }

    #[test]
    fn unknown_code_type_is_ignored_not_fatal() {
        let fixture = "hospital_name,last_updated_on,version\n\
             Test,2024-01-01,2.0.0\n\
             description,code|1,code|1|type\n\
             SOMETHING,XYZ,NOT-A-REAL-TYPE\n";
        let mut reader = CsvReader::from_reader(std::io::Cursor::new(fixture)).unwrap();
        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpt, None);
        assert_eq!(rows[0].description, "SOMETHING");
    }
}
