//! Hospital standard-charge JSON reader (v2 and v3 schemas).
//!
//! Streams the `standard_charge_information` array one element at a time via
//! [`super::raw_json::JsonCursor`] rather than parsing the whole document
//! into a `serde_json::Value` tree; peak memory is bounded by one decoded
//! item plus the batch of `ChargeRow`s it expands into.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ReaderError;
use crate::row::{ChargeRow, CodeSlot, DrugUnitOfMeasurement, HospitalMeta, Methodology, Setting};
use crate::util::parse_float;

use super::raw_json::JsonCursor;
use super::{ChargeReader, NextBatch, ReaderFormat};

/// Source array elements consumed per `next_batch()` call.
const SOURCE_ITEMS_PER_BATCH: usize = 256;

const ARRAY_FIELD: &str = "standard_charge_information";

#[derive(Debug, Deserialize)]
struct RawLicense {
    license_number: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAffirmation {
    confirm_affirmation: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawAttestation {
    confirm_attestation: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    code: String,
    #[serde(rename = "type")]
    code_type: String,
}

#[derive(Debug, Deserialize)]
struct RawDrugInfo {
    unit: Option<Value>,
    #[serde(rename = "type")]
    drug_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPayer {
    payer_name: Option<String>,
    plan_name: Option<String>,
    standard_charge_dollar: Option<f64>,
    standard_charge_percentage: Option<f64>,
    standard_charge_algorithm: Option<String>,
    estimated_amount: Option<f64>,
    methodology: Option<String>,
    additional_payer_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChargeEntry {
    setting: Option<String>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    discounted_cash: Option<f64>,
    gross_charge: Option<Value>,
    gross_charges: Option<String>,
    #[serde(default)]
    modifiers: Vec<String>,
    additional_generic_notes: Option<String>,
    payers_information: Option<Vec<RawPayer>>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    description: String,
    #[serde(default)]
    code_information: Vec<RawCode>,
    drug_information: Option<RawDrugInfo>,
    #[serde(default)]
    standard_charges: Vec<RawChargeEntry>,
}

/// Prefers the numeric `gross_charge` (v3); falls back to the permissive
/// `gross_charges` string (v2, thousands-separated).
fn resolve_gross(entry: &RawChargeEntry) -> Option<f64> {
    if let Some(v) = &entry.gross_charge {
        if let Some(n) = v.as_f64() {
            return Some(n);
        }
        if let Some(s) = v.as_str() {
            return parse_float(s);
        }
    }
    entry.gross_charges.as_deref().and_then(parse_float)
}

fn resolve_drug_unit(v: &Option<Value>) -> Option<f64> {
    v.as_ref()
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(parse_float)))
}

fn expand_item(meta: &HospitalMeta, item: RawItem) -> Vec<ChargeRow> {
    let mut base = ChargeRow::with_meta(meta, item.description.clone());

    for code in &item.code_information {
        if let Some(slot) = CodeSlot::parse(&code.code_type) {
            base.set_code(slot, code.code.clone());
        }
        // Unknown type strings are ignored, matching the CSV reader.
    }

    if let Some(drug) = &item.drug_information {
        base.drug_unit_of_measurement = resolve_drug_unit(&drug.unit);
        base.drug_type_of_measurement = drug
            .drug_type
            .as_deref()
            .and_then(DrugUnitOfMeasurement::parse);
    }

    if item.standard_charges.is_empty() {
        return vec![base];
    }

    let mut rows = Vec::with_capacity(item.standard_charges.len());
    for entry in item.standard_charges {
        let mut charge_row = base.clone();
        charge_row.setting = entry.setting.as_deref().and_then(Setting::parse);
        charge_row.min_charge = entry.minimum;
        charge_row.max_charge = entry.maximum;
        charge_row.discounted_cash = entry.discounted_cash;
        charge_row.gross_charge = resolve_gross(&entry);
        charge_row.modifiers = if entry.modifiers.is_empty() {
            None
        } else {
            Some(entry.modifiers.join("|"))
        };
        charge_row.additional_generic_notes = entry.additional_generic_notes;

        match entry.payers_information {
            None => rows.push(charge_row),
            Some(payers) if payers.is_empty() => rows.push(charge_row),
            Some(payers) => {
                for payer in payers {
                    let mut row = charge_row.clone();
                    row.payer_name = payer.payer_name;
                    row.plan_name = payer.plan_name;
                    row.negotiated_dollar = payer.standard_charge_dollar;
                    row.negotiated_percentage = payer.standard_charge_percentage;
                    row.negotiated_algorithm = payer.standard_charge_algorithm;
                    row.estimated_amount = payer.estimated_amount;
                    row.methodology = payer.methodology.as_deref().and_then(Methodology::parse);
                    row.additional_payer_notes = payer.additional_payer_notes;
                    rows.push(row);
                }
            }
        }
    }
    rows
}

/// Streaming JSON reader for hospital standard-charge disclosures.
pub struct JsonReader<R: Read> {
    cursor: JsonCursor<R>,
    format: ReaderFormat,
    meta: HospitalMeta,
    array_first: bool,
    done: bool,
}

impl JsonReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read> JsonReader<R> {
    pub fn from_reader(reader: R) -> Result<Self, ReaderError> {
        let mut cursor = JsonCursor::new(reader);
        cursor.expect(b'{')?;

        let mut meta = HospitalMeta {
            affirmation: true,
            ..Default::default()
        };
        let mut version = String::new();
        let mut locations: Vec<String> = Vec::new();
        let mut addresses: Vec<String> = Vec::new();

        let mut first = true;
        loop {
            if !cursor.container_has_next(b'}', &mut first)? {
                // The array field never appeared; treat as an empty file.
                return Ok(JsonReader {
                    cursor,
                    format: ReaderFormat::Json,
                    meta,
                    array_first: true,
                    done: true,
                });
            }
            let key = cursor.read_key()?;
            if key == ARRAY_FIELD {
                cursor.skip_ws()?;
                cursor.expect(b'[')?;
                break;
            }

            let raw = cursor.read_value_raw()?;
            match key.as_str() {
                "hospital_name" => meta.hospital_name = serde_json::from_slice(&raw)?,
                "last_updated_on" => meta.last_updated_on = serde_json::from_slice(&raw)?,
                "version" => version = serde_json::from_slice(&raw)?,
                "hospital_location" | "location_name" => {
                    let values: Vec<String> = serde_json::from_slice(&raw)?;
                    locations.extend(values);
                }
                "hospital_address" => {
                    let values: Vec<String> = serde_json::from_slice(&raw)?;
                    addresses.extend(values);
                }
                "license_information" => {
                    let license: RawLicense = serde_json::from_slice(&raw)?;
                    meta.license_number = license.license_number;
                    meta.license_state = license.state;
                }
                "affirmation" => {
                    if let Ok(affirmation) = serde_json::from_slice::<RawAffirmation>(&raw) {
                        if let Some(confirmed) = affirmation.confirm_affirmation {
                            meta.affirmation = confirmed;
                        }
                    }
                }
                "attestation" => {
                    if let Ok(attestation) = serde_json::from_slice::<RawAttestation>(&raw) {
                        if let Some(confirmed) = attestation.confirm_attestation {
                            meta.affirmation = confirmed;
                        }
                    }
                }
                _ => {} // unrecognized field, discarded
            }
        }

        if !locations.is_empty() {
            meta.hospital_location = Some(locations.join("; "));
        }
        if !addresses.is_empty() {
            meta.hospital_address = Some(addresses.join("; "));
        }
        meta.version = version.clone();

        let format = if version.starts_with('2') {
            ReaderFormat::JsonV2
        } else if version.starts_with('3') {
            ReaderFormat::JsonV3
        } else {
            ReaderFormat::Json
        };

        Ok(JsonReader {
            cursor,
            format,
            meta,
            array_first: true,
            done: false,
        })
    }
}

impl<R: Read> ChargeReader for JsonReader<R> {
    fn next_batch(&mut self) -> Result<NextBatch, ReaderError> {
        if self.done {
            return Ok(NextBatch::End);
        }

        let mut rows = Vec::new();
        let mut consumed = 0;

        while consumed < SOURCE_ITEMS_PER_BATCH {
            if !self
                .cursor
                .container_has_next(b']', &mut self.array_first)?
            {
                self.done = true;
                break;
            }
            let raw = self.cursor.read_value_raw()?;
            let item: RawItem = serde_json::from_slice(&raw)?;
            rows.extend(expand_item(&self.meta, item));
            consumed += 1;
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
    use std::io::Cursor;

    fn v2_fixture() -> &'static str {
        r#"{
            "hospital_name": "Test General Hospital",
            "last_updated_on": "2024-01-15",
            "version": "2.1.0",
            "hospital_location": ["Main Campus", "East Wing"],
            "hospital_address": ["123 Main St"],
            "license_information": {"license_number": "H12345", "state": "NY"},
            "affirmation": {"confirm_affirmation": true},
            "standard_charge_information": [
                {
                    "description": "ECHOCARDIOGRAM",
                    "code_information": [{"code": "93306", "type": "CPT"}],
                    "standard_charges": [
                        {
                            "setting": "outpatient",
                            "minimum": 500,
                            "maximum": 2000,
                            "discounted_cash": 1200,
                            "gross_charges": "1,500.00",
                            "modifiers": ["26", "59"],
                            "payers_information": [
                                {"payer_name": "Aetna", "plan_name": "PPO", "standard_charge_dollar": 900, "methodology": "fee schedule"},
                                {"payer_name": "UHC", "plan_name": "HMO", "standard_charge_dollar": 1100}
                            ]
                        }
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn detects_v2_and_parses_gross_charges_string() {
        let mut reader = JsonReader::from_reader(Cursor::new(v2_fixture())).unwrap();
        assert_eq!(reader.format(), ReaderFormat::JsonV2);

        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gross_charge, Some(1500.0));
        assert_eq!(rows[0].cpt.as_deref(), Some("93306"));
        assert_eq!(rows[0].payer_name.as_deref(), Some("Aetna"));
        assert_eq!(rows[0].negotiated_dollar, Some(900.0));
        assert_eq!(rows[0].modifiers.as_deref(), Some("26|59"));
        assert_eq!(
            rows[0].hospital_location.as_deref(),
            Some("Main Campus; East Wing")
        );
        assert_eq!(rows[1].payer_name.as_deref(), Some("UHC"));
    }

    fn v3_fixture() -> &'static str {
        r#"{
            "hospital_name": "Test General Hospital",
            "last_updated_on": "2024-06-01",
            "version": "3.0.0",
            "location_name": ["Main Campus"],
            "attestation": {"confirm_attestation": true},
            "standard_charge_information": [
                {
                    "description": "MRI BRAIN",
                    "code_information": [{"code": "70551", "type": "CPT"}],
                    "standard_charges": [
                        {"setting": "outpatient", "gross_charge": 3500, "payers_information": []}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn detects_v3_and_prefers_numeric_gross() {
        let mut reader = JsonReader::from_reader(Cursor::new(v3_fixture())).unwrap();
        assert_eq!(reader.format(), ReaderFormat::JsonV3);

        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gross_charge, Some(3500.0));
        assert_eq!(rows[0].payer_name, None);
    }

    #[test]
    fn item_with_no_standard_charges_still_emits_base_row() {
        let fixture = r#"{
            "version": "2.0.0",
            "standard_charge_information": [
                {"description": "SOMETHING", "code_information": []}
            ]
        }"#;
        let mut reader = JsonReader::from_reader(Cursor::new(fixture)).unwrap();
        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "SOMETHING");
    }
}
