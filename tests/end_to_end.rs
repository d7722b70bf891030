//! End-to-end exercises of the public API against small in-memory and
//! `tempfile`-backed fixtures, mirroring the MRF crate's
//! `tests/parse_real_file.rs` convention of asserting on the fully decoded
//! shape rather than just "it didn't error".

use std::io::Cursor;

use chargefile_rs::columnar::{ChargeRowReader, ChargeRowWriter};
use chargefile_rs::readers::csv::CsvReader;
use chargefile_rs::readers::json::JsonReader;
use chargefile_rs::readers::{ChargeReader, ReaderFormat};
use chargefile_rs::rates::{NpiAllowlist, RatesReader};
use chargefile_rs::toc::{TocFilter, TocReader};
use chargefile_rs::types::common::MarketType;

fn tall_csv_with_drug_row() -> &'static str {
    "hospital_name,last_updated_on,version\n\
     Riverside Medical Center,2024-03-01,2.1.0\n\
     description,code|1,code|1|type,setting,payer_name,plan_name,standard_charge|gross,standard_charge|negotiated_dollar,standard_charge|min,standard_charge|max,drug_unit_of_measurement,drug_type_of_measurement\n\
     ALBUTEROL 0.083% INHALATION SOLUTION,00456-0422-01,NDC,outpatient,Aetna,PPO,45.00,32.00,20.00,60.00,3,ML\n"
}

/// End-to-end scenario: a Tall CSV row that carries a drug unit/type pair
/// survives the reader -> columnar writer -> columnar reader round trip
/// with every field intact, including the drug fields that only a handful
/// of code paths touch.
#[test]
fn tall_csv_drug_row_round_trips_through_the_columnar_store() {
    let mut reader = CsvReader::from_reader(Cursor::new(tall_csv_with_drug_row())).unwrap();
    assert_eq!(reader.format(), ReaderFormat::Tall);
    let rows = reader.read_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ndc.as_deref(), Some("00456-0422-01"));
    assert_eq!(rows[0].drug_unit_of_measurement, Some(3.0));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("riverside.parquet");

    let mut writer = ChargeRowWriter::create(&path).unwrap();
    writer.write(&rows).unwrap();
    let written = writer.close().unwrap();
    assert_eq!(written, 1);

    let mut columnar_reader = ChargeRowReader::open(&path).unwrap();
    let page = columnar_reader.next_page().unwrap().unwrap();
    assert_eq!(page, rows);
    assert!(columnar_reader.next_page().is_none());
}

fn wide_csv_with_missing_payer_data() -> &'static str {
    "hospital_name,last_updated_on,version\n\
     Lakeside Hospital,2024-02-15,2.1.0\n\
     description,code|1,code|1|type,setting,standard_charge|gross,standard_charge|min,standard_charge|max,standard_charge|UnitedHealthcare|Choice Plus|negotiated_dollar,standard_charge|UnitedHealthcare|Choice Plus|methodology\n\
     COLONOSCOPY,45378,CPT,outpatient,2200,900,3500,,\n"
}

/// End-to-end scenario: a Wide CSV row where the only configured payer
/// column group is entirely blank emits zero payer rows rather than one
/// row with empty strings standing in for nulls.
#[test]
fn wide_csv_with_no_populated_payer_group_emits_base_row_only() {
    let mut reader = CsvReader::from_reader(Cursor::new(wide_csv_with_missing_payer_data())).unwrap();
    assert_eq!(reader.format(), ReaderFormat::Wide);
    let rows = reader.read_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payer_name, None);
    assert_eq!(rows[0].gross_charge, Some(2200.0));
}

fn json_v3_with_gross_charge_and_payer_fanout() -> &'static str {
    r#"{
        "hospital_name": "Lakeside Hospital",
        "last_updated_on": "2024-05-01",
        "version": "3.0.0",
        "standard_charge_information": [
            {
                "description": "EMERGENCY ROOM VISIT, LEVEL 4",
                "code_information": [{"code": "99284", "type": "CPT"}],
                "standard_charges": [
                    {
                        "setting": "outpatient",
                        "gross_charge": 4200,
                        "minimum": 1800,
                        "maximum": 6000,
                        "payers_information": [
                            {"payer_name": "Cigna", "plan_name": "Open Access Plus", "standard_charge_dollar": 2600, "methodology": "case rate"},
                            {"payer_name": "Humana", "plan_name": "HMO", "standard_charge_dollar": 2450, "methodology": "fee schedule"}
                        ]
                    }
                ]
            }
        ]
    }"#
}

/// End-to-end scenario: v3 numeric `gross_charge` takes precedence and a
/// single charge entry fans out into one row per payer.
#[test]
fn json_v3_fans_out_one_row_per_payer() {
    let mut reader =
        JsonReader::from_reader(Cursor::new(json_v3_with_gross_charge_and_payer_fanout())).unwrap();
    assert_eq!(reader.format(), ReaderFormat::JsonV3);
    let rows = reader.read_all().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.gross_charge == Some(4200.0)));
    assert!(rows.iter().any(|r| r.payer_name.as_deref() == Some("Cigna")));
    assert!(rows.iter().any(|r| r.payer_name.as_deref() == Some("Humana")));
}

fn toc_fixture_multi_state() -> &'static str {
    r#"{
        "reporting_entity_name": "Acme Health",
        "reporting_entity_type": "health insurance issuer",
        "reporting_structure": [
            {
                "reporting_plans": [
                    {"plan_name": "Acme NY PPO", "plan_id_type": "HIOS", "plan_id": "99999NY004", "plan_market_type": "individual"}
                ],
                "in_network_files": [
                    {"description": "rates", "location": "https://example.com/ny-individual.json"}
                ]
            },
            {
                "reporting_plans": [
                    {"plan_name": "Acme TX PPO", "plan_id_type": "HIOS", "plan_id": "99999TX004", "plan_market_type": "individual"}
                ],
                "in_network_files": [
                    {"description": "rates", "location": "https://example.com/tx-individual.json"}
                ]
            },
            {
                "reporting_plans": [
                    {"plan_name": "Acme NY Group", "plan_id_type": "HIOS", "plan_id": "99999NY005", "plan_market_type": "group"}
                ],
                "in_network_files": [
                    {"description": "rates", "location": "https://example.com/ny-group.json"}
                ]
            }
        ]
    }"#
}

/// End-to-end scenario: combining the HIOS-state filter with a market-type
/// filter narrows a multi-state, multi-market TOC down to exactly the
/// individual NY plan.
#[test]
fn toc_reader_combines_hios_state_and_market_type_filters() {
    let filter = TocFilter {
        market_type: Some(MarketType::Individual),
        use_hios_state: true,
        state_code: Some("NY".to_string()),
        use_keywords: false,
        keywords: Vec::new(),
    };
    let mut reader = TocReader::from_reader(Cursor::new(toc_fixture_multi_state()), filter).unwrap();
    let batch = reader.read_all().unwrap();
    assert_eq!(batch.plans.len(), 1);
    assert_eq!(batch.plans[0].plan_name, "Acme NY PPO");
    assert_eq!(batch.urls.len(), 1);
    assert_eq!(batch.urls[0].url, "https://example.com/ny-individual.json");
}

fn rates_fixture_four_providers() -> &'static str {
    r#"{
        "reporting_entity_name": "Acme",
        "reporting_entity_type": "health insurance issuer",
        "last_updated_on": "2024-01-01",
        "version": "1.0.0",
        "in_network": [
            {
                "negotiation_arrangement": "ffs",
                "name": "MRI, brain, without contrast",
                "billing_code_type": "CPT",
                "billing_code_type_version": "2024",
                "billing_code": "70551",
                "description": "MRI brain without contrast",
                "negotiated_rates": [
                    {
                        "negotiated_prices": [
                            {"negotiated_type": "negotiated", "negotiated_rate": 850.0, "expiration_date": "9999-12-31", "billing_class": "institutional"}
                        ],
                        "provider_groups": [
                            {"npi": [1111111111, 2222222222], "tin": {"type": "ein", "value": "11-1111111"}}
                        ]
                    },
                    {
                        "negotiated_prices": [
                            {"negotiated_type": "negotiated", "negotiated_rate": 920.0, "expiration_date": "9999-12-31", "billing_class": "institutional"}
                        ],
                        "provider_groups": [
                            {"npi": [3333333333, 4444444444], "tin": {"type": "ein", "value": "22-2222222"}}
                        ]
                    }
                ]
            }
        ]
    }"#
}

/// End-to-end scenario: an allowlist naming only two of four NPIs (parsed
/// from the on-disk JSON shape, not constructed in-process) trims the
/// provider set and drops the rate group that has no surviving NPI.
#[test]
fn rates_pipeline_trims_to_allowlisted_npis_loaded_from_json() {
    let allowlist_json = br#"[{"npi": "3333333333"}, {"npi": 4444444444}]"#;
    let allowlist = NpiAllowlist::from_json_slice(allowlist_json).unwrap();

    let mut reader = RatesReader::from_reader(Cursor::new(rates_fixture_four_providers()), Some(allowlist));
    let batch = reader.extract().unwrap();

    assert_eq!(batch.rates.len(), 1);
    assert_eq!(batch.rates[0].negotiated_rate, 920.0);
    assert_eq!(batch.providers.len(), 2);
    assert!(batch.providers.iter().all(|p| p.npi == 3333333333 || p.npi == 4444444444));
}
