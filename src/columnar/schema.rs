//! Arrow schema for the [`ChargeRow`](crate::row::ChargeRow) columnar file:
//! one column per field, ordered to match the row model so the on-disk
//! layout mirrors the in-memory one.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

fn utf8(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Utf8, nullable)
}

fn float64(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Float64, nullable)
}

/// Builds the Arrow schema for a charge-row columnar file. Field order
/// matches `ChargeRow`'s declaration order (identification, 19 code columns,
/// payer, charges, algorithm/methodology, drug, modifiers/notes, v2.1+
/// fields, hospital metadata, affirmation).
pub fn charge_row_schema() -> SchemaRef {
    let fields = vec![
        utf8("description", false),
        utf8("setting", true),
        utf8("cpt", true),
        utf8("hcpcs", true),
        utf8("ms_drg", true),
        utf8("ndc", true),
        utf8("rc", true),
        utf8("icd", true),
        utf8("drg", true),
        utf8("cdm", true),
        utf8("local", true),
        utf8("apc", true),
        utf8("eapg", true),
        utf8("hipps", true),
        utf8("cdt", true),
        utf8("r_drg", true),
        utf8("s_drg", true),
        utf8("aps_drg", true),
        utf8("ap_drg", true),
        utf8("apr_drg", true),
        utf8("tris_drg", true),
        utf8("payer_name", true),
        utf8("plan_name", true),
        float64("gross_charge", true),
        float64("discounted_cash", true),
        float64("negotiated_dollar", true),
        float64("negotiated_percentage", true),
        float64("estimated_amount", true),
        float64("min_charge", true),
        float64("max_charge", true),
        utf8("negotiated_algorithm", true),
        utf8("methodology", true),
        float64("drug_unit_of_measurement", true),
        utf8("drug_type_of_measurement", true),
        utf8("modifiers", true),
        utf8("additional_generic_notes", true),
        utf8("additional_payer_notes", true),
        utf8("billing_class", true),
        utf8("financial_aid_policy", true),
        utf8("general_contract_provisions", true),
        utf8("hospital_name", false),
        utf8("last_updated_on", false),
        utf8("version", false),
        utf8("hospital_location", true),
        utf8("hospital_address", true),
        utf8("license_number", true),
        utf8("license_state", true),
        Field::new("affirmation", DataType::Boolean, false),
    ];
    Arc::new(Schema::new(fields))
}

/// Schema for the plan/URL decomposition sibling files written by the TOC
/// extractor: one schema per side of the pair.
pub fn toc_plans_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("reporting_structure_id", DataType::UInt64, false),
        utf8("plan_name", false),
        utf8("plan_id", true),
        utf8("plan_id_type", true),
        utf8("plan_market_type", true),
        utf8("issuer_name", true),
        utf8("description", true),
    ]))
}

pub fn toc_urls_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("reporting_structure_id", DataType::UInt64, false),
        utf8("url", false),
    ]))
}

/// Schema for the in-network rate converter's rate-row file.
pub fn rate_row_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        utf8("negotiation_arrangement", false),
        utf8("name", false),
        utf8("billing_code_type", false),
        utf8("billing_code_type_version", false),
        utf8("billing_code", false),
        utf8("description", false),
        utf8("negotiated_type", false),
        float64("negotiated_rate", false),
        utf8("expiration_date", false),
        utf8("billing_class", true),
        // Pipe-joined provider-group ids this negotiated price applies to,
        // after NPI-allowlist trimming.
        utf8("provider_group_ids", false),
    ]))
}

/// Schema for the in-network rate converter's provider-row file.
pub fn provider_row_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("provider_group_id", DataType::Int64, false),
        Field::new("npi", DataType::Int64, false),
        utf8("tin_type", false),
        utf8("tin_value", false),
    ]))
}
