//! The canonical denormalized record shared by every reader and the columnar writer.
//!
//! One [`ChargeRow`] = one item x one charge variant x one payer/plan (or item x
//! charge variant when the source carried no payer data). Field order mirrors
//! the on-disk column order described in the data model: identification, the
//! nineteen dedicated code columns, payer/plan, charges, algorithm/methodology,
//! drug fields, modifiers/notes, then hospital metadata and affirmation.

use serde::{Deserialize, Serialize};

/// The setting a standard charge applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Setting {
    Inpatient,
    Outpatient,
    Both,
}

impl Setting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Setting::Inpatient => "inpatient",
            Setting::Outpatient => "outpatient",
            Setting::Both => "both",
        }
    }

    /// Parses the free-text setting values CMS disclosures actually carry.
    /// Unrecognized values fall back to `None` rather than erroring; a
    /// missing setting is a value-coercion issue, not a
    /// structural one.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "inpatient" => Some(Setting::Inpatient),
            "outpatient" => Some(Setting::Outpatient),
            "both" => Some(Setting::Both),
            _ => None,
        }
    }
}

/// Negotiated-rate methodology, as disclosed under `standard_charge|methodology`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    CaseRate,
    FeeSchedule,
    PercentOfTotalBilledCharges,
    PerDiem,
    Other,
}

impl Methodology {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "case rate" | "case_rate" => Some(Methodology::CaseRate),
            "fee schedule" | "fee_schedule" => Some(Methodology::FeeSchedule),
            "percent of total billed charges" | "percentage of total billed charges"
            | "percent_of_total_billed_charges" => Some(Methodology::PercentOfTotalBilledCharges),
            "per diem" | "per_diem" => Some(Methodology::PerDiem),
            "other" => Some(Methodology::Other),
            _ => None,
        }
    }
}

/// Unit the drug quantity is expressed in (NCPDP billing units).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DrugUnitOfMeasurement {
    #[serde(rename = "GR")]
    Gr,
    #[serde(rename = "ME")]
    Me,
    #[serde(rename = "ML")]
    Ml,
    #[serde(rename = "UN")]
    Un,
    #[serde(rename = "F2")]
    F2,
    #[serde(rename = "EA")]
    Ea,
    #[serde(rename = "GM")]
    Gm,
}

impl DrugUnitOfMeasurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrugUnitOfMeasurement::Gr => "GR",
            DrugUnitOfMeasurement::Me => "ME",
            DrugUnitOfMeasurement::Ml => "ML",
            DrugUnitOfMeasurement::Un => "UN",
            DrugUnitOfMeasurement::F2 => "F2",
            DrugUnitOfMeasurement::Ea => "EA",
            DrugUnitOfMeasurement::Gm => "GM",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "GR" => Some(Self::Gr),
            "ME" => Some(Self::Me),
            "ML" => Some(Self::Ml),
            "UN" => Some(Self::Un),
            "F2" => Some(Self::F2),
            "EA" => Some(Self::Ea),
            "GM" => Some(Self::Gm),
            _ => None,
        }
    }
}

/// The nineteen dedicated billing-code slots a `code|N|type` column can route to.
///
/// This is deliberately a separate enum from `types::common::BillingCodeType`:
/// that one models the Transparency-in-Coverage MRF vocabulary, this one
/// models the hospital standard-charge disclosure vocabulary. They overlap
/// (`CPT`, `HCPCS`, ...) but neither is a subset of the other (this one adds
/// `DRG`, `CDM`, `TRIS-DRG`; the MRF one adds `CSTM-ALL`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodeSlot {
    Cpt,
    Hcpcs,
    MsDrg,
    Ndc,
    Rc,
    Icd,
    Drg,
    Cdm,
    Local,
    Apc,
    Eapg,
    Hipps,
    Cdt,
    RDrg,
    SDrg,
    ApsDrg,
    ApDrg,
    AprDrg,
    TrisDrg,
}

impl CodeSlot {
    /// Canonical ordering used by `collect_codes` and the item key, matching
    /// the column order in the data model table.
    pub const ORDER: [CodeSlot; 19] = [
        CodeSlot::Cpt,
        CodeSlot::Hcpcs,
        CodeSlot::MsDrg,
        CodeSlot::Ndc,
        CodeSlot::Rc,
        CodeSlot::Icd,
        CodeSlot::Drg,
        CodeSlot::Cdm,
        CodeSlot::Local,
        CodeSlot::Apc,
        CodeSlot::Eapg,
        CodeSlot::Hipps,
        CodeSlot::Cdt,
        CodeSlot::RDrg,
        CodeSlot::SDrg,
        CodeSlot::ApsDrg,
        CodeSlot::ApDrg,
        CodeSlot::AprDrg,
        CodeSlot::TrisDrg,
    ];

    /// Recognizes a `code|N|type` cell value or a JSON `{"type": ...}` value.
    /// Unknown type strings return `None`, matching §4.1.2 ("unknown type
    /// strings are ignored").
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CPT" => Some(Self::Cpt),
            "HCPCS" => Some(Self::Hcpcs),
            "MS-DRG" | "MS_DRG" | "MSDRG" => Some(Self::MsDrg),
            "NDC" => Some(Self::Ndc),
            "RC" => Some(Self::Rc),
            "ICD" => Some(Self::Icd),
            "DRG" => Some(Self::Drg),
            "CDM" => Some(Self::Cdm),
            "LOCAL" => Some(Self::Local),
            "APC" => Some(Self::Apc),
            "EAPG" => Some(Self::Eapg),
            "HIPPS" => Some(Self::Hipps),
            "CDT" => Some(Self::Cdt),
            "R-DRG" | "R_DRG" | "RDRG" => Some(Self::RDrg),
            "S-DRG" | "S_DRG" | "SDRG" => Some(Self::SDrg),
            "APS-DRG" | "APS_DRG" | "APSDRG" => Some(Self::ApsDrg),
            "AP-DRG" | "AP_DRG" | "APDRG" => Some(Self::ApDrg),
            "APR-DRG" | "APR_DRG" | "APRDRG" => Some(Self::AprDrg),
            "TRIS-DRG" | "TRIS_DRG" | "TRISDRG" => Some(Self::TrisDrg),
            _ => None,
        }
    }

    /// The type string as it appears in the item key and in column names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpt => "cpt",
            Self::Hcpcs => "hcpcs",
            Self::MsDrg => "ms_drg",
            Self::Ndc => "ndc",
            Self::Rc => "rc",
            Self::Icd => "icd",
            Self::Drg => "drg",
            Self::Cdm => "cdm",
            Self::Local => "local",
            Self::Apc => "apc",
            Self::Eapg => "eapg",
            Self::Hipps => "hipps",
            Self::Cdt => "cdt",
            Self::RDrg => "r_drg",
            Self::SDrg => "s_drg",
            Self::ApsDrg => "aps_drg",
            Self::ApDrg => "ap_drg",
            Self::AprDrg => "apr_drg",
            Self::TrisDrg => "tris_drg",
        }
    }
}

/// Hospital metadata identical across every row produced from one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HospitalMeta {
    pub hospital_name: String,
    pub last_updated_on: String,
    pub version: String,
    pub hospital_location: Option<String>,
    pub hospital_address: Option<String>,
    pub license_number: Option<String>,
    pub license_state: Option<String>,
    pub affirmation: bool,
}

/// The canonical denormalized record. See module docs for field-order rationale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargeRow {
    // Identification
    pub description: String,
    pub setting: Option<Setting>,

    // 19 dedicated code columns
    pub cpt: Option<String>,
    pub hcpcs: Option<String>,
    pub ms_drg: Option<String>,
    pub ndc: Option<String>,
    pub rc: Option<String>,
    pub icd: Option<String>,
    pub drg: Option<String>,
    pub cdm: Option<String>,
    pub local: Option<String>,
    pub apc: Option<String>,
    pub eapg: Option<String>,
    pub hipps: Option<String>,
    pub cdt: Option<String>,
    pub r_drg: Option<String>,
    pub s_drg: Option<String>,
    pub aps_drg: Option<String>,
    pub ap_drg: Option<String>,
    pub apr_drg: Option<String>,
    pub tris_drg: Option<String>,

    // Payer
    pub payer_name: Option<String>,
    pub plan_name: Option<String>,

    // Charges
    pub gross_charge: Option<f64>,
    pub discounted_cash: Option<f64>,
    pub negotiated_dollar: Option<f64>,
    pub negotiated_percentage: Option<f64>,
    pub estimated_amount: Option<f64>,
    pub min_charge: Option<f64>,
    pub max_charge: Option<f64>,

    // Algorithm / methodology
    pub negotiated_algorithm: Option<String>,
    pub methodology: Option<Methodology>,

    // Drug
    pub drug_unit_of_measurement: Option<f64>,
    pub drug_type_of_measurement: Option<DrugUnitOfMeasurement>,

    // Modifiers / notes
    pub modifiers: Option<String>,
    pub additional_generic_notes: Option<String>,
    pub additional_payer_notes: Option<String>,

    // v2.1+
    pub billing_class: Option<String>,
    pub financial_aid_policy: Option<String>,
    pub general_contract_provisions: Option<String>,

    // Hospital metadata (identical across every row from one source file)
    pub hospital_name: String,
    pub last_updated_on: String,
    pub version: String,
    pub hospital_location: Option<String>,
    pub hospital_address: Option<String>,
    pub license_number: Option<String>,
    pub license_state: Option<String>,

    // Affirmation
    pub affirmation: bool,
}

impl ChargeRow {
    /// Builds a row carrying only hospital metadata and description; callers
    /// fill in the charge-variant fields before emitting it.
    pub fn with_meta(meta: &HospitalMeta, description: impl Into<String>) -> Self {
        ChargeRow {
            description: description.into(),
            hospital_name: meta.hospital_name.clone(),
            last_updated_on: meta.last_updated_on.clone(),
            version: meta.version.clone(),
            hospital_location: meta.hospital_location.clone(),
            hospital_address: meta.hospital_address.clone(),
            license_number: meta.license_number.clone(),
            license_state: meta.license_state.clone(),
            affirmation: meta.affirmation,
            ..Default::default()
        }
    }

    /// Sets the dedicated column for `slot` to `value`, leaving the other 18
    /// code columns untouched. This is the builder half of the polymorphic
    /// code-column dispatch.
    pub fn set_code(&mut self, slot: CodeSlot, value: impl Into<String>) {
        let value = value.into();
        match slot {
            CodeSlot::Cpt => self.cpt = Some(value),
            CodeSlot::Hcpcs => self.hcpcs = Some(value),
            CodeSlot::MsDrg => self.ms_drg = Some(value),
            CodeSlot::Ndc => self.ndc = Some(value),
            CodeSlot::Rc => self.rc = Some(value),
            CodeSlot::Icd => self.icd = Some(value),
            CodeSlot::Drg => self.drg = Some(value),
            CodeSlot::Cdm => self.cdm = Some(value),
            CodeSlot::Local => self.local = Some(value),
            CodeSlot::Apc => self.apc = Some(value),
            CodeSlot::Eapg => self.eapg = Some(value),
            CodeSlot::Hipps => self.hipps = Some(value),
            CodeSlot::Cdt => self.cdt = Some(value),
            CodeSlot::RDrg => self.r_drg = Some(value),
            CodeSlot::SDrg => self.s_drg = Some(value),
            CodeSlot::ApsDrg => self.aps_drg = Some(value),
            CodeSlot::ApDrg => self.ap_drg = Some(value),
            CodeSlot::AprDrg => self.apr_drg = Some(value),
            CodeSlot::TrisDrg => self.tris_drg = Some(value),
        }
    }

    /// Reads the dedicated column for `slot`, or "not set" (`None`) if the
    /// row never populated it.
    pub fn get_code(&self, slot: CodeSlot) -> Option<&str> {
        match slot {
            CodeSlot::Cpt => self.cpt.as_deref(),
            CodeSlot::Hcpcs => self.hcpcs.as_deref(),
            CodeSlot::MsDrg => self.ms_drg.as_deref(),
            CodeSlot::Ndc => self.ndc.as_deref(),
            CodeSlot::Rc => self.rc.as_deref(),
            CodeSlot::Icd => self.icd.as_deref(),
            CodeSlot::Drg => self.drg.as_deref(),
            CodeSlot::Cdm => self.cdm.as_deref(),
            CodeSlot::Local => self.local.as_deref(),
            CodeSlot::Apc => self.apc.as_deref(),
            CodeSlot::Eapg => self.eapg.as_deref(),
            CodeSlot::Hipps => self.hipps.as_deref(),
            CodeSlot::Cdt => self.cdt.as_deref(),
            CodeSlot::RDrg => self.r_drg.as_deref(),
            CodeSlot::SDrg => self.s_drg.as_deref(),
            CodeSlot::ApsDrg => self.aps_drg.as_deref(),
            CodeSlot::ApDrg => self.ap_drg.as_deref(),
            CodeSlot::AprDrg => self.apr_drg.as_deref(),
            CodeSlot::TrisDrg => self.tris_drg.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_slot_parse_is_case_insensitive_and_accepts_hospital_vocabulary() {
        assert_eq!(CodeSlot::parse("ms-drg"), Some(CodeSlot::MsDrg));
        assert_eq!(CodeSlot::parse("MS_DRG"), Some(CodeSlot::MsDrg));
        assert_eq!(CodeSlot::parse("cdm"), Some(CodeSlot::Cdm));
        assert_eq!(CodeSlot::parse("tris-drg"), Some(CodeSlot::TrisDrg));
        assert_eq!(CodeSlot::parse("not-a-real-code-type"), None);
    }

    #[test]
    fn set_code_and_get_code_round_trip_without_touching_siblings() {
        let mut row = ChargeRow::default();
        row.set_code(CodeSlot::Cpt, "93306");
        row.set_code(CodeSlot::Ndc, "00456-0422-01");

        assert_eq!(row.get_code(CodeSlot::Cpt), Some("93306"));
        assert_eq!(row.get_code(CodeSlot::Ndc), Some("00456-0422-01"));
        assert_eq!(row.get_code(CodeSlot::Hcpcs), None);
        assert_eq!(row.get_code(CodeSlot::MsDrg), None);
    }

    #[test]
    fn setting_parse_is_case_insensitive() {
        assert_eq!(Setting::parse("Outpatient"), Some(Setting::Outpatient));
        assert_eq!(Setting::parse(" both "), Some(Setting::Both));
        assert_eq!(Setting::parse("garbage"), None);
    }
}
