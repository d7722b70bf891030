//! In-network rate converter: streams a rates file's
//! `in_network` array and emits `RateRow`/`ProviderRow` pairs. Provider
//! groups may be inline (`provider_groups`) or indirect
//! (`provider_references`, resolved against the file's top-level
//! `provider_references` array); an optional NPI allowlist trims both.

use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Read;

use crate::error::ReaderError;
use crate::readers::raw_json::JsonCursor;
use crate::types::common::TaxIdType;
use crate::types::in_network::{
    InNetworkRate, NegotiatedRateDetail, ProviderReference as RawProviderReference,
};

const IN_NETWORK_ARRAY_FIELD: &str = "in_network";
const PROVIDER_REFERENCES_FIELD: &str = "provider_references";

/// An optional allowlist of NPIs; when present, provider groups and the rate
/// rows that reference them are trimmed to the intersection.
#[derive(Debug, Clone)]
pub struct NpiAllowlist(HashSet<i64>);

impl NpiAllowlist {
    pub fn new(npis: impl IntoIterator<Item = i64>) -> Self {
        NpiAllowlist(npis.into_iter().collect())
    }

    /// Parses the NPI allowlist JSON shape: an array of
    /// `{"npi": "<digits>"}` objects. The `npi` field is accepted as either
    /// a JSON string or number, matching how CMS disclosures are inconsistent
    /// about quoting NPIs.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ReaderError> {
        #[derive(serde::Deserialize)]
        struct Entry {
            #[serde(deserialize_with = "deserialize_npi")]
            npi: i64,
        }

        fn deserialize_npi<'de, D>(deserializer: D) -> Result<i64, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            #[derive(serde::Deserialize)]
            #[serde(untagged)]
            enum NpiValue {
                Number(i64),
                Text(String),
            }
            match NpiValue::deserialize(deserializer)? {
                NpiValue::Number(n) => Ok(n),
                NpiValue::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            }
        }

        let entries: Vec<Entry> = serde_json::from_slice(bytes)?;
        Ok(NpiAllowlist(entries.into_iter().map(|e| e.npi).collect()))
    }

    fn retain(&self, npis: &[i64]) -> Vec<i64> {
        npis.iter().copied().filter(|n| self.0.contains(n)).collect()
    }
}

/// A resolved provider group: the NPIs (after any allowlist trim) and tax id
/// shared by them. Multi-TIN `provider_references` collapse to the first
/// TIN encountered; this converter's output contract is intentionally brief.
#[derive(Debug, Clone)]
struct ResolvedGroup {
    npi: Vec<i64>,
    tin_type: TaxIdType,
    tin_value: String,
}

impl ResolvedGroup {
    fn from_groups(groups: &[crate::types::common::ProviderGroup]) -> Option<ResolvedGroup> {
        let first = groups.first()?;
        let mut npi = Vec::new();
        for group in groups {
            for n in &group.npi {
                if !npi.contains(n) {
                    npi.push(*n);
                }
            }
        }
        Some(ResolvedGroup {
            npi,
            tin_type: first.tin.id_type.clone(),
            tin_value: first.tin.value.clone(),
        })
    }

    fn trimmed(&self, allowlist: Option<&NpiAllowlist>) -> Option<ResolvedGroup> {
        let npi = match allowlist {
            Some(list) => list.retain(&self.npi),
            None => self.npi.clone(),
        };
        if npi.is_empty() {
            return None;
        }
        Some(ResolvedGroup {
            npi,
            tin_type: self.tin_type.clone(),
            tin_value: self.tin_value.clone(),
        })
    }
}

/// One negotiated price, flattened with its enclosing item's fields and the
/// (post-trim) provider-group ids it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub negotiation_arrangement: String,
    pub name: String,
    pub billing_code_type: String,
    pub billing_code_type_version: String,
    pub billing_code: String,
    pub description: String,
    pub negotiated_type: String,
    pub negotiated_rate: f64,
    pub expiration_date: String,
    pub billing_class: Option<String>,
    /// Pipe-joined surviving provider-group ids, e.g. `"1|2"`.
    pub provider_group_ids: String,
}

/// One NPI's row within a resolved provider group.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRow {
    pub provider_group_id: i64,
    pub npi: i64,
    pub tin_type: String,
    pub tin_value: String,
}

struct ItemContext {
    negotiation_arrangement: String,
    name: String,
    billing_code_type: String,
    billing_code_type_version: String,
    billing_code: String,
    description: String,
}

/// A detail whose `provider_references` couldn't be resolved yet because the
/// file's top-level `provider_references` array hadn't been read. Bounded by
/// the number of indirect-reference details seen before that array appears.
struct PendingDetail {
    item: ItemContext,
    detail: NegotiatedRateDetail,
    reference_ids: Vec<i32>,
}

#[derive(Debug, Default)]
pub struct RatesBatch {
    pub rates: Vec<RateRow>,
    pub providers: Vec<ProviderRow>,
}

/// Single-pass extractor over an in-network rates file. Unlike the primary
/// hospital/TOC readers this does not page its output — §4.6 scopes this
/// pipeline as brief, and the indirect-reference resolution below already
/// requires buffering details until `provider_references` is seen.
pub struct RatesReader<R: Read> {
    cursor: JsonCursor<R>,
    allowlist: Option<NpiAllowlist>,
}

impl<R: Read> RatesReader<R> {
    pub fn from_reader(reader: R, allowlist: Option<NpiAllowlist>) -> Self {
        RatesReader {
            cursor: JsonCursor::new(reader),
            allowlist,
        }
    }

    pub fn extract(&mut self) -> Result<RatesBatch, ReaderError> {
        self.cursor.expect(b'{')?;

        let mut synthetic_counter: i64 = 0;
        let mut providers: HashMap<i64, ResolvedGroup> = HashMap::new();
        let mut reference_ids_seen: HashSet<i32> = HashSet::new();
        let mut reference_map_ready = false;

        let mut rates: Vec<RateRow> = Vec::new();
        let mut provider_rows: Vec<ProviderRow> = Vec::new();
        let mut pending: Vec<PendingDetail> = Vec::new();

        let mut first = true;
        loop {
            if !self.cursor.container_has_next(b'}', &mut first)? {
                break;
            }
            let key = self.cursor.read_key()?;

            if key == IN_NETWORK_ARRAY_FIELD {
                self.cursor.skip_ws()?;
                self.cursor.expect(b'[')?;
                let mut array_first = true;
                while self
                    .cursor
                    .container_has_next(b']', &mut array_first)?
                {
                    let raw = self.cursor.read_value_raw()?;
                    let item: InNetworkRate = serde_json::from_slice(&raw)?;
                    let ctx = ItemContext {
                        negotiation_arrangement: item.negotiation_arrangement.as_str().to_string(),
                        name: item.name.clone(),
                        billing_code_type: item.billing_code_type.as_str().to_string(),
                        billing_code_type_version: item.billing_code_type_version.clone(),
                        billing_code: item.billing_code.clone(),
                        description: item.description.clone(),
                    };
                    for detail in item.negotiated_rates {
                        self.process_detail(
                            &ctx,
                            detail,
                            &mut synthetic_counter,
                            &mut providers,
                            &mut rates,
                            &mut pending,
                            reference_map_ready,
                        )?;
                    }
                }
                continue;
            }

            if key == PROVIDER_REFERENCES_FIELD {
                let raw = self.cursor.read_value_raw()?;
                let refs: Vec<RawProviderReference> = serde_json::from_slice(&raw)?;
                for reference in refs {
                    reference_ids_seen.insert(reference.provider_group_id);
                    if let Some(groups) = &reference.provider_groups {
                        if let Some(resolved) = ResolvedGroup::from_groups(groups) {
                            if let Some(trimmed) = resolved.trimmed(self.allowlist.as_ref()) {
                                providers.insert(reference.provider_group_id as i64, trimmed);
                            }
                        }
                    }
                    // `location`-based external references are not fetched
                    // (out of scope); such ids simply resolve to no group.
                }
                reference_map_ready = true;
                continue;
            }

            // Unrecognized or uninteresting top-level field, discarded.
            self.cursor.read_value_raw()?;
        }

        for pending_detail in pending {
            let ids: Vec<i64> = pending_detail
                .reference_ids
                .iter()
                .filter(|id| providers.contains_key(&(**id as i64)))
                .map(|id| *id as i64)
                .collect();
            emit_rate_rows(&pending_detail.item, &pending_detail.detail, &ids, &mut rates);
        }

        for (&group_id, group) in &providers {
            for npi in &group.npi {
                provider_rows.push(ProviderRow {
                    provider_group_id: group_id,
                    npi: *npi,
                    tin_type: tin_type_str(&group.tin_type).to_string(),
                    tin_value: group.tin_value.clone(),
                });
            }
        }

        Ok(RatesBatch {
            rates,
            providers: provider_rows,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_detail(
        &self,
        ctx: &ItemContext,
        detail: NegotiatedRateDetail,
        synthetic_counter: &mut i64,
        providers: &mut HashMap<i64, ResolvedGroup>,
        rates: &mut Vec<RateRow>,
        pending: &mut Vec<PendingDetail>,
        reference_map_ready: bool,
    ) -> Result<(), ReaderError> {
        if let Some(groups) = &detail.provider_groups {
            let mut ids = Vec::new();
            for group in groups {
                if let Some(resolved) = ResolvedGroup::from_groups(std::slice::from_ref(group)) {
                    if let Some(trimmed) = resolved.trimmed(self.allowlist.as_ref()) {
                        *synthetic_counter -= 1;
                        let id = *synthetic_counter;
                        providers.insert(id, trimmed);
                        ids.push(id);
                    }
                }
            }
            emit_rate_rows(ctx, &detail, &ids, rates);
            return Ok(());
        }

        if let Some(reference_ids) = &detail.provider_references {
            if reference_map_ready {
                let ids: Vec<i64> = reference_ids
                    .iter()
                    .filter(|id| providers.contains_key(&(**id as i64)))
                    .map(|id| *id as i64)
                    .collect();
                emit_rate_rows(ctx, &detail, &ids, rates);
            } else {
                pending.push(PendingDetail {
                    item: ItemContext {
                        negotiation_arrangement: ctx.negotiation_arrangement.clone(),
                        name: ctx.name.clone(),
                        billing_code_type: ctx.billing_code_type.clone(),
                        billing_code_type_version: ctx.billing_code_type_version.clone(),
                        billing_code: ctx.billing_code.clone(),
                        description: ctx.description.clone(),
                    },
                    detail,
                    reference_ids: reference_ids.clone(),
                });
            }
            return Ok(());
        }

        // Neither inline groups nor references: nothing to emit.
        Ok(())
    }
}

fn tin_type_str(t: &TaxIdType) -> &'static str {
    match t {
        TaxIdType::Ein => "ein",
        TaxIdType::Npi => "npi",
    }
}

fn emit_rate_rows(ctx: &ItemContext, detail: &NegotiatedRateDetail, ids: &[i64], out: &mut Vec<RateRow>) {
    if ids.is_empty() {
        return;
    }
    let group_ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("|");
    for price in &detail.negotiated_prices {
        out.push(RateRow {
            negotiation_arrangement: ctx.negotiation_arrangement.clone(),
            name: ctx.name.clone(),
            billing_code_type: ctx.billing_code_type.clone(),
            billing_code_type_version: ctx.billing_code_type_version.clone(),
            billing_code: ctx.billing_code.clone(),
            description: ctx.description.clone(),
            negotiated_type: price.negotiated_type.as_str().to_string(),
            negotiated_rate: price.negotiated_rate,
            expiration_date: price.expiration_date.clone(),
            billing_class: Some(price.billing_class.as_str().to_string()),
            provider_group_ids: group_ids.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fixture_inline() -> &'static str {
        r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "health insurance issuer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2024",
                    "billing_code": "99213",
                    "description": "Established patient office visit",
                    "negotiated_rates": [
                        {
                            "negotiated_prices": [
                                {"negotiated_type": "negotiated", "negotiated_rate": 120.0, "expiration_date": "9999-12-31", "billing_class": "professional"}
                            ],
                            "provider_groups": [
                                {"npi": [1, 2, 3, 4], "tin": {"type": "ein", "value": "11-1111111"}}
                            ]
                        },
                        {
                            "negotiated_prices": [
                                {"negotiated_type": "negotiated", "negotiated_rate": 150.0, "expiration_date": "9999-12-31", "billing_class": "professional"}
                            ],
                            "provider_groups": [
                                {"npi": [5, 6], "tin": {"type": "ein", "value": "22-2222222"}}
                            ]
                        }
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn partial_allowlist_trims_groups_and_drops_empty_rates() {
        let allowlist = NpiAllowlist::new([5, 6]);
        let mut reader = RatesReader::from_reader(Cursor::new(fixture_inline()), Some(allowlist));
        let batch = reader.extract().unwrap();

        assert_eq!(batch.rates.len(), 1);
        assert_eq!(batch.rates[0].negotiated_rate, 150.0);
        assert!(batch.providers.iter().all(|p| p.npi == 5 || p.npi == 6));
        assert_eq!(batch.providers.len(), 2);
    }

    #[test]
    fn no_allowlist_keeps_every_group() {
        let mut reader = RatesReader::from_reader(Cursor::new(fixture_inline()), None);
        let batch = reader.extract().unwrap();
        assert_eq!(batch.rates.len(), 2);
        assert_eq!(batch.providers.len(), 6);
    }

    fn fixture_indirect_after() -> &'static str {
        r#"{
            "reporting_entity_name": "Acme",
            "reporting_entity_type": "health insurance issuer",
            "last_updated_on": "2024-01-01",
            "version": "1.0.0",
            "in_network": [
                {
                    "negotiation_arrangement": "ffs",
                    "name": "Office visit",
                    "billing_code_type": "CPT",
                    "billing_code_type_version": "2024",
                    "billing_code": "99213",
                    "description": "Established patient office visit",
                    "negotiated_rates": [
                        {
                            "negotiated_prices": [
                                {"negotiated_type": "negotiated", "negotiated_rate": 120.0, "expiration_date": "9999-12-31", "billing_class": "professional"}
                            ],
                            "provider_references": [7]
                        }
                    ]
                }
            ],
            "provider_references": [
                {"provider_group_id": 7, "provider_groups": [{"npi": [9, 10], "tin": {"type": "ein", "value": "33-3333333"}}]}
            ]
        }"#
    }

    #[test]
    fn resolves_provider_references_that_appear_after_in_network() {
        let mut reader = RatesReader::from_reader(Cursor::new(fixture_indirect_after()), None);
        let batch = reader.extract().unwrap();
        assert_eq!(batch.rates.len(), 1);
        assert_eq!(batch.rates[0].provider_group_ids, "7");
        assert_eq!(batch.providers.len(), 2);
    }

    #[test]
    fn npi_allowlist_accepts_string_and_numeric_npis() {
        let json = br#"[{"npi": "1234567890"}, {"npi": 9876543210}]"#;
        let allowlist = NpiAllowlist::from_json_slice(json).unwrap();
        assert!(allowlist.0.contains(&1234567890));
        assert!(allowlist.0.contains(&9876543210));
    }
}
