//! Table-of-Contents plan extractor: a streaming reader over multi-gigabyte
//! plan-catalog files that filters plans by market type, HIOS state, and
//! keyword, and emits a normalized (plans, urls) pair keyed by an
//! auto-incrementing `reporting_structure_id`.

use std::io::Read;

use serde::Deserialize;

use crate::error::ReaderError;
use crate::readers::raw_json::JsonCursor;
use crate::readers::READ_BUFFER_CAPACITY;
use crate::types::common::{MarketType, PlanIdType};
use crate::types::table_of_contents::{FileLocation, ReportingPlan};

const STRUCTURE_ARRAY_FIELD: &str = "reporting_structure";

/// Keywords matched against lowercased plan/issuer/sponsor names when the
/// keyword filter is enabled and the caller supplies none of its own.
pub const DEFAULT_KEYWORDS: &[&str] = &["medical", "health", "ppo", "hmo", "epo", "pos"];

/// One matched plan, ready to be written to the plans table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub structure_id: u64,
    pub plan_name: String,
    pub plan_id: Option<String>,
    pub plan_id_type: PlanIdType,
    pub plan_market_type: MarketType,
    pub issuer_name: Option<String>,
    pub description: Option<String>,
}

/// One distinct in-network URL for a matched structure.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlRow {
    pub structure_id: u64,
    pub url: String,
}

/// The composite market/HIOS-state/keyword filter predicate.
#[derive(Debug, Clone)]
pub struct TocFilter {
    pub market_type: Option<MarketType>,
    pub use_hios_state: bool,
    pub state_code: Option<String>,
    pub use_keywords: bool,
    pub keywords: Vec<String>,
}

impl Default for TocFilter {
    fn default() -> Self {
        TocFilter {
            market_type: None,
            use_hios_state: false,
            state_code: None,
            use_keywords: false,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TocFilter {
    /// `true` when every filter knob is off — every plan matches.
    fn is_unfiltered(&self) -> bool {
        self.market_type.is_none() && !self.use_hios_state && !self.use_keywords
    }

    pub fn matches(&self, plan: &ReportingPlan) -> bool {
        if self.is_unfiltered() {
            return true;
        }

        if let Some(want) = &self.market_type {
            if &plan.plan_market_type != want {
                return false;
            }
        }

        if !self.use_hios_state && !self.use_keywords {
            // market_type was the only active knob and it already passed.
            return true;
        }

        let hios_pass = self.use_hios_state
            && matches!(plan.plan_id_type, PlanIdType::Hios)
            && self.hios_state_matches(plan);
        let keyword_pass = self.use_keywords && self.keyword_matches(plan);
        hios_pass || keyword_pass
    }

    fn hios_state_matches(&self, plan: &ReportingPlan) -> bool {
        let Some(state) = &self.state_code else {
            return false;
        };
        let slice = plan.plan_id.get(5..7).unwrap_or_default();
        slice.eq_ignore_ascii_case(state)
    }

    fn keyword_matches(&self, plan: &ReportingPlan) -> bool {
        let haystack = [
            Some(plan.plan_name.as_str()),
            plan.issuer_name.as_deref(),
            plan.plan_sponsor_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

        self.keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawReportingStructure {
    #[serde(default)]
    reporting_plans: Vec<ReportingPlan>,
    #[serde(default)]
    in_network_files: Option<Vec<FileLocation>>,
    #[serde(default)]
    allowed_amount_file: Option<FileLocation>,
}

/// One page of extraction output.
#[derive(Debug, Default)]
pub struct TocBatch {
    pub plans: Vec<PlanRow>,
    pub urls: Vec<UrlRow>,
}

/// Streaming reader over a TOC file's `reporting_structure` array.
///
/// Decodes one structure at a time via [`JsonCursor::read_value_raw`], so
/// peak memory is bounded by a single structure's plans and file list —
/// never the whole document.
pub struct TocReader<R: Read> {
    cursor: JsonCursor<R>,
    filter: TocFilter,
    array_first: bool,
    done: bool,
    next_structure_id: u64,
}

impl<R: Read> TocReader<R> {
    pub fn from_reader(reader: R, filter: TocFilter) -> Result<Self, ReaderError> {
        let mut cursor = JsonCursor::new(reader);
        cursor.expect(b'{')?;

        let mut first = true;
        loop {
            if !cursor.container_has_next(b'}', &mut first)? {
                return Ok(TocReader {
                    cursor,
                    filter,
                    array_first: true,
                    done: true,
                    next_structure_id: 1,
                });
            }
            let key = cursor.read_key()?;
            if key == STRUCTURE_ARRAY_FIELD {
                cursor.skip_ws()?;
                cursor.expect(b'[')?;
                break;
            }
            cursor.read_value_raw()?;
        }

        Ok(TocReader {
            cursor,
            filter,
            array_first: true,
            done: false,
            next_structure_id: 1,
        })
    }

    /// Decodes and filters the next `reporting_structure` entry, or `None`
    /// once the array is exhausted.
    pub fn next_structure(&mut self) -> Result<Option<TocBatch>, ReaderError> {
        if self.done {
            return Ok(None);
        }
        if !self.cursor.container_has_next(b']', &mut self.array_first)? {
            self.done = true;
            return Ok(None);
        }

        let raw = self.cursor.read_value_raw()?;
        let structure: RawReportingStructure = serde_json::from_slice(&raw)?;

        let structure_id = self.next_structure_id;
        self.next_structure_id += 1;

        let plans: Vec<PlanRow> = structure
            .reporting_plans
            .iter()
            .filter(|plan| self.filter.matches(plan))
            .map(|plan| PlanRow {
                structure_id,
                plan_name: plan.plan_name.clone(),
                plan_id: if plan.plan_id.is_empty() {
                    None
                } else {
                    Some(plan.plan_id.clone())
                },
                plan_id_type: plan.plan_id_type.clone(),
                plan_market_type: plan.plan_market_type.clone(),
                issuer_name: plan.issuer_name.clone(),
                description: structure
                    .in_network_files
                    .as_ref()
                    .and_then(|files| files.first())
                    .map(|f| f.description.clone()),
            })
            .collect();

        if plans.is_empty() {
            return Ok(Some(TocBatch {
                plans,
                urls: Vec::new(),
            }));
        }

        let mut urls = Vec::new();
        if let Some(files) = &structure.in_network_files {
            let mut seen = std::collections::HashSet::new();
            for file in files {
                if seen.insert(file.location.clone()) {
                    urls.push(UrlRow {
                        structure_id,
                        url: file.location.clone(),
                    });
                }
            }
        }
        if let Some(allowed) = &structure.allowed_amount_file {
            urls.push(UrlRow {
                structure_id,
                url: allowed.location.clone(),
            });
        }

        Ok(Some(TocBatch { plans, urls }))
    }

    /// Drains the whole file, useful for small inputs and tests.
    pub fn read_all(&mut self) -> Result<TocBatch, ReaderError> {
        let mut all = TocBatch::default();
        while let Some(batch) = self.next_structure()? {
            all.plans.extend(batch.plans);
            all.urls.extend(batch.urls);
        }
        Ok(all)
    }
}

/// Used by callers that want to reserve read-buffer capacity up front.
pub fn read_buffer_capacity() -> usize {
    READ_BUFFER_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn plan(plan_id: &str, plan_id_type: PlanIdType, name: &str) -> ReportingPlan {
        ReportingPlan {
            plan_name: name.to_string(),
            plan_id_type,
            plan_id: plan_id.to_string(),
            plan_market_type: MarketType::Group,
            issuer_name: None,
            plan_sponsor_name: None,
        }
    }

    #[test]
    fn hios_state_predicate_matches_expected_slice() {
        let filter = TocFilter {
            use_hios_state: true,
            state_code: Some("NY".to_string()),
            ..TocFilter::default()
        };
        let ny_plan = plan("12345NY001", PlanIdType::Hios, "Acme PPO");
        let ca_plan = plan("12345CA001", PlanIdType::Hios, "Acme PPO");
        assert!(filter.matches(&ny_plan));
        assert!(!filter.matches(&ca_plan));
    }

    #[test]
    fn unfiltered_matches_everything() {
        let filter = TocFilter::default();
        let any_plan = plan("00000ZZ000", PlanIdType::Ein, "Anything");
        assert!(filter.matches(&any_plan));
    }

    fn fixture() -> &'static str {
        r#"{
            "reporting_entity_name": "Acme Health",
            "reporting_entity_type": "health insurance issuer",
            "reporting_structure": [
                {
                    "reporting_plans": [
                        {"plan_name": "Acme PPO", "plan_id_type": "HIOS", "plan_id": "12345NY001", "plan_market_type": "group"}
                    ],
                    "in_network_files": [
                        {"description": "In-network rates", "location": "https://example.com/ny-1.json"},
                        {"description": "In-network rates", "location": "https://example.com/ny-1.json"}
                    ]
                },
                {
                    "reporting_plans": [
                        {"plan_name": "Acme HMO", "plan_id_type": "HIOS", "plan_id": "12345CA001", "plan_market_type": "group"}
                    ],
                    "in_network_files": [
                        {"description": "In-network rates", "location": "https://example.com/ca-1.json"}
                    ]
                },
                {
                    "reporting_plans": [
                        {"plan_name": "Acme EPO", "plan_id_type": "HIOS", "plan_id": "68804NY002", "plan_market_type": "group"}
                    ],
                    "in_network_files": [
                        {"description": "In-network rates", "location": "https://example.com/ny-2.json"}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn ny_hios_filter_matches_two_structures_and_dedups_urls() {
        let filter = TocFilter {
            use_hios_state: true,
            state_code: Some("NY".to_string()),
            ..TocFilter::default()
        };
        let mut reader = TocReader::from_reader(Cursor::new(fixture()), filter).unwrap();
        let batch = reader.read_all().unwrap();
        assert_eq!(batch.plans.len(), 2);
        assert_eq!(batch.urls.len(), 2);
        assert_eq!(batch.plans[0].structure_id, 1);
        assert_eq!(batch.plans[1].structure_id, 3);
    }
}
