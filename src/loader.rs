//! Two-phase relational loader: reads a columnar charge file
//! back in ~8k-row pages, groups adjacent rows into items and standard
//! charges by byte-identical composite keys, upserts dimension rows behind
//! three in-memory caches, and bulk-copies the payer-charge fact table under
//! batched transactions.
//!
//! The scan never sorts or buffers more than one page of rows: grouping
//! relies entirely on the columnar writer having preserved the reader's
//! source order.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{Pool, Transaction};
use tracing::{debug, info, warn};

use crate::columnar::ChargeRowReader;
use crate::error::LoadError;
use crate::row::{ChargeRow, CodeSlot};
use crate::util::{collect_codes, format_numeric};

/// Connection pool cap.
const MAX_POOL_CONNECTIONS: u32 = 4;

/// Tunables for one relational load.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Items in flight before the pending payer rows are bulk-copied and the
    /// transaction commits.
    pub batch_items: usize,
    /// Suppresses payer-charge and dimension writes; items and charges are
    /// still loaded.
    pub skip_payer_data: bool,
    /// Minimum interval between progress log lines.
    pub progress_interval: Duration,
    /// Delimiter the loader splits `ChargeRow::modifiers` on when populating
    /// the `standard_charges.modifier_codes` array column.
    pub modifier_delimiter: char,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            batch_items: 500,
            skip_payer_data: false,
            progress_interval: Duration::from_secs(5),
            modifier_delimiter: '|',
        }
    }
}

/// Totals printed on successful completion.
#[derive(Debug, Default, Clone)]
pub struct LoadSummary {
    pub rows_scanned: u64,
    pub items_inserted: u64,
    pub charges_inserted: u64,
    pub payer_charges_inserted: u64,
    pub codes_cached: usize,
    pub plans_cached: usize,
    pub payers_cached: usize,
    pub elapsed: Duration,
}

impl LoadSummary {
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.rows_scanned as f64 / secs
        }
    }
}

/// One accumulated row buffered for the end-of-flush bulk `COPY`. Median/p10/p90/count are always `None`
/// on this path — "preserved for a future percentile-enriched source".
#[derive(Debug, Clone)]
struct PendingPayerCharge {
    standard_charge_id: i64,
    payer_id: i64,
    plan_id: Option<i64>,
    methodology: Option<&'static str>,
    negotiated_dollar: Option<f64>,
    negotiated_percentage: Option<f64>,
    negotiated_algorithm: Option<String>,
    estimated_amount: Option<f64>,
    additional_payer_notes: Option<String>,
}

/// Composite key identifying one standard-charge item: description, then
/// each populated code column as `type:value|`, then drug unit (`%.4f`) and
/// drug type if present.
fn item_key(row: &ChargeRow) -> String {
    let mut key = String::with_capacity(64);
    key.push_str(&row.description);
    key.push('\t');
    for (value, slot) in collect_codes(row) {
        key.push_str(slot.as_str());
        key.push(':');
        key.push_str(value);
        key.push('|');
    }
    if let Some(unit) = row.drug_unit_of_measurement {
        key.push('\t');
        key.push_str(&format!("{unit:.4}"));
    }
    if let Some(drug_type) = row.drug_type_of_measurement {
        key.push('\t');
        key.push_str(drug_type.as_str());
    }
    key
}

/// Composite key identifying one standard charge within an item: setting, gross/discounted/min/max at `%.6f`, modifiers, notes.
/// Empty string stands in for a null source value.
fn charge_key(row: &ChargeRow) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        row.setting.map(|s| s.as_str()).unwrap_or(""),
        fmt6(row.gross_charge),
        fmt6(row.discounted_cash),
        fmt6(row.min_charge),
        fmt6(row.max_charge),
        row.modifiers.as_deref().unwrap_or(""),
        row.additional_generic_notes.as_deref().unwrap_or(""),
    )
}

fn fmt6(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Parses `last_updated_on` trying `YYYY-MM-DD` then `MM/DD/YYYY`; falls
/// back to the current date on failure.
fn parse_hospital_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .unwrap_or_else(|_| {
            warn!(raw, "last_updated_on unparseable, falling back to current date");
            chrono::Local::now().date_naive()
        })
}

fn methodology_str(m: crate::row::Methodology) -> &'static str {
    use crate::row::Methodology::*;
    match m {
        CaseRate => "case_rate",
        FeeSchedule => "fee_schedule",
        PercentOfTotalBilledCharges => "percent_of_total_billed_charges",
        PerDiem => "per_diem",
        Other => "other",
    }
}

/// State for the item currently being assembled as the scan proceeds.
struct CurrentItem {
    key: String,
    item_id: i64,
    charge: Option<CurrentCharge>,
}

struct CurrentCharge {
    key: String,
    charge_id: i64,
}

/// Drives one end-to-end relational load: a sequential scan of a columnar
/// charge file, adjacent-key grouping, dimension upserts, and batched
/// transactions against Postgres.
pub struct RelationalLoader {
    pool: Pool<Postgres>,
    options: LoaderOptions,
    code_cache: HashMap<String, i64>,
    plan_cache: HashMap<String, i64>,
    payer_cache: HashMap<String, i64>,
}

impl RelationalLoader {
    pub async fn connect(database_url: &str, options: LoaderOptions) -> Result<Self, LoadError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(RelationalLoader::from_pool(pool, options))
    }

    pub fn from_pool(pool: Pool<Postgres>, options: LoaderOptions) -> Self {
        RelationalLoader {
            pool,
            options,
            code_cache: HashMap::new(),
            plan_cache: HashMap::new(),
            payer_cache: HashMap::new(),
        }
    }

    /// Reads `path` and loads it into the relational schema, returning
    /// summary totals on success. On any error the in-flight transaction is
    /// rolled back and the error surfaces to the caller.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary, LoadError> {
        let start = Instant::now();
        let mut reader = ChargeRowReader::open(path).map_err(LoadError::Writer)?;

        let mut summary = LoadSummary::default();
        let mut hospital_id: Option<i64> = None;
        let mut current_item: Option<CurrentItem> = None;
        let mut pending_payer_charges: Vec<PendingPayerCharge> = Vec::new();
        let mut items_in_flight = 0usize;
        let mut last_progress = Instant::now();

        let mut tx = self.pool.begin().await?;

        while let Some(page) = reader.next_page() {
            let page = page.map_err(LoadError::Writer)?;
            for row in page {
                summary.rows_scanned += 1;

                if hospital_id.is_none() {
                    hospital_id = Some(insert_hospital(&mut tx, &row).await?);
                }

                let this_item_key = item_key(&row);
                let item_changed = current_item
                    .as_ref()
                    .map(|item| item.key != this_item_key)
                    .unwrap_or(true);

                if item_changed {
                    // Finalizing the previous item means nothing beyond
                    // accounting: its charges and payer rows are already
                    // committed to the open transaction or buffered.
                    if current_item.is_some() {
                        items_in_flight += 1;
                    }
                    let item_id = insert_item(
                        &mut tx,
                        &mut self.code_cache,
                        hospital_id.unwrap(),
                        &row,
                    )
                    .await?;
                    summary.items_inserted += 1;
                    current_item = Some(CurrentItem {
                        key: this_item_key,
                        item_id,
                        charge: None,
                    });

                    if items_in_flight >= self.options.batch_items {
                        summary.payer_charges_inserted += self
                            .flush_payer_charges(&mut tx, &mut pending_payer_charges)
                            .await?;
                        tx.commit().await.map_err(|e| {
                            LoadError::rolled_back(LoadError::Database(e))
                        })?;
                        tx = self.pool.begin().await?;
                        items_in_flight = 0;
                    }
                }

                let item = current_item.as_mut().expect("item set above");
                let this_charge_key = charge_key(&row);
                let charge_changed = item
                    .charge
                    .as_ref()
                    .map(|c| c.key != this_charge_key)
                    .unwrap_or(true);

                if charge_changed {
                    let charge_id = insert_charge(
                        &mut tx,
                        item.item_id,
                        &row,
                        self.options.modifier_delimiter,
                    )
                    .await?;
                    summary.charges_inserted += 1;
                    item.charge = Some(CurrentCharge {
                        key: this_charge_key,
                        charge_id,
                    });
                }

                if !self.options.skip_payer_data {
                    if let Some(payer_name) = &row.payer_name {
                        let payer_id =
                            upsert_payer(&mut tx, &mut self.payer_cache, payer_name).await?;
                        let plan_id = match &row.plan_name {
                            Some(plan_name) => {
                                Some(upsert_plan(&mut tx, &mut self.plan_cache, plan_name).await?)
                            }
                            None => None,
                        };
                        let charge_id = item.charge.as_ref().expect("charge set above").charge_id;
                        pending_payer_charges.push(PendingPayerCharge {
                            standard_charge_id: charge_id,
                            payer_id,
                            plan_id,
                            methodology: row.methodology.map(methodology_str),
                            negotiated_dollar: row.negotiated_dollar,
                            negotiated_percentage: row.negotiated_percentage,
                            negotiated_algorithm: row.negotiated_algorithm.clone(),
                            estimated_amount: row.estimated_amount,
                            additional_payer_notes: row.additional_payer_notes.clone(),
                        });
                    }
                }

                if last_progress.elapsed() >= self.options.progress_interval {
                    info!(
                        rows_scanned = summary.rows_scanned,
                        items_inserted = summary.items_inserted,
                        charges_inserted = summary.charges_inserted,
                        payer_charges_pending = pending_payer_charges.len(),
                        rows_per_sec = summary.rows_scanned as f64 / start.elapsed().as_secs_f64().max(0.001),
                        "relational load progress"
                    );
                    last_progress = Instant::now();
                }
            }
        }

        // Flush the last item and remaining payer rows, then commit.
        summary.payer_charges_inserted += self
            .flush_payer_charges(&mut tx, &mut pending_payer_charges)
            .await?;
        tx.commit()
            .await
            .map_err(|e| LoadError::rolled_back(LoadError::Database(e)))?;

        summary.codes_cached = self.code_cache.len();
        summary.plans_cached = self.plan_cache.len();
        summary.payers_cached = self.payer_cache.len();
        summary.elapsed = start.elapsed();

        info!(
            rows_scanned = summary.rows_scanned,
            items_inserted = summary.items_inserted,
            charges_inserted = summary.charges_inserted,
            payer_charges_inserted = summary.payer_charges_inserted,
            codes_cached = summary.codes_cached,
            plans_cached = summary.plans_cached,
            payers_cached = summary.payers_cached,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            rows_per_sec = summary.rows_per_second(),
            "relational load complete"
        );

        Ok(summary)
    }

    /// Bulk-copies buffered payer-charge rows via Postgres `COPY`, then
    /// clears the buffer. A no-op when the buffer (or optional mode) is
    /// empty.
    async fn flush_payer_charges(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        pending: &mut Vec<PendingPayerCharge>,
    ) -> Result<u64, LoadError> {
        if pending.is_empty() {
            return Ok(0);
        }
        let flushed = pending.len() as u64;

        let mut buf = String::new();
        for row in pending.iter() {
            buf.push_str(&row.standard_charge_id.to_string());
            buf.push('\t');
            buf.push_str(&row.payer_id.to_string());
            buf.push('\t');
            match row.plan_id {
                Some(id) => buf.push_str(&id.to_string()),
                None => buf.push_str("\\N"),
            }
            buf.push('\t');
            push_copy_text(&mut buf, row.methodology);
            buf.push('\t');
            push_copy_numeric(&mut buf, row.negotiated_dollar);
            buf.push('\t');
            push_copy_numeric(&mut buf, row.negotiated_percentage);
            buf.push('\t');
            push_copy_text(&mut buf, row.negotiated_algorithm.as_deref());
            buf.push('\t');
            push_copy_numeric(&mut buf, row.estimated_amount);
            buf.push('\t');
            buf.push_str("\\N\t\\N\t\\N\t\\N\t"); // median, p10, p90, count: always null on this path
            push_copy_text(&mut buf, row.additional_payer_notes.as_deref());
            buf.push('\n');
        }

        // FORMAT text (the default), not csv: push_copy_text's backslash
        // escaping (\\, \n, \r, \t, \N) is the TEXT-format convention, and
        // tab-delimiting means a comma in free-text fields like
        // additional_payer_notes can never be mistaken for a column break.
        let mut copy_in = tx
            .copy_in_raw(
                "COPY payer_charges (standard_charge_id, payer_id, plan_id, methodology, \
                 negotiated_dollar, negotiated_percentage, negotiated_algorithm, \
                 estimated_amount, median, p10, p90, count, additional_payer_notes) \
                 FROM STDIN WITH (FORMAT text)",
            )
            .await?;
        copy_in.send(buf.as_bytes()).await?;
        copy_in.finish().await?;

        debug!(rows = flushed, "bulk-copied payer charges");
        pending.clear();
        Ok(flushed)
    }
}

fn push_copy_text(out: &mut String, value: Option<&str>) {
    match value {
        Some(v) if !v.is_empty() => {
            for ch in v.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
        }
        _ => out.push_str("\\N"),
    }
}

fn push_copy_numeric(out: &mut String, value: Option<f64>) {
    match value {
        Some(v) => out.push_str(&format_numeric(v)),
        None => out.push_str("\\N"),
    }
}

async fn insert_hospital(
    tx: &mut Transaction<'static, Postgres>,
    row: &ChargeRow,
) -> Result<i64, LoadError> {
    let last_updated = parse_hospital_date(&row.last_updated_on);
    let addresses: Vec<String> = row.hospital_address.iter().cloned().collect();
    let location_names: Vec<String> = row.hospital_location.iter().cloned().collect();

    let id: (i64,) = sqlx::query_as(
        "INSERT INTO hospitals \
         (name, addresses, location_names, license_number, license_state, version, last_updated_on, affirmation) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(&row.hospital_name)
    .bind(&addresses)
    .bind(&location_names)
    .bind(&row.license_number)
    .bind(&row.license_state)
    .bind(&row.version)
    .bind(last_updated)
    .bind(row.affirmation)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id.0)
}

/// Upserts the item's populated codes, inserting the `standard_charge_items`
/// row and one `item_codes` link per code.
async fn insert_item(
    tx: &mut Transaction<'static, Postgres>,
    code_cache: &mut HashMap<String, i64>,
    hospital_id: i64,
    row: &ChargeRow,
) -> Result<i64, LoadError> {
    let drug_type = row.drug_type_of_measurement.map(|d| d.as_str());

    let id: (i64,) = sqlx::query_as(
        "INSERT INTO standard_charge_items \
         (hospital_id, description, drug_unit_of_measurement, drug_type_of_measurement) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(hospital_id)
    .bind(&row.description)
    .bind(row.drug_unit_of_measurement)
    .bind(drug_type)
    .fetch_one(&mut **tx)
    .await?;
    let item_id = id.0;

    for (value, slot) in collect_codes(row) {
        let code_id = upsert_code(tx, code_cache, value, slot).await?;
        sqlx::query(
            "INSERT INTO item_codes (item_id, code_id) VALUES ($1, $2) \
             ON CONFLICT (item_id, code_id) DO NOTHING",
        )
        .bind(item_id)
        .bind(code_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(item_id)
}

async fn insert_charge(
    tx: &mut Transaction<'static, Postgres>,
    item_id: i64,
    row: &ChargeRow,
    modifier_delimiter: char,
) -> Result<i64, LoadError> {
    let modifier_codes: Vec<String> = row
        .modifiers
        .as_deref()
        .map(|m| {
            m.split(modifier_delimiter)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let id: (i64,) = sqlx::query_as(
        "INSERT INTO standard_charges \
         (item_id, setting, gross_charge, discounted_cash, min_charge, max_charge, modifier_codes, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(item_id)
    .bind(row.setting.map(|s| s.as_str()))
    .bind(row.gross_charge.map(format_numeric))
    .bind(row.discounted_cash.map(format_numeric))
    .bind(row.min_charge.map(format_numeric))
    .bind(row.max_charge.map(format_numeric))
    .bind(&modifier_codes)
    .bind(row.additional_generic_notes.as_deref())
    .fetch_one(&mut **tx)
    .await?;
    Ok(id.0)
}

/// Code dimension cache key: `value \t code_type`.
fn code_cache_key(value: &str, slot: CodeSlot) -> String {
    format!("{value}\t{}", slot.as_str())
}

async fn upsert_code(
    tx: &mut Transaction<'static, Postgres>,
    cache: &mut HashMap<String, i64>,
    value: &str,
    slot: CodeSlot,
) -> Result<i64, LoadError> {
    let key = code_cache_key(value, slot);
    if let Some(&id) = cache.get(&key) {
        return Ok(id);
    }
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO codes (value, code_type) VALUES ($1, $2) \
         ON CONFLICT (value, code_type) DO UPDATE SET value = EXCLUDED.value \
         RETURNING id",
    )
    .bind(value)
    .bind(slot.as_str())
    .fetch_one(&mut **tx)
    .await?;
    cache.insert(key, id.0);
    Ok(id.0)
}

async fn upsert_plan(
    tx: &mut Transaction<'static, Postgres>,
    cache: &mut HashMap<String, i64>,
    name: &str,
) -> Result<i64, LoadError> {
    if let Some(&id) = cache.get(name) {
        return Ok(id);
    }
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO plans (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    cache.insert(name.to_string(), id.0);
    Ok(id.0)
}

async fn upsert_payer(
    tx: &mut Transaction<'static, Postgres>,
    cache: &mut HashMap<String, i64>,
    name: &str,
) -> Result<i64, LoadError> {
    if let Some(&id) = cache.get(name) {
        return Ok(id);
    }
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO payers (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    cache.insert(name.to_string(), id.0);
    Ok(id.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{HospitalMeta, Setting};

    fn base_row() -> ChargeRow {
        let meta = HospitalMeta {
            hospital_name: "Test General Hospital".to_string(),
            last_updated_on: "2024-01-15".to_string(),
            version: "2.0.0".to_string(),
            affirmation: true,
            ..Default::default()
        };
        ChargeRow::with_meta(&meta, "ECHOCARDIOGRAM")
    }

    #[test]
    fn item_key_ignores_payer_and_charge_fields() {
        let mut a = base_row();
        a.cpt = Some("93306".to_string());
        a.payer_name = Some("Aetna".to_string());
        a.gross_charge = Some(1500.0);

        let mut b = base_row();
        b.cpt = Some("93306".to_string());
        b.payer_name = Some("UHC".to_string());
        b.gross_charge = Some(1500.0);

        assert_eq!(item_key(&a), item_key(&b));
    }

    #[test]
    fn item_key_differs_on_distinct_codes() {
        let mut a = base_row();
        a.cpt = Some("93306".to_string());
        let mut b = base_row();
        b.hcpcs = Some("G0389".to_string());
        assert_ne!(item_key(&a), item_key(&b));
    }

    #[test]
    fn charge_key_groups_identical_settings_and_amounts_regardless_of_payer() {
        let mut a = base_row();
        a.setting = Some(Setting::Outpatient);
        a.gross_charge = Some(1500.0);
        a.min_charge = Some(500.0);
        a.max_charge = Some(2000.0);
        a.payer_name = Some("Aetna".to_string());
        a.negotiated_dollar = Some(900.0);

        let mut b = a.clone();
        b.payer_name = Some("UHC".to_string());
        b.negotiated_dollar = Some(1100.0);

        assert_eq!(charge_key(&a), charge_key(&b));
    }

    #[test]
    fn charge_key_differs_on_distinct_gross_charge() {
        let mut a = base_row();
        a.gross_charge = Some(1500.0);
        let mut b = base_row();
        b.gross_charge = Some(1600.0);
        assert_ne!(charge_key(&a), charge_key(&b));
    }

    #[test]
    fn parse_hospital_date_accepts_iso_and_us_formats() {
        assert_eq!(
            parse_hospital_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_hospital_date("01/15/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn push_copy_text_escapes_control_characters() {
        let mut out = String::new();
        push_copy_text(&mut out, Some("line1\nline2\ttabbed"));
        assert_eq!(out, "line1\\nline2\\ttabbed");

        let mut null_out = String::new();
        push_copy_text(&mut null_out, None);
        assert_eq!(null_out, "\\N");
    }
}
