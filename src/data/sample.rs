//! Deterministic synthetic listings and market datasets.
//!
//! Used as the last step of the retrieval fallback chain and by `mpi sample`.
//! The generated feeds deliberately carry the awkward shapes real ones do:
//! a whole-number booking-count category ahead of the occupancy category, a
//! price channel next to occupancy, aggregate-window date labels and the
//! occasional listing with no usable market data at all.

use std::collections::hash_map::DefaultHasher;
use std::fs::create_dir_all;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde_json::{Map, Value, json};

use crate::data::cache::DiskCache;
use crate::data::provider::{EntitySource, IngestedEntities, ReferenceProvider};
use crate::data::reference::ReferenceDataset;
use crate::domain::{Entity, Timeframe};
use crate::error::{AppError, ProviderError};
use crate::index::locator::{DEFAULT_PRIMARY_SECTION, DEFAULT_SECONDARY_SECTION};

const CITIES: [&str; 6] = ["Austin", "Denver", "Miami", "Nashville", "Phoenix", "Seattle"];
const GROUPS: [&str; 3] = ["Downtown", "Suburbs", "Waterfront"];

/// Days of daily history before `as_of`; forward coverage spans the longest window.
const DAILY_BACKFILL: i64 = 7;
const DAILY_FORWARD: i64 = 125;
const MONTHS_OF_HISTORY: i32 = 12;

/// Probability a listing carries a precomputed value for a given timeframe.
const PRECOMPUTED_PROB: f64 = 0.5;
/// Probability an occupancy observation reads "Unavailable".
const UNAVAILABLE_PROB: f64 = 0.08;
/// One listing in this many gets a market payload with no recognizable section.
const NO_MARKET_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: u64,
    pub as_of: NaiveDate,
}

pub fn generate_entities(config: &SampleConfig) -> Result<Vec<Entity>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(seed_for(config, "entities"));
    let ratio = Normal::new(1.0, 0.2).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let occupancy = Normal::new(68.0, 12.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut out = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let mut entity = Entity::new(format!("S{:04}", i + 1));
        entity.group = GROUPS[rng.gen_range(0..GROUPS.len())].to_string();
        entity.city = Some(CITIES[rng.gen_range(0..CITIES.len())].to_string());
        entity.bedrooms = Some(rng.gen_range(0..=4u8).to_string());

        for tf in Timeframe::ALL {
            if rng.r#gen::<f64>() < PRECOMPUTED_PROB {
                let v: f64 = ratio.sample(&mut rng);
                entity.precomputed[tf.index()] = Some((v.max(0.0) * 1000.0).round() / 1000.0);
            }
        }

        entity.occupancy_short = Some(occupancy_label(&mut rng, &occupancy));
        entity.occupancy_long = Some(occupancy_label(&mut rng, &occupancy));
        out.push(entity);
    }
    Ok(out)
}

fn occupancy_label(rng: &mut StdRng, dist: &Normal<f64>) -> String {
    if rng.r#gen::<f64>() < UNAVAILABLE_PROB {
        return "Unavailable".to_string();
    }
    let v: f64 = dist.sample(rng);
    format!("{:.0} %", v.clamp(5.0, 100.0))
}

/// Market payload for one listing, in the loose wire shape.
pub fn generate_reference(entity_id: &str, config: &SampleConfig) -> Result<Value, AppError> {
    let seed = seed_for(config, entity_id);
    if seed % NO_MARKET_EVERY == 0 {
        return Ok(json!({ "status": "no market data" }));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 4.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let level: f64 = rng.gen_range(55.0..80.0);
    let price_level: f64 = rng.gen_range(120.0..320.0);

    let start = config.as_of - Duration::days(DAILY_BACKFILL);
    let days = DAILY_BACKFILL + DAILY_FORWARD;
    let mut dates: Vec<Value> = (0..days)
        .map(|i| json!((start + Duration::days(i)).format("%Y-%m-%d").to_string()))
        .collect();

    let mut bookings = Vec::with_capacity(dates.len() + 1);
    let mut occupancy = Vec::with_capacity(dates.len() + 1);
    let mut price = Vec::with_capacity(dates.len() + 1);
    for i in 0..days {
        let weekend = matches!((start + Duration::days(i)).weekday().num_days_from_monday(), 4 | 5);
        let bump = if weekend { 8.0 } else { 0.0 };
        let occ: f64 = (level + bump + noise.sample(&mut rng)).clamp(1.0, 100.0);
        occupancy.push(json!(round1(occ)));
        bookings.push(json!(rng.gen_range(0..12)));
        price.push(json!(round1(price_level * (1.0 + bump / 100.0))));
    }

    // Aggregate-window row that must never be read as a date.
    dates.push(json!("Next 30 days"));
    occupancy.push(json!(round1(level)));
    bookings.push(json!(0));
    price.push(json!(round1(price_level)));

    let mut daily = Map::new();
    daily.insert("0".to_string(), json!({ "dates": dates, "values": [bookings] }));
    daily.insert("1".to_string(), json!({ "dates": dates, "values": [occupancy, price] }));

    let months = month_labels(config.as_of, MONTHS_OF_HISTORY);
    let monthly_occ: Vec<Value> = months
        .iter()
        .map(|_| json!(round1((level + noise.sample(&mut rng)).clamp(1.0, 100.0))))
        .collect();
    let monthly_price: Vec<Value> = months.iter().map(|_| json!(round1(price_level))).collect();

    Ok(json!({
        DEFAULT_PRIMARY_SECTION: Value::Object(daily),
        DEFAULT_SECONDARY_SECTION: {
            "1": { "dates": months, "values": [monthly_price, monthly_occ] }
        }
    }))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// `count` month labels ending with the month before `as_of` (`"Aug 2024"`).
fn month_labels(as_of: NaiveDate, count: i32) -> Vec<String> {
    let current = as_of.year() * 12 + as_of.month0() as i32;
    (1..=count)
        .rev()
        .filter_map(|back| {
            let idx = current - back;
            NaiveDate::from_ymd_opt(idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1, 1)
        })
        .map(|d| d.format("%b %Y").to_string())
        .collect()
}

fn seed_for(config: &SampleConfig, salt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.as_of.hash(&mut hasher);
    salt.hash(&mut hasher);
    hasher.finish()
}

/// Wire representation of an entity, matching what `io::ingest` reads.
pub fn entity_to_value(entity: &Entity) -> Value {
    let mut mpi = Map::new();
    for tf in Timeframe::ALL {
        mpi.insert(
            tf.days().to_string(),
            entity.precomputed_for(tf).map_or(Value::Null, |v| json!(v)),
        );
    }
    json!({
        "id": entity.id,
        "group": entity.group,
        "city": entity.city,
        "bedrooms": entity.bedrooms,
        "mpi": mpi,
        "occupancy_last_30": entity.occupancy_short,
        "occupancy_last_90": entity.occupancy_long,
    })
}

/// Synthetic entities, as the last step of the fallback chain.
#[derive(Debug, Clone)]
pub struct SampleEntitySource {
    pub config: SampleConfig,
}

impl EntitySource for SampleEntitySource {
    fn name(&self) -> &str {
        "sample"
    }

    fn fetch_entities(&self) -> Result<IngestedEntities, AppError> {
        let entities = generate_entities(&self.config)?;
        Ok(IngestedEntities {
            rows_read: entities.len(),
            entities,
            row_errors: Vec::new(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SampleReferenceProvider {
    pub config: SampleConfig,
}

impl ReferenceProvider for SampleReferenceProvider {
    fn fetch_reference(&self, entity_id: &str) -> Result<Option<Arc<ReferenceDataset>>, ProviderError> {
        let value = generate_reference(entity_id, &self.config)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let dataset = ReferenceDataset::from_value(&value)?;
        Ok((!dataset.is_empty()).then(|| Arc::new(dataset)))
    }
}

/// Write `entities.json` plus `reference/<id>.json` under `dir`.
///
/// Returns the reference directory.
pub fn write_sample_bundle(dir: &Path, config: &SampleConfig) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::io(format_args!("Failed to create '{}'", dir.display()), e))?;
    let cache = DiskCache::new(dir);

    let entities = generate_entities(config)?;
    let payload = Value::Array(entities.iter().map(entity_to_value).collect());
    cache.write(&cache.entities_path(), &payload)?;

    for entity in &entities {
        let reference = generate_reference(&entity.id, config)?;
        cache.write(&cache.reference_path(&entity.id), &reference)?;
    }

    tracing::info!(dir = %dir.display(), entities = entities.len(), "wrote sample bundle");
    Ok(dir.join("reference"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::locator::{Detection, LocateOutcome, LocatorConfig, locate};
    use crate::io::ingest::entities_from_value;

    fn config() -> SampleConfig {
        SampleConfig {
            count: 12,
            seed: 42,
            as_of: NaiveDate::from_ymd_opt(2025, 8, 8).unwrap(),
        }
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate_entities(&config()).unwrap(), generate_entities(&config()).unwrap());
        assert_eq!(
            generate_reference("S0001", &config()).unwrap(),
            generate_reference("S0001", &config()).unwrap()
        );
    }

    #[test]
    fn zero_count_is_rejected() {
        let cfg = SampleConfig { count: 0, ..config() };
        assert_eq!(generate_entities(&cfg).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn entities_round_trip_through_ingest() {
        let entities = generate_entities(&config()).unwrap();
        let payload = Value::Array(entities.iter().map(entity_to_value).collect());
        let ingest = entities_from_value(&payload).unwrap();
        assert!(ingest.row_errors.is_empty());
        assert_eq!(ingest.entities, entities);
    }

    #[test]
    fn locator_skips_booking_counts_for_occupancy() {
        let cfg = config();
        let dataset = (1..=cfg.count)
            .map(|i| generate_reference(&format!("S{i:04}"), &cfg).unwrap())
            .map(|v| ReferenceDataset::from_value(&v).unwrap())
            .find(|ds| !ds.is_empty())
            .expect("at least one listing has market data");

        let LocateOutcome::Found(found) = locate(&dataset, "0", &LocatorConfig::default()) else {
            panic!("expected occupancy channel");
        };
        assert_eq!(found.category, "1");
        assert_eq!(found.detection, Detection::RealisticPrimary);
    }

    #[test]
    fn month_labels_end_before_as_of() {
        let labels = month_labels(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), 3);
        assert_eq!(labels, vec!["Oct 2024", "Nov 2024", "Dec 2024"]);
    }
}
