//! Random observation generation

use crate::aggregator::FieldPools;
use crate::config::{EngineConfig, MAX_WINDOW_MINUTES};
use crate::synthetic;
use chrono::{DateTime, Duration, Utc};
use obsgraph_core::{FieldSlot, GraphError, Observation, RandomSource};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Slots whose values may be redrawn from earlier observations
pub const REUSABLE_SLOTS: [FieldSlot; 3] = [FieldSlot::SourceIp, FieldSlot::DestIp, FieldSlot::Username];

/// Per-call generation knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Chance of redrawing a known value for each reusable slot
    pub reuse_probability: f64,
    /// Prefer known values that already carry a high severity
    pub try_to_be_bad: bool,
}

impl GenerateOptions {
    /// Every value freshly randomized
    pub fn fresh() -> Self {
        Self {
            reuse_probability: 0.0,
            try_to_be_bad: false,
        }
    }

    pub fn with_reuse(reuse_probability: f64) -> Self {
        Self {
            reuse_probability,
            try_to_be_bad: false,
        }
    }

    pub fn bad(mut self) -> Self {
        self.try_to_be_bad = true;
        self
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if !(0.0..=1.0).contains(&self.reuse_probability) {
            return Err(GraphError::InvalidProbability(self.reuse_probability));
        }
        Ok(())
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::fresh()
    }
}

/// One generated observation and how its reusable slots were filled
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub observation: Observation,
    /// Slots that took a known value
    pub reused: Vec<FieldSlot>,
    /// Slots that asked for a known value but found an empty pool
    pub fallbacks: Vec<FieldSlot>,
}

/// Produces synthetic observations
#[derive(Debug, Clone)]
pub struct ObservationGenerator {
    window: Duration,
    bad_severity_floor: u8,
}

impl ObservationGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window: Duration::minutes(config.window_minutes.clamp(1, MAX_WINDOW_MINUTES)),
            bad_severity_floor: config.bad_severity_floor,
        }
    }

    /// Generate one observation with `existing` as reuse context.
    ///
    /// The start date is drawn uniformly from the window that opens at
    /// `anchor` (now when absent).
    pub fn generate<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        existing: &[Observation],
        options: GenerateOptions,
        anchor: Option<DateTime<Utc>>,
    ) -> Result<Generated, GraphError> {
        options.validate()?;
        let anchor = anchor.unwrap_or_else(Utc::now);
        if existing.is_empty() || options.reuse_probability == 0.0 {
            return self.draw(rng, None, options, anchor);
        }
        let pools = FieldPools::from_observations(existing);
        self.draw(rng, Some(&pools), options, anchor)
    }

    /// Generate `count` observations, each window opening at the previous pick.
    /// Earlier members of the batch are the reuse context for later ones.
    pub fn generate_batch<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        options: GenerateOptions,
        anchor: Option<DateTime<Utc>>,
    ) -> Result<Vec<Observation>, GraphError> {
        options.validate()?;
        let anchor = anchor.unwrap_or_else(Utc::now);
        self.fold(rng, count, options, anchor, FieldPools::new(), false)
    }

    /// Generate `count` observations following `existing`, returning only the new ones.
    pub fn append_batch<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        options: GenerateOptions,
        existing: &[Observation],
    ) -> Result<Vec<Observation>, GraphError> {
        options.validate()?;
        let anchor = existing.last().map(|o| o.start_date).unwrap_or_else(Utc::now);
        let pools = if options.reuse_probability > 0.0 {
            FieldPools::from_observations(existing)
        } else {
            FieldPools::new()
        };
        self.fold(rng, count, options, anchor, pools, !existing.is_empty())
    }

    fn fold<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        options: GenerateOptions,
        mut anchor: DateTime<Utc>,
        mut pools: FieldPools,
        mut has_context: bool,
    ) -> Result<Vec<Observation>, GraphError> {
        let reuse = options.reuse_probability > 0.0;
        let mut batch = Vec::with_capacity(count);
        let mut fallbacks = 0usize;

        for _ in 0..count {
            let context = if has_context && reuse { Some(&pools) } else { None };
            let generated = self.draw(rng, context, options, anchor)?;
            fallbacks += generated.fallbacks.len();
            anchor = generated.observation.start_date;
            if reuse {
                pools.absorb(&generated.observation);
            }
            has_context = true;
            batch.push(generated.observation);
        }

        debug!(count, fallbacks, "generated observation batch");
        Ok(batch)
    }

    fn draw<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        pools: Option<&FieldPools>,
        options: GenerateOptions,
        anchor: DateTime<Utc>,
    ) -> Result<Generated, GraphError> {
        let offset = (rng.next_f64() * self.window.num_milliseconds() as f64) as i64;
        let start_date = anchor
            .checked_add_signed(Duration::milliseconds(offset))
            .ok_or(GraphError::DateOutOfRange { anchor })?;
        let prefer_floor = options.try_to_be_bad.then_some(self.bad_severity_floor);

        let mut observation = Observation::new(Uuid::nil(), start_date, 0);
        let mut reused = Vec::new();
        let mut fallbacks = Vec::new();

        for slot in REUSABLE_SLOTS {
            let mut value = None;
            if let Some(pools) = pools {
                if rng.chance(options.reuse_probability) {
                    value = pools
                        .draw(rng, slot.field_type(), prefer_floor)
                        .map(str::to_string);
                    if value.is_some() {
                        reused.push(slot);
                    } else {
                        debug!(slot = %slot, "reuse pool is empty, drawing a fresh value");
                        fallbacks.push(slot);
                    }
                }
            }
            let value = value.unwrap_or_else(|| fresh_value(rng, slot));
            observation.set_slot(slot, value);
        }

        observation.set_slot(FieldSlot::Url, synthetic::url(rng));
        observation.set_slot(FieldSlot::Email, synthetic::email(rng));
        observation.set_slot(FieldSlot::Domain, synthetic::domain(rng));
        observation.severity = synthetic::severity(rng);
        observation.uuid = rng.uuid();

        Ok(Generated {
            observation,
            reused,
            fallbacks,
        })
    }
}

fn fresh_value<R: RandomSource + ?Sized>(rng: &mut R, slot: FieldSlot) -> String {
    match slot {
        FieldSlot::SourceIp | FieldSlot::DestIp => synthetic::ip(rng),
        FieldSlot::Username => synthetic::name(rng),
        FieldSlot::Domain => synthetic::domain(rng),
        FieldSlot::Url => synthetic::url(rng),
        FieldSlot::Email => synthetic::email(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use obsgraph_core::{RngSource, SequenceSource, MAX_SEVERITY};
    use proptest::prelude::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn generator() -> ObservationGenerator {
        ObservationGenerator::new(&EngineConfig::default())
    }

    #[test]
    fn test_fresh_observation_fills_every_slot() {
        let mut rng = RngSource::seeded(1);
        let generated = generator()
            .generate(&mut rng, &[], GenerateOptions::with_reuse(0.9), Some(anchor()))
            .unwrap();

        let o = &generated.observation;
        assert_eq!(o.slot_values().count(), FieldSlot::COUNT);
        assert!(o.severity <= MAX_SEVERITY);
        assert!(o.start_date >= anchor());
        assert!(o.start_date < anchor() + Duration::hours(1));
        assert!(generated.reused.is_empty());
        assert!(generated.fallbacks.is_empty());
    }

    #[test]
    fn test_start_date_follows_window_draw() {
        // first draw picks the offset: half of a one hour window
        let mut rng = SequenceSource::new(vec![0.5, 0.1, 0.2, 0.3]);
        let generated = generator()
            .generate(&mut rng, &[], GenerateOptions::fresh(), Some(anchor()))
            .unwrap();

        assert_eq!(generated.observation.start_date, anchor() + Duration::minutes(30));
    }

    #[test]
    fn test_full_reuse_draws_known_values() {
        let mut rng = RngSource::seeded(2);
        let gen = generator();
        let seed = gen.generate(&mut rng, &[], GenerateOptions::fresh(), Some(anchor())).unwrap();
        let existing = vec![seed.observation.clone()];

        let generated = gen
            .generate(&mut rng, &existing, GenerateOptions::with_reuse(1.0), Some(anchor()))
            .unwrap();
        let o = &generated.observation;
        let known_ips = [existing[0].source_ip.as_str(), existing[0].dest_ip.as_str()];

        assert!(known_ips.contains(&o.source_ip.as_str()));
        assert!(known_ips.contains(&o.dest_ip.as_str()));
        assert_eq!(o.username, existing[0].username);
        assert_eq!(generated.reused, REUSABLE_SLOTS.to_vec());
        assert_ne!(o.uuid, existing[0].uuid);
    }

    #[test]
    fn test_empty_pool_falls_back_to_fresh_value() {
        let mut rng = RngSource::seeded(3);
        let existing = vec![Observation::new(Uuid::from_u128(1), anchor(), 2)
            .with_slot(FieldSlot::SourceIp, "10.0.0.1")];

        let generated = generator()
            .generate(&mut rng, &existing, GenerateOptions::with_reuse(1.0), Some(anchor()))
            .unwrap();

        assert_eq!(generated.fallbacks, vec![FieldSlot::Username]);
        assert!(!generated.observation.username.is_empty());
        assert_eq!(generated.observation.source_ip, "10.0.0.1");
    }

    #[test]
    fn test_invalid_probability_is_rejected() {
        let mut rng = RngSource::seeded(4);
        let result = generator().generate(&mut rng, &[], GenerateOptions::with_reuse(1.5), None);
        assert_eq!(result, Err(GraphError::InvalidProbability(1.5)));

        let result = generator().generate_batch(&mut rng, 3, GenerateOptions::with_reuse(-0.1), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_start_date_past_calendar_end_is_an_error() {
        let mut rng = SequenceSource::constant(0.5);
        let last = Observation::new(Uuid::from_u128(1), DateTime::<Utc>::MAX_UTC, 3)
            .with_slot(FieldSlot::SourceIp, "10.0.0.1");

        let result = generator().append_batch(&mut rng, 2, GenerateOptions::fresh(), &[last]);
        assert_eq!(
            result,
            Err(GraphError::DateOutOfRange { anchor: DateTime::<Utc>::MAX_UTC })
        );
    }

    #[test]
    fn test_unvalidated_window_is_clamped() {
        let mut config = EngineConfig::default();
        config.window_minutes = i64::MAX;
        let generator = ObservationGenerator::new(&config);

        let mut rng = SequenceSource::constant(0.999);
        let generated = generator
            .generate(&mut rng, &[], GenerateOptions::fresh(), Some(anchor()))
            .unwrap();
        assert!(generated.observation.start_date < anchor() + Duration::minutes(MAX_WINDOW_MINUTES));
    }

    #[test]
    fn test_batch_threads_start_dates() {
        let mut rng = RngSource::seeded(5);
        let batch = generator()
            .generate_batch(&mut rng, 25, GenerateOptions::with_reuse(0.5), Some(anchor()))
            .unwrap();

        assert_eq!(batch.len(), 25);
        assert!(batch[0].start_date >= anchor());
        for pair in batch.windows(2) {
            assert!(pair[1].start_date >= pair[0].start_date);
            assert!(pair[1].start_date < pair[0].start_date + Duration::hours(1));
        }
    }

    #[test]
    fn test_append_batch_leaves_history_untouched() {
        let mut rng = RngSource::seeded(6);
        let gen = generator();
        let history = gen
            .generate_batch(&mut rng, 5, GenerateOptions::fresh(), Some(anchor()))
            .unwrap();
        let before = history.clone();

        let appended = gen
            .append_batch(&mut rng, 4, GenerateOptions::with_reuse(0.5), &history)
            .unwrap();

        assert_eq!(history, before);
        assert_eq!(appended.len(), 4);
        assert!(appended[0].start_date >= history[4].start_date);
        assert!(appended.iter().all(|o| !history.iter().any(|h| h.uuid == o.uuid)));
    }

    #[test]
    fn test_append_with_full_reuse_recycles_history() {
        let mut rng = RngSource::seeded(7);
        let gen = generator();
        let history = gen
            .generate_batch(&mut rng, 3, GenerateOptions::fresh(), Some(anchor()))
            .unwrap();

        let appended = gen
            .append_batch(&mut rng, 5, GenerateOptions::with_reuse(1.0), &history)
            .unwrap();

        let known: Vec<&str> = history.iter().map(|o| o.username.as_str()).collect();
        assert!(appended.iter().all(|o| known.contains(&o.username.as_str())));
    }

    #[test]
    fn test_try_to_be_bad_prefers_severe_actors() {
        let mut rng = RngSource::seeded(8);
        let calm = Observation::new(Uuid::from_u128(1), anchor(), 0)
            .with_slot(FieldSlot::Username, "calm");
        let noisy = Observation::new(Uuid::from_u128(2), anchor(), 9)
            .with_slot(FieldSlot::Username, "noisy");
        let existing = vec![calm, noisy];

        for _ in 0..10 {
            let generated = generator()
                .generate(&mut rng, &existing, GenerateOptions::with_reuse(1.0).bad(), Some(anchor()))
                .unwrap();
            assert_eq!(generated.observation.username, "noisy");
        }
    }

    proptest! {
        #[test]
        fn prop_batches_are_well_formed(seed in any::<u64>(), count in 0usize..40, p in 0.0f64..=1.0) {
            let mut rng = RngSource::seeded(seed);
            let batch = generator()
                .generate_batch(&mut rng, count, GenerateOptions::with_reuse(p), Some(anchor()))
                .unwrap();

            prop_assert_eq!(batch.len(), count);
            for o in &batch {
                prop_assert!(o.severity <= MAX_SEVERITY);
            }
            for pair in batch.windows(2) {
                prop_assert!(pair[1].start_date >= pair[0].start_date);
            }
        }
    }
}
