// src/forecast/training.rs - Feature vectors and training samples for bloom estimators

use std::collections::BTreeSet;

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::history::HistoricalRecord;
use crate::waterbody::WaterbodyProfile;

pub const FEATURE_COUNT: usize = 9;

/// Days since the last bloom assumed when the series does not say
pub const DEFAULT_DAYS_SINCE_BLOOM: f64 = 180.0;

const WINTER_MONTHS: [u32; 5] = [1, 2, 3, 11, 12];

/// Share of observed calendar months with a bloom, in [0, 1]; 0 for an empty series
pub fn bloom_month_fraction(records: &[HistoricalRecord]) -> f64 {
    let observed: BTreeSet<(i32, u32)> = records.iter().map(|r| (r.date.year(), r.date.month())).collect();
    if observed.is_empty() {
        return 0.0;
    }
    let blooming: BTreeSet<(i32, u32)> = records
        .iter()
        .filter(|r| r.is_bloom())
        .map(|r| (r.date.year(), r.date.month()))
        .collect();
    blooming.len() as f64 / observed.len() as f64
}

/// Late summer to mid autumn carries the most bloom pressure
pub fn season_factor(month: u32) -> f64 {
    if (8..=10).contains(&month) {
        1.3
    } else {
        0.7
    }
}

pub fn temperature_factor(month: u32) -> f64 {
    if (6..=8).contains(&month) {
        1.2
    } else {
        0.8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub area_km2: f64,
    pub depth_m: f64,
    pub pollution_source_count: f64,
    pub month: f64,
    pub season_factor: f64,
    pub temperature_factor: f64,
    pub bloom_frequency: f64,
    pub days_since_last_bloom: f64,
    /// Water-quality grade rank, A=1 to E=9
    pub grade_rank: f64,
}

impl FeatureVector {
    pub fn for_month(profile: &WaterbodyProfile, month: u32, days_since_last_bloom: f64) -> Self {
        Self {
            area_km2: profile.area_km2,
            depth_m: profile.depth_m,
            pollution_source_count: profile.pollution_source_count as f64,
            month: month as f64,
            season_factor: season_factor(month),
            temperature_factor: temperature_factor(month),
            bloom_frequency: profile.bloom_frequency(),
            days_since_last_bloom,
            grade_rank: profile.water_quality_grade.rank() as f64,
        }
    }

    pub fn with_bloom_frequency(mut self, frequency: f64) -> Self {
        self.bloom_frequency = frequency;
        self
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.area_km2,
            self.depth_m,
            self.pollution_source_count,
            self.month,
            self.season_factor,
            self.temperature_factor,
            self.bloom_frequency,
            self.days_since_last_bloom,
            self.grade_rank,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub bloom: bool,
    /// Features were made up rather than read off an observation
    pub synthetic: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSet {
    samples: Vec<TrainingSample>,
}

impl TrainingSet {
    pub fn new(samples: Vec<TrainingSample>) -> Self {
        Self { samples }
    }

    /// One observed sample per historical record, plus winter negatives for months with no bloom.
    ///
    /// `bloom_frequency` goes into every sample and must be the value later used for prediction,
    /// normally [`bloom_month_fraction`] of the same records. Winter negatives are rule-made and
    /// flagged synthetic.
    pub fn from_history(profile: &WaterbodyProfile, records: &[HistoricalRecord], bloom_frequency: f64) -> Self {
        let bloom_months: BTreeSet<u32> = records
            .iter()
            .filter(|r| r.is_bloom())
            .map(|r| r.date.month())
            .collect();

        let mut samples: Vec<TrainingSample> = records
            .iter()
            .map(|record| TrainingSample {
                features: FeatureVector::for_month(profile, record.date.month(), DEFAULT_DAYS_SINCE_BLOOM)
                    .with_bloom_frequency(bloom_frequency),
                bloom: record.is_bloom(),
                synthetic: false,
            })
            .collect();

        for month in WINTER_MONTHS.iter().filter(|m| !bloom_months.contains(m)) {
            let mut features = FeatureVector::for_month(profile, *month, 90.0).with_bloom_frequency(bloom_frequency);
            features.season_factor = 0.5;
            features.temperature_factor = 0.6;
            samples.push(TrainingSample {
                features,
                bloom: false,
                synthetic: true,
            });
        }

        let set = Self { samples };
        log::debug!(
            "Prepared {} observed and {} winter samples for {} ({} bloom months)",
            set.observed_count(),
            set.synthetic_count(),
            profile.name,
            bloom_months.len()
        );
        set
    }

    /// Pads the set with seeded random samples around `profile` until it holds `min_samples`
    pub fn augment_with_synthetic(&mut self, profile: &WaterbodyProfile, min_samples: usize, seed: u64) {
        if self.samples.len() >= min_samples {
            return;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let needed = min_samples - self.samples.len();
        for _ in 0..needed {
            let month: u32 = rng.gen_range(1..=12);
            let features = FeatureVector {
                area_km2: profile.area_km2 * rng.gen_range(0.5..1.5),
                depth_m: profile.depth_m * rng.gen_range(0.5..1.5),
                pollution_source_count: (profile.pollution_source_count as f64 * rng.gen_range(0.5..1.5))
                    .round()
                    .max(1.0),
                month: month as f64,
                season_factor: season_factor(month),
                temperature_factor: temperature_factor(month),
                bloom_frequency: rng.gen_range(0.1..0.5),
                days_since_last_bloom: rng.gen_range(30.0..365.0),
                grade_rank: rng.gen_range(3..=7) as f64,
            };
            let bloom = (7..=10).contains(&month) && features.temperature_factor > 1.0 && features.season_factor > 1.0;
            self.samples.push(TrainingSample {
                features,
                bloom,
                synthetic: true,
            });
        }

        log::info!(
            "Added {} synthetic training samples ({} observed)",
            needed,
            self.observed_count()
        );
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn observed_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.synthetic).count()
    }

    pub fn synthetic_count(&self) -> usize {
        self.samples.iter().filter(|s| s.synthetic).count()
    }

    pub fn has_both_classes(&self) -> bool {
        self.samples.iter().any(|s| s.bloom) && self.samples.iter().any(|s| !s.bloom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(year: i32, month: u32, chl: f64) -> HistoricalRecord {
        HistoricalRecord {
            date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            chlorophyll_a: chl,
            ndvi: 0.1,
            fai: 0.0,
            severity: None,
            coverage_estimate: None,
        }
    }

    #[test]
    fn seasonal_factors() {
        assert_eq!(season_factor(9), 1.3);
        assert_eq!(season_factor(6), 0.7);
        assert_eq!(temperature_factor(7), 1.2);
        assert_eq!(temperature_factor(9), 0.8);
    }

    #[test]
    fn feature_vector_uses_profile() {
        let profile = WaterbodyProfile {
            pollution_source_count: 4,
            historical_bloom_count: 3,
            ..WaterbodyProfile::default()
        };
        let features = FeatureVector::for_month(&profile, 8, DEFAULT_DAYS_SINCE_BLOOM);
        let values = features.to_array();
        assert_eq!(values[2], 4.0);
        assert_eq!(values[3], 8.0);
        assert_eq!(values[4], 1.3);
        assert_eq!(values[5], 1.2);
        assert_eq!(values[6], 1.0);
        assert_eq!(values[8], 5.0);
    }

    #[test]
    fn history_samples_include_winter_negatives() {
        let profile = WaterbodyProfile::default();
        let records = vec![record(2023, 1, 4.0), record(2023, 8, 25.0), record(2023, 9, 12.0)];
        let set = TrainingSet::from_history(&profile, &records, bloom_month_fraction(&records));

        // three observed plus winter months 1, 2, 3, 11, 12
        assert_eq!(set.len(), 8);
        assert_eq!(set.observed_count(), 3);
        assert_eq!(set.synthetic_count(), 5);
        assert!(set.has_both_classes());
        assert_eq!(set.samples().iter().filter(|s| s.bloom).count(), 2);
    }

    #[test]
    fn bloom_fraction_counts_calendar_months() {
        // August appears twice in the same month; three distinct months, two with blooms
        let records = vec![
            record(2023, 7, 4.0),
            record(2023, 8, 25.0),
            HistoricalRecord {
                date: NaiveDate::from_ymd_opt(2023, 8, 15).unwrap(),
                ..record(2023, 8, 30.0)
            },
            record(2023, 9, 12.0),
        ];
        assert_eq!(bloom_month_fraction(&records), 2.0 / 3.0);
        assert_eq!(bloom_month_fraction(&[]), 0.0);

        let set = TrainingSet::from_history(&WaterbodyProfile::default(), &records, 2.0 / 3.0);
        assert!(set.samples().iter().all(|s| s.features.bloom_frequency == 2.0 / 3.0));
    }

    #[test]
    fn synthetic_padding_is_flagged_and_reproducible() {
        let profile = WaterbodyProfile::default();
        let mut first = TrainingSet::default();
        first.augment_with_synthetic(&profile, 20, 7);
        let mut second = TrainingSet::default();
        second.augment_with_synthetic(&profile, 20, 7);

        assert_eq!(first.len(), 20);
        assert_eq!(first.synthetic_count(), 20);
        assert_eq!(first.samples(), second.samples());
        for sample in first.samples() {
            assert_eq!(sample.bloom, sample.features.month == 8.0);
            assert!(sample.features.pollution_source_count >= 1.0);
        }
    }

    #[test]
    fn padding_skipped_when_enough_samples() {
        let profile = WaterbodyProfile::default();
        let records: Vec<_> = (1..=12).map(|m| record(2022, m, 5.0)).collect();
        let mut set = TrainingSet::from_history(&profile, &records, 0.0);
        let before = set.len();
        set.augment_with_synthetic(&profile, 10, 1);
        assert_eq!(set.len(), before);
    }
}
