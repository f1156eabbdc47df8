use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::drivers::classify::{alpha_theta_ratio, RatioClassifier};
use crate::drivers::color::mood_color_with_epsilon;
use crate::drivers::error::PipelineError;
use crate::drivers::filter::BandFilter;
use crate::drivers::power::{combine, mean_square};
use crate::drivers::source::SampleSet;
use crate::drivers::spectrum::{FrequencySpectrum, SpectrumBuilder};
use crate::drivers::{ChannelBank, WindowSnapshot};
use crate::types::{BandKind, ChannelPowers, ResultRecord};

/// Buffers, filter bank and decision logic for one stream.
///
/// Each call to [`BandPowerPipeline::process`] takes a single immutable
/// snapshot of the windows as they would look with the new sample-set pushed,
/// evaluates every (band, channel) pair against it, aggregates per band and
/// derives the ratio, label and colour. The push is committed only once the
/// record is complete, so a rejected sample-set never reaches the buffers.
/// Nothing but the buffers survives between calls.
pub struct BandPowerPipeline {
    config: PipelineConfig,
    bank: ChannelBank,
    filters: Vec<BandFilter>,
    classifier: RatioClassifier,
    processed: u64,
}

impl BandPowerPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let filters = config.build_filters()?;
        let bank = ChannelBank::new(
            config.channels.clone(),
            config.sampling_rate_hz,
            config.window_size,
        )?;
        let classifier = RatioClassifier::new(config.thresholds, config.epsilon);
        Ok(Self {
            config,
            bank,
            filters,
            classifier,
            processed: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn latest_spectrum(&self, fft_size: usize) -> FrequencySpectrum {
        SpectrumBuilder::with_size(fft_size).compute(&self.bank.snapshot())
    }

    pub fn process(&mut self, set: &SampleSet) -> Result<ResultRecord, PipelineError> {
        let values = self.bank.validate(set)?;
        let snapshot = self.bank.preview(&values);
        let powers = self.band_channel_powers(&snapshot)?;

        let mut band_powers = BTreeMap::new();
        for (filter, per_channel) in self.filters.iter().zip(&powers) {
            band_powers.insert(filter.band().kind, combine(per_channel)?);
        }
        let get = |kind: BandKind| band_powers.get(&kind).copied();
        let (delta, theta, alpha, beta) = (
            get(BandKind::Delta),
            get(BandKind::Theta),
            get(BandKind::Alpha),
            get(BandKind::Beta),
        );
        let eps = self.config.epsilon;
        let alpha_theta = match (alpha, theta) {
            (Some(a), Some(t)) => Some(alpha_theta_ratio(a, t, eps).0),
            _ => None,
        };
        let (classification, color) = match (theta, alpha, beta) {
            (Some(t), Some(a), Some(b)) => (
                Some(self.classifier.classify(t, a, b)?),
                Some(mood_color_with_epsilon(delta.unwrap_or(0.0), t, a, b, eps)?),
            ),
            _ => (None, None),
        };
        let channels = if self.config.per_channel_detail {
            self.channel_detail(&snapshot, &powers)
        } else {
            Vec::new()
        };

        let record = ResultRecord {
            sequence: self.processed,
            timestamp: set.timestamp,
            warm: snapshot.warm,
            band_powers,
            alpha_theta_ratio: alpha_theta,
            classification,
            color,
            channels,
        };
        self.bank.commit(values);
        self.processed += 1;
        debug!(
            "record #{} warm={} ratio={:?} state={:?} color={}",
            record.sequence,
            record.warm,
            record.alpha_theta_ratio,
            record.state(),
            record
                .color
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".into())
        );
        Ok(record)
    }

    /// Powers indexed `[band][channel]`, in configuration order either way.
    fn band_channel_powers(
        &self,
        snapshot: &WindowSnapshot,
    ) -> Result<Vec<Vec<f64>>, PipelineError> {
        let channels = snapshot.samples.len();
        if channels == 0 {
            return Err(PipelineError::NoChannels);
        }
        let pairs: Vec<(usize, usize)> = (0..self.filters.len())
            .flat_map(|b| (0..channels).map(move |c| (b, c)))
            .collect();
        let eval = |&(b, c): &(usize, usize)| -> Result<f64, PipelineError> {
            self.filters[b]
                .apply(&snapshot.samples[c])
                .map(|filtered| mean_square(&filtered))
        };
        let flat: Vec<f64> = if self.config.parallel {
            pairs.par_iter().map(eval).collect::<Result<_, _>>()?
        } else {
            pairs.iter().map(eval).collect::<Result<_, _>>()?
        };
        Ok(flat.chunks(channels).map(<[f64]>::to_vec).collect())
    }

    fn channel_detail(&self, snapshot: &WindowSnapshot, powers: &[Vec<f64>]) -> Vec<ChannelPowers> {
        snapshot
            .channel_labels
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let band_powers: BTreeMap<BandKind, f64> = self
                    .filters
                    .iter()
                    .zip(powers)
                    .map(|(filter, per_channel)| (filter.band().kind, per_channel[c]))
                    .collect();
                let ratio = match (
                    band_powers.get(&BandKind::Alpha),
                    band_powers.get(&BandKind::Theta),
                ) {
                    (Some(&a), Some(&t)) => Some(alpha_theta_ratio(a, t, self.config.epsilon).0),
                    _ => None,
                };
                ChannelPowers {
                    channel: label.clone(),
                    band_powers,
                    alpha_theta_ratio: ratio,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{SampleSource, SyntheticRhythms, SyntheticSource};
    use crate::types::{Band, MentalState};

    fn run(config: PipelineConfig, source: &mut dyn SampleSource) -> Vec<ResultRecord> {
        let mut pipeline = BandPowerPipeline::new(config).unwrap();
        let mut out = Vec::new();
        while let Some(set) = source.next_sample_set().unwrap() {
            out.push(pipeline.process(&set).unwrap());
        }
        out
    }

    fn synthetic(config: &PipelineConfig, count: usize, rhythms: SyntheticRhythms) -> SyntheticSource {
        SyntheticSource::new(config.channels.clone(), config.sampling_rate_hz, count, 11)
            .with_rhythms(rhythms)
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            window_size: 64,
            ..PipelineConfig::playback()
        }
    }

    #[test]
    fn one_record_per_sample_set_with_warm_up_flag() {
        let config = small_config();
        let n = config.window_size;
        let k = 9;
        let mut source = synthetic(&config, n + k, SyntheticRhythms::default());
        let records = run(config, &mut source);
        assert_eq!(records.len(), n + k);
        assert!(records[..n - 1].iter().all(|r| !r.warm));
        assert!(records[n - 1..].iter().all(|r| r.warm));
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.sequence, i as u64);
            assert_eq!(r.band_powers.len(), 4);
            assert!(r.band_powers.values().all(|p| p.is_finite() && *p >= 0.0));
            assert!(r.classification.is_some());
            assert!(r.color.is_some());
        }
    }

    #[test]
    fn fresh_pipelines_are_bit_identical() {
        let config = small_config();
        let a = run(config.clone(), &mut synthetic(&config, 150, SyntheticRhythms::default()));
        let b = run(config.clone(), &mut synthetic(&config, 150, SyntheticRhythms::default()));
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = small_config();
        let parallel = PipelineConfig {
            parallel: true,
            ..config.clone()
        };
        let a = run(config.clone(), &mut synthetic(&config, 100, SyntheticRhythms::default()));
        let b = run(parallel, &mut synthetic(&config, 100, SyntheticRhythms::default()));
        assert_eq!(a, b);
    }

    fn last_state(rhythms: SyntheticRhythms) -> ResultRecord {
        let config = PipelineConfig::playback();
        let mut source = synthetic(&config, 2 * config.window_size, rhythms);
        run(config, &mut source).pop().unwrap()
    }

    #[test]
    fn dominant_alpha_reads_relaxed() {
        let record = last_state(SyntheticRhythms {
            theta: 0.2,
            alpha: 2.0,
            beta: 0.1,
            noise: 0.0,
        });
        assert_eq!(record.state(), Some(MentalState::Relaxed));
        assert!(record.alpha_theta_ratio.unwrap() > 10.0);
        let color = record.color.unwrap();
        assert!(color.red > color.green);
    }

    #[test]
    fn dominant_theta_reads_drowsy_or_concentrating() {
        let drowsy = last_state(SyntheticRhythms {
            theta: 2.0,
            alpha: 0.2,
            beta: 0.1,
            noise: 0.0,
        });
        assert_eq!(drowsy.state(), Some(MentalState::Drowsy));
        let color = drowsy.color.unwrap();
        assert!(color.green > color.red);

        let focused = last_state(SyntheticRhythms {
            theta: 2.0,
            alpha: 0.2,
            beta: 2.0,
            noise: 0.0,
        });
        assert_eq!(focused.state(), Some(MentalState::Concentrating));
    }

    #[test]
    fn silent_stream_stays_finite() {
        let config = small_config();
        let mut source = synthetic(
            &config,
            80,
            SyntheticRhythms {
                theta: 0.0,
                alpha: 0.0,
                beta: 0.0,
                noise: 0.0,
            },
        );
        for record in run(config, &mut source) {
            assert!(record.band_powers.values().all(|&p| p == 0.0));
            assert_eq!(record.alpha_theta_ratio, Some(0.0));
            let c = record.classification.unwrap();
            assert!(c.denominator_clamped);
            assert_eq!(c.state, MentalState::Drowsy);
            assert_eq!(record.color.unwrap().hex(), "0x00ff00");
        }
    }

    #[test]
    fn missing_bands_drop_label_and_colour() {
        let config = PipelineConfig {
            bands: vec![Band::standard(BandKind::Alpha)],
            ..small_config()
        };
        let mut source = synthetic(&config, 70, SyntheticRhythms::default());
        let record = run(config, &mut source).pop().unwrap();
        assert!(record.band_power(BandKind::Alpha).is_some());
        assert!(record.alpha_theta_ratio.is_none());
        assert!(record.classification.is_none());
        assert!(record.color.is_none());
    }

    #[test]
    fn detail_view_reports_each_channel() {
        let config = PipelineConfig::detail_view();
        let mut source = synthetic(&config, 140, SyntheticRhythms::default());
        let record = run(config.clone(), &mut source).pop().unwrap();
        assert_eq!(record.channels.len(), config.channels.len());
        for (detail, label) in record.channels.iter().zip(&config.channels) {
            assert_eq!(&detail.channel, label);
            assert_eq!(detail.band_powers.len(), 3);
            assert!(detail.alpha_theta_ratio.is_some());
        }
        // delta is absent from this preset, colour still derives from theta/alpha/beta
        assert!(record.band_power(BandKind::Delta).is_none());
        assert!(record.color.is_some());
    }

    #[test]
    fn rejected_set_does_not_consume_a_sequence_number() {
        let mut pipeline = BandPowerPipeline::new(small_config()).unwrap();
        let full = |v: f64| {
            SampleSet::new(None)
                .with("TP9", v)
                .with("AF7", v)
                .with("AF8", v)
                .with("TP10", v)
        };
        pipeline.process(&full(1.0)).unwrap();
        let err = pipeline
            .process(&SampleSet::new(None).with("TP9", 1.0))
            .unwrap_err();
        assert!(err.is_invalid_input());
        let next = pipeline.process(&full(2.0)).unwrap();
        assert_eq!(next.sequence, 1);
    }

    #[test]
    fn overflowing_sample_is_rejected_without_poisoning_the_window() {
        let config = PipelineConfig {
            window_size: 32,
            ..PipelineConfig::playback()
        };
        let sets: Vec<SampleSet> = (0..40)
            .map(|i| {
                let v = (i as f64 * 0.3).sin();
                SampleSet::new(Some(i as f64))
                    .with("TP9", v)
                    .with("AF7", -v)
                    .with("AF8", 0.5 * v)
                    .with("TP10", 2.0 * v)
            })
            .collect();
        let mut clean = BandPowerPipeline::new(config.clone()).unwrap();
        let mut hit = BandPowerPipeline::new(config).unwrap();
        let huge = sets[0].clone().with("TP9", 1e200);
        let err = hit.process(&huge).unwrap_err();
        assert!(err.is_invalid_input(), "{err}");
        for set in &sets {
            let expected = clean.process(set).unwrap();
            assert_eq!(hit.process(set).unwrap(), expected);
        }
    }

    #[test]
    fn spectrum_view_uses_current_windows() {
        let config = PipelineConfig::playback();
        let mut pipeline = BandPowerPipeline::new(config.clone()).unwrap();
        let mut source = synthetic(
            &config,
            256,
            SyntheticRhythms {
                theta: 0.0,
                alpha: 1.0,
                beta: 0.0,
                noise: 0.0,
            },
        );
        while let Some(set) = source.next_sample_set().unwrap() {
            pipeline.process(&set).unwrap();
        }
        let spectrum = pipeline.latest_spectrum(256);
        assert_eq!(spectrum.channel_labels, config.channels);
        assert_eq!(spectrum.peak_frequency(0), Some(10.0));
    }
}
