//! Main-loop acquisition
//!
//! [`Acquisition`] runs in the non-interrupt context. Each time the report
//! interrupt has raised the due flag it performs all blocking reads (alert
//! pin, climate sensor, gas channel), picks up whatever dust sample the pulse
//! interrupt produced last, and turns the lot into an [`EnvironmentReading`].
//!
//! Nothing here is retried and nothing is fatal. A failed read degrades the
//! reading (stale climate, rail-level gas value) but a reading is always
//! produced.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::analog::{AnalogSampler, Channel, RawSample, SharedConverter};
use crate::config::MonitorConfig;
use crate::dust::DustSlot;
use crate::gas::{BaselineCalibrator, CalibrationError};
use crate::reading::EnvironmentReading;
use crate::report::ReportScheduler;
use crate::sensors::{ClimateReading, Dht12};

pub struct Acquisition<'a, I, A, S> {
    climate: Dht12<I>,
    /// Active-low comparator output
    alert: A,
    converter: &'a SharedConverter<S>,
    dust: &'a DustSlot,
    scheduler: &'a ReportScheduler,
    config: MonitorConfig,
    last_climate: Option<ClimateReading>,
    dust_warned: bool,
}

impl<'a, I, A, S> Acquisition<'a, I, A, S>
where
    I: I2c,
    A: InputPin,
    S: AnalogSampler,
{
    pub fn new(
        climate: Dht12<I>,
        alert: A,
        converter: &'a SharedConverter<S>,
        dust: &'a DustSlot,
        scheduler: &'a ReportScheduler,
        config: MonitorConfig,
    ) -> Self {
        Self {
            climate,
            alert,
            converter,
            dust,
            scheduler,
            config,
            last_climate: None,
            dust_warned: false,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Check the due flag and, if it was raised, run one acquisition pass.
    ///
    /// The flag is cleared before the pass starts. Any number of report ticks
    /// that arrived since the previous poll yield exactly one reading.
    pub fn poll(&mut self) -> Option<EnvironmentReading> {
        if !self.scheduler.take_due() {
            return None;
        }

        let lost = self.scheduler.take_overruns();
        if lost > 0 {
            warn!("Report overrun: {} cycle(s) coalesced", lost);
        }

        Some(self.acquire())
    }

    /// One unconditional acquisition pass.
    pub fn acquire(&mut self) -> EnvironmentReading {
        let alert = self.read_alert();
        let (climate, climate_stale) = self.read_climate();
        let gas_raw = self.sample_gas();
        let dust_raw = self.latest_dust();

        let cfg = &self.config;
        let gas_volts = cfg.adc.to_volts(gas_raw);
        let gas_resistance_ohm = cfg
            .gas
            .resistance_from_voltage(cfg.gas_supply_volts, gas_volts);
        let gas_ppm = cfg.gas.concentration_ppm(gas_resistance_ohm);
        let gas_ppm_corrected = cfg.gas.corrected_concentration_ppm(
            climate.temperature_c,
            climate.humidity_pct,
            gas_resistance_ohm,
        );

        let dust_volts = cfg.adc.to_volts(dust_raw);
        let dust_ug_m3 = cfg.dust.density(dust_volts);

        EnvironmentReading {
            temperature_c: climate.temperature_c,
            humidity_pct: climate.humidity_pct,
            climate_stale,
            gas_volts,
            gas_resistance_ohm,
            gas_ppm,
            gas_ppm_corrected,
            r_zero_ohm: cfg.gas.r_zero,
            dust_volts,
            dust_ug_m3,
            alert,
        }
    }

    /// Derive R0 from `samples` clean-air readings spaced `interval_ms` apart
    /// and adopt it.
    ///
    /// Meant to run once at boot, before the timers are started.
    pub fn calibrate_baseline<D: DelayNs>(
        &mut self,
        samples: u32,
        interval_ms: u32,
        delay: &mut D,
    ) -> Result<f32, CalibrationError> {
        info!("Calibrating gas baseline over {} samples", samples);
        let mut calibrator = BaselineCalibrator::new();

        for _ in 0..samples {
            let (climate, _) = self.read_climate();
            let raw = self.sample_gas();
            let volts = self.config.adc.to_volts(raw);
            let rs = self
                .config
                .gas
                .resistance_from_voltage(self.config.gas_supply_volts, volts);
            calibrator.add(
                &self.config.gas,
                climate.temperature_c,
                climate.humidity_pct,
                rs,
            );
            delay.delay_ms(interval_ms);
        }

        let r_zero = calibrator.finish()?;
        self.config.gas = self.config.gas.with_r_zero(r_zero);
        Ok(r_zero)
    }

    fn read_alert(&mut self) -> bool {
        self.alert.is_low().unwrap_or_else(|e| {
            error!("Alert pin read failed: {:?}", e);
            false
        })
    }

    /// Fresh climate values, or the previous good ones flagged stale.
    fn read_climate(&mut self) -> (ClimateReading, bool) {
        match self.climate.read() {
            Ok(reading) => {
                self.last_climate = Some(reading);
                (reading, false)
            }
            Err(e) => {
                warn!("{}; reusing previous climate values", e);
                (self.last_climate.unwrap_or_default(), true)
            }
        }
    }

    fn sample_gas(&mut self) -> RawSample {
        let raw = self.converter.sample(Channel::Gas).unwrap_or_else(|e| {
            error!("Gas conversion failed: {}", e);
            RawSample(0)
        });
        if raw.is_at_rail(&self.config.adc) {
            warn!("Gas channel at rail: {}", raw.value());
        }
        raw
    }

    fn latest_dust(&mut self) -> RawSample {
        let raw = self.dust.latest();
        if self.dust.generation() == 0 {
            if !self.dust_warned {
                warn!("No dust sample captured yet");
                self.dust_warned = true;
            }
        } else if raw.is_at_rail(&self.config.adc) {
            warn!("Dust channel at rail: {}", raw.value());
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analog::ConverterError;
    use crate::gas::GasCalibration;
    use crate::sensors::DHT12_ADDRESS;
    use crate::testing::{FakeBus, FixedSampler, LevelPin};

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    struct Fixture {
        converter: SharedConverter<FixedSampler>,
        dust: DustSlot,
        scheduler: ReportScheduler,
    }

    impl Fixture {
        fn new(gas: u16, dust: u16) -> Self {
            let converter = SharedConverter::new();
            converter.install(FixedSampler::new(gas, dust));
            Self {
                converter,
                dust: DustSlot::new(),
                scheduler: ReportScheduler::new(),
            }
        }

        fn acquisition(
            &self,
            bus: FakeBus,
            alert_high: bool,
        ) -> Acquisition<'_, FakeBus, LevelPin, FixedSampler> {
            Acquisition::new(
                Dht12::new(bus, DHT12_ADDRESS),
                LevelPin { high: alert_high },
                &self.converter,
                &self.dust,
                &self.scheduler,
                MonitorConfig::DEFAULT,
            )
        }
    }

    #[test]
    fn test_poll_without_due_does_nothing() {
        let fixture = Fixture::new(205, 102);
        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), true);
        assert!(acquisition.poll().is_none());
        assert!(fixture.converter.take().unwrap().conversions.is_empty());
    }

    #[test]
    fn test_double_tick_gives_one_pass() {
        let fixture = Fixture::new(205, 102);
        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), true);

        fixture.scheduler.on_tick();
        fixture.scheduler.on_tick();

        assert!(acquisition.poll().is_some());
        assert!(acquisition.poll().is_none());

        let conversions = fixture.converter.take().unwrap().conversions;
        assert_eq!(conversions.as_slice(), &[Channel::Gas]);
    }

    #[test]
    fn test_reading_combines_all_sources() {
        let fixture = Fixture::new(205, 102);
        fixture.dust.store(RawSample(102));
        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), false);

        let reading = acquisition.acquire();
        let gas = GasCalibration::DEFAULT;

        assert_eq!(reading.temperature_c, 25.0);
        assert_eq!(reading.humidity_pct, 50.0);
        assert!(!reading.climate_stale);
        assert!(reading.alert, "alert is active low");

        let volts = 5.0 * 205.0 / 1023.0;
        let rs = gas.resistance_from_voltage(5.0, volts);
        assert!((reading.gas_volts - volts).abs() < 1e-4);
        assert!((reading.gas_resistance_ohm - rs).abs() < 1.0);
        assert!((reading.gas_ppm - gas.concentration_ppm(rs)).abs() < 1e-2);
        assert!(
            (reading.gas_ppm_corrected - gas.corrected_concentration_ppm(25.0, 50.0, rs)).abs()
                < 1e-2
        );
        assert!((reading.dust_ug_m3 - 68.7).abs() < 0.05);
        assert_eq!(reading.r_zero_ohm, 28_000.0);
    }

    #[test]
    fn test_dust_not_forced_fresh() {
        let fixture = Fixture::new(205, 900);
        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), true);

        // pulse interrupt has not run: the slot's initial value is used
        let reading = acquisition.acquire();
        assert_eq!(reading.dust_volts, 0.0);
        assert_eq!(reading.dust_ug_m3, 0.0);
    }

    #[test]
    fn test_climate_failure_reuses_previous_values() {
        let fixture = Fixture::new(205, 102);
        let mut acquisition = fixture.acquisition(FakeBus::answering([40, 5, 21, 3]), true);

        let first = acquisition.acquire();
        assert!(!first.climate_stale);

        acquisition.climate = Dht12::new(FakeBus::failing(), DHT12_ADDRESS);
        let second = acquisition.acquire();
        assert!(second.climate_stale);
        assert_eq!(second.temperature_c, first.temperature_c);
        assert_eq!(second.humidity_pct, first.humidity_pct);
    }

    #[test]
    fn test_climate_failure_before_any_success() {
        let fixture = Fixture::new(205, 102);
        let mut acquisition = fixture.acquisition(FakeBus::failing(), true);
        let reading = acquisition.acquire();
        assert!(reading.climate_stale);
        assert_eq!(reading.temperature_c, 0.0);
        assert!(reading.gas_ppm.is_finite());
    }

    #[test]
    fn test_gas_rail_passes_through() {
        let fixture = Fixture::new(0, 102);
        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), true);
        let reading = acquisition.acquire();
        assert_eq!(reading.gas_resistance_ohm, f32::INFINITY);
        assert_eq!(reading.gas_ppm, 0.0);
    }

    #[test]
    fn test_missing_converter_still_reports() {
        let fixture = Fixture::new(205, 102);
        assert!(fixture.converter.take().is_some());
        assert_eq!(
            fixture.converter.sample(Channel::Gas),
            Err(ConverterError::NotInstalled)
        );

        let mut acquisition = fixture.acquisition(FakeBus::answering([50, 0, 25, 0]), true);
        let reading = acquisition.acquire();
        assert_eq!(reading.gas_volts, 0.0);
    }

    #[test]
    fn test_calibrate_baseline_adopts_r_zero() {
        let fixture = Fixture::new(205, 102);
        let mut acquisition = fixture.acquisition(FakeBus::answering([33, 0, 20, 0]), true);

        let r_zero = acquisition.calibrate_baseline(4, 10, &mut NoDelay).unwrap();
        assert_eq!(acquisition.config().gas.r_zero, r_zero);

        // clean-air reading now maps back onto the atmospheric reference
        let reading = acquisition.acquire();
        assert!(
            (reading.gas_ppm_corrected - GasCalibration::DEFAULT.atmospheric_ppm).abs() < 0.5,
            "got {}",
            reading.gas_ppm_corrected
        );
    }
}
