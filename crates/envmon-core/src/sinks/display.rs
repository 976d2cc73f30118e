//! Status panel on a color display

use core::fmt::Write;

use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use super::ReadingSink;
use crate::metrics::{Metric, QualityLevel};
use crate::reading::EnvironmentReading;

const BACKGROUND: Rgb565 = Rgb565::BLACK;
const ROW_HEIGHT: i32 = 28;
const MARGIN: i32 = 8;
/// Characters per row; shorter text is padded so the previous value is
/// overwritten.
const ROW_CHARS: usize = 24;

/// Renders one fixed-width text row per quantity, colored by its
/// [`QualityLevel`], plus an alert row.
///
/// Rows are redrawn in place with an opaque background, so no full-screen
/// clear is needed between readings.
pub struct DisplaySink<D> {
    display: D,
}

impl<D> DisplaySink<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    /// Takes the display and clears it once.
    pub fn new(mut display: D) -> Result<Self, D::Error> {
        display.clear(BACKGROUND)?;
        Ok(Self { display })
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn release(self) -> D {
        self.display
    }

    fn draw_row(
        &mut self,
        row: i32,
        color: Rgb565,
        args: core::fmt::Arguments<'_>,
    ) -> Result<(), D::Error> {
        let mut text: String<ROW_CHARS> = String::new();
        // Truncated rows are still drawn
        let _ = text.write_fmt(args);
        while text.len() < ROW_CHARS {
            if text.push(' ').is_err() {
                break;
            }
        }

        let style: MonoTextStyle<'_, Rgb565> = MonoTextStyleBuilder::new()
            .font(&FONT_10X20)
            .text_color(color)
            .background_color(BACKGROUND)
            .build();
        Text::with_baseline(
            &text,
            Point::new(MARGIN, MARGIN + row * ROW_HEIGHT),
            style,
            Baseline::Top,
        )
        .draw(&mut self.display)?;
        Ok(())
    }

    fn clear_row(&mut self, row: i32) -> Result<(), D::Error> {
        let width = self.display.bounding_box().size.width;
        Rectangle::new(
            Point::new(0, MARGIN + row * ROW_HEIGHT),
            Size::new(width, ROW_HEIGHT as u32),
        )
        .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
        .draw(&mut self.display)
    }
}

impl<D> ReadingSink for DisplaySink<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    /// Every row is attempted; the first drawing error is returned.
    fn present(&mut self, r: &EnvironmentReading) -> Result<(), Self::Error> {
        let stale = if r.climate_stale { "?" } else { "" };
        let temperature = QualityLevel::assess(Metric::Temperature, r.temperature_c);
        let humidity = QualityLevel::assess(Metric::Humidity, r.humidity_pct);
        let co2 = QualityLevel::assess(Metric::Co2, r.gas_ppm_corrected);
        let dust = QualityLevel::assess(Metric::Dust, r.dust_ug_m3);

        let results = [
            self.draw_row(
                0,
                temperature.color(),
                format_args!("Temp  {:6.1} C{}", r.temperature_c, stale),
            ),
            self.draw_row(
                1,
                humidity.color(),
                format_args!("Humid {:6.1} %{}", r.humidity_pct, stale),
            ),
            self.draw_row(
                2,
                co2.color(),
                format_args!("CO2   {:6.0} ppm", r.gas_ppm_corrected),
            ),
            self.draw_row(
                3,
                dust.color(),
                format_args!("Dust  {:6.1} ug/m3", r.dust_ug_m3),
            ),
            if r.alert {
                self.draw_row(4, QualityLevel::Bad.color(), format_args!("CO2 ALERT!"))
            } else {
                self.clear_row(4)
            },
        ];
        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }
}
