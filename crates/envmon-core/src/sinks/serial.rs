//! Line-oriented serial report

use core::fmt::Write;

use heapless::String;
use thiserror_no_std::Error;

use super::ReadingSink;
use crate::reading::EnvironmentReading;

/// Longest line the sink formats, CRLF included.
pub const LINE_CAPACITY: usize = 96;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialSinkError {
    #[error("formatted line exceeds the line buffer")]
    LineOverflow,
    #[error("serial write failed")]
    Write,
}

/// Writes each reading as CRLF-terminated text lines:
///
/// ```text
/// T=22.5 C  H=45.0 %
/// V=1.000  Rs=80000.0  PPM=4.1  corr=3.2  rzero=28000.0  r/r0=2.9
/// V=0.499, dust 68.700
/// CO2 ALERT!
/// ```
///
/// The climate line gets a ` (stale)` suffix when the values were carried
/// over. The alert line only appears while the alert input is asserted.
pub struct SerialSink<W> {
    out: W,
}

impl<W: Write> SerialSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), SerialSinkError> {
        let formatted = line(args)?;
        self.out
            .write_str(formatted.as_str())
            .map_err(|_| SerialSinkError::Write)
    }
}

/// Format one line into a fixed buffer and terminate it with CRLF.
fn line(args: core::fmt::Arguments<'_>) -> Result<String<LINE_CAPACITY>, SerialSinkError> {
    let mut buf = String::new();
    buf.write_fmt(args)
        .and_then(|_| buf.write_str("\r\n"))
        .map_err(|_| SerialSinkError::LineOverflow)?;
    Ok(buf)
}

impl<W: Write> ReadingSink for SerialSink<W> {
    type Error = SerialSinkError;

    /// Every line is attempted; the first failure is returned.
    fn present(&mut self, r: &EnvironmentReading) -> Result<(), Self::Error> {
        let stale = if r.climate_stale { " (stale)" } else { "" };
        let results = [
            self.emit(format_args!(
                "T={:.1} C  H={:.1} %{}",
                r.temperature_c, r.humidity_pct, stale
            )),
            self.emit(format_args!(
                "V={:.3}  Rs={:.1}  PPM={:.1}  corr={:.1}  rzero={:.1}  r/r0={:.1}",
                r.gas_volts,
                r.gas_resistance_ohm,
                r.gas_ppm,
                r.gas_ppm_corrected,
                r.r_zero_ohm,
                r.resistance_ratio()
            )),
            self.emit(format_args!(
                "V={:.3}, dust {:.3}",
                r.dust_volts, r.dust_ug_m3
            )),
            if r.alert {
                self.emit(format_args!("CO2 ALERT!"))
            } else {
                Ok(())
            },
        ];
        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> EnvironmentReading {
        EnvironmentReading {
            temperature_c: 22.5,
            humidity_pct: 45.0,
            climate_stale: false,
            gas_volts: 1.0,
            gas_resistance_ohm: 80_000.0,
            gas_ppm: 21.8,
            gas_ppm_corrected: 17.3,
            r_zero_ohm: 28_000.0,
            dust_volts: 0.5,
            dust_ug_m3: 68.7,
            alert: false,
        }
    }

    fn render(reading: &EnvironmentReading) -> String<512> {
        let mut sink = SerialSink::new(String::<512>::new());
        sink.present(reading).unwrap();
        sink.into_inner()
    }

    #[test]
    fn test_lines_without_alert() {
        let out = render(&reading());
        let lines: heapless::Vec<&str, 8> = out.split("\r\n").collect();
        assert_eq!(lines[0], "T=22.5 C  H=45.0 %");
        assert_eq!(
            lines[1],
            "V=1.000  Rs=80000.0  PPM=21.8  corr=17.3  rzero=28000.0  r/r0=2.9"
        );
        assert_eq!(lines[2], "V=0.500, dust 68.700");
        assert_eq!(lines[3], "");
        assert!(!out.contains("ALERT"));
    }

    #[test]
    fn test_alert_line() {
        let mut r = reading();
        r.alert = true;
        assert!(render(&r).ends_with("CO2 ALERT!\r\n"));
    }

    #[test]
    fn test_stale_marker() {
        let mut r = reading();
        r.climate_stale = true;
        assert!(render(&r).starts_with("T=22.5 C  H=45.0 % (stale)\r\n"));
    }

    #[test]
    fn test_infinite_resistance_formats() {
        let mut r = reading();
        r.gas_volts = 0.0;
        r.gas_resistance_ohm = f32::INFINITY;
        r.gas_ppm = 0.0;
        r.gas_ppm_corrected = 0.0;
        assert!(render(&r).contains("Rs=inf"));
    }

    /// Port that rejects its first write and accepts the rest.
    struct GlitchingPort {
        rejected: bool,
        out: String<512>,
    }

    impl Write for GlitchingPort {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            if !self.rejected {
                self.rejected = true;
                return Err(core::fmt::Error);
            }
            self.out.write_str(s)
        }
    }

    #[test]
    fn test_failed_line_does_not_drop_later_lines() {
        let mut r = reading();
        r.alert = true;
        let mut sink = SerialSink::new(GlitchingPort {
            rejected: false,
            out: String::new(),
        });
        assert_eq!(sink.present(&r), Err(SerialSinkError::Write));

        let port = sink.into_inner();
        assert!(!port.out.contains("T=22.5"));
        assert!(port.out.contains("V=0.500, dust 68.700\r\n"));
        assert!(port.out.ends_with("CO2 ALERT!\r\n"));
    }

    #[test]
    fn test_writer_failure_propagates() {
        let mut sink = SerialSink::new(String::<8>::new());
        assert_eq!(sink.present(&reading()), Err(SerialSinkError::Write));
    }
}
