//! Unit tables for the quantities that appear in geometry and material documents.
//!
//! Every produced value is stored in a canonical unit: millimetres for lengths,
//! radians for angles, g/cm3 for densities and kelvin for temperatures.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::InputError;

/// A unit of length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum LengthUnit {
    Nanometer,
    Micrometer,
    #[default]
    Millimeter,
    Centimeter,
    Meter,
    Kilometer,
}

impl LengthUnit {
    /// Number of millimetres in one of this unit.
    #[must_use]
    pub fn to_mm(self) -> f64 {
        match self {
            Self::Nanometer => 1e-6,
            Self::Micrometer => 1e-3,
            Self::Millimeter => 1.0,
            Self::Centimeter => 10.0,
            Self::Meter => 1e3,
            Self::Kilometer => 1e6,
        }
    }
}

impl FromStr for LengthUnit {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "nm" => Ok(Self::Nanometer),
            "um" | "µm" | "micrometer" => Ok(Self::Micrometer),
            "mm" | "millimeter" => Ok(Self::Millimeter),
            "cm" | "centimeter" => Ok(Self::Centimeter),
            "m" | "meter" => Ok(Self::Meter),
            "km" | "kilometer" => Ok(Self::Kilometer),
            other => Err(InputError::UnknownUnit {
                quantity: "length",
                unit: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for LengthUnit {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A unit of plane angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum AngleUnit {
    Radian,
    Milliradian,
    #[default]
    Degree,
}

impl AngleUnit {
    /// Number of radians in one of this unit.
    #[must_use]
    pub fn to_rad(self) -> f64 {
        match self {
            Self::Radian => 1.0,
            Self::Milliradian => 1e-3,
            Self::Degree => std::f64::consts::PI / 180.0,
        }
    }
}

impl FromStr for AngleUnit {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rad" | "radian" => Ok(Self::Radian),
            "mrad" | "milliradian" => Ok(Self::Milliradian),
            "deg" | "degree" => Ok(Self::Degree),
            other => Err(InputError::UnknownUnit {
                quantity: "angle",
                unit: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for AngleUnit {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A unit of mass density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityUnit {
    #[default]
    GramPerCm3,
    MilligramPerCm3,
    KilogramPerM3,
}

impl DensityUnit {
    /// Number of g/cm3 in one of this unit.
    #[must_use]
    pub fn to_g_per_cm3(self) -> f64 {
        match self {
            Self::GramPerCm3 => 1.0,
            Self::MilligramPerCm3 | Self::KilogramPerM3 => 1e-3,
        }
    }
}

impl FromStr for DensityUnit {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "g/cm3" | "g/cm^3" | "g/cc" => Ok(Self::GramPerCm3),
            "mg/cm3" | "mg/cm^3" => Ok(Self::MilligramPerCm3),
            "kg/m3" | "kg/m^3" => Ok(Self::KilogramPerM3),
            other => Err(InputError::UnknownUnit {
                quantity: "density",
                unit: other.to_owned(),
            }),
        }
    }
}

/// A unit of temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Kelvin,
    Celsius,
}

impl TemperatureUnit {
    /// Converts a value in this unit to kelvin.
    #[must_use]
    pub fn to_kelvin(self, value: f64) -> f64 {
        match self {
            Self::Kelvin => value,
            Self::Celsius => value + 273.15,
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "K" | "kelvin" => Ok(Self::Kelvin),
            "C" | "celsius" => Ok(Self::Celsius),
            other => Err(InputError::UnknownUnit {
                quantity: "temperature",
                unit: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn length_scales_to_millimetres() {
        assert!((LengthUnit::Centimeter.to_mm() - 10.0).abs() < 1e-12);
        assert!((LengthUnit::Meter.to_mm() - 1000.0).abs() < 1e-12);
        assert_eq!("cm".parse::<LengthUnit>().unwrap(), LengthUnit::Centimeter);
    }

    #[test]
    fn unknown_length_unit_is_rejected() {
        let err = "furlong".parse::<LengthUnit>().unwrap_err();
        assert!(matches!(err, InputError::UnknownUnit { quantity: "length", .. }));
    }

    #[test]
    fn degrees_convert_to_radians() {
        let deg = AngleUnit::Degree.to_rad();
        assert!((90.0 * deg - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn celsius_is_offset_not_scaled() {
        assert!((TemperatureUnit::Celsius.to_kelvin(0.0) - 273.15).abs() < 1e-12);
        assert!((TemperatureUnit::Kelvin.to_kelvin(165.0) - 165.0).abs() < 1e-12);
    }

    #[test]
    fn density_units() {
        assert!((DensityUnit::KilogramPerM3.to_g_per_cm3() * 1000.0 - 1.0).abs() < 1e-12);
        assert_eq!("g/cm3".parse::<DensityUnit>().unwrap(), DensityUnit::GramPerCm3);
    }
}
