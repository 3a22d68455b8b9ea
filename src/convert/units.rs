//! Byte units and scales

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("size pattern is valid"));

/// Multiplier between adjacent units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitBase {
    /// Powers of 1000
    #[default]
    Decimal,
    /// Powers of 1024
    Binary,
}

impl UnitBase {
    /// Pick the base from a "use binary units" flag
    pub fn select(use_binary: bool) -> Self {
        if use_binary {
            Self::Binary
        } else {
            Self::Decimal
        }
    }

    /// Bytes in one kilobyte
    pub fn kilobyte(self) -> f64 {
        match self {
            Self::Decimal => 1000.0,
            Self::Binary => 1024.0,
        }
    }
}

/// Byte factor for every unit under one base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    kilobyte: f64,
    megabyte: f64,
    gigabyte: f64,
    terabyte: f64,
}

impl UnitScale {
    /// Build the cascade of factors for `base`
    pub fn new(base: UnitBase) -> Self {
        let kilobyte = base.kilobyte();
        let megabyte = kilobyte * kilobyte;
        let gigabyte = megabyte * kilobyte;
        Self {
            kilobyte,
            megabyte,
            gigabyte,
            terabyte: gigabyte * kilobyte,
        }
    }

    /// Bytes in one `unit`
    pub fn factor(&self, unit: ByteUnit) -> f64 {
        match unit {
            ByteUnit::Bytes => 1.0,
            ByteUnit::Kilobytes => self.kilobyte,
            ByteUnit::Megabytes => self.megabyte,
            ByteUnit::Gigabytes => self.gigabyte,
            ByteUnit::Terabytes => self.terabyte,
        }
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(UnitBase::default())
    }
}

/// Unit suffix of a size string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl FromStr for ByteUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BYTES" | "BYTE" | "B" => Ok(Self::Bytes),
            "KB" => Ok(Self::Kilobytes),
            "MB" => Ok(Self::Megabytes),
            "GB" => Ok(Self::Gigabytes),
            "TB" => Ok(Self::Terabytes),
            _ => Err(Error::conversion(s, "unknown unit")),
        }
    }
}

/// Parse `"<number> <unit>"` into bytes
pub fn parse_size(text: &str, scale: &UnitScale) -> Result<f64> {
    let captures = SIZE_PATTERN
        .captures(text)
        .ok_or_else(|| Error::conversion(text, "expected '<number> <unit>'"))?;

    let amount: f64 = captures[1]
        .parse()
        .map_err(|e| Error::conversion(text, format!("{e}")))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::conversion(text, "size must be a finite, non-negative number"));
    }

    let unit: ByteUnit = captures[2]
        .parse()
        .map_err(|_| Error::conversion(text, format!("unknown unit '{}'", &captures[2])))?;

    Ok(amount * scale.factor(unit))
}
