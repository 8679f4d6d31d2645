/// Numeric representation of calibrated voxel values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F64,
}

impl SampleType {
    /// Representation of stored pixel values as declared by
    /// BitsAllocated and PixelRepresentation.
    pub fn native(bits_allocated: u16, signed: bool) -> Self {
        match (bits_allocated, signed) {
            (8, false) => SampleType::U8,
            (8, true) => SampleType::I8,
            (16, false) => SampleType::U16,
            (16, true) => SampleType::I16,
            (32, false) => SampleType::U32,
            (32, true) => SampleType::I32,
            _ => SampleType::F64,
        }
    }

    /// True when every value in `min..=max` is representable.
    pub fn holds(self, min: f64, max: f64) -> bool {
        let (lo, hi) = match self {
            SampleType::I8 => (f64::from(i8::MIN), f64::from(i8::MAX)),
            SampleType::U8 => (f64::from(u8::MIN), f64::from(u8::MAX)),
            SampleType::I16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            SampleType::U16 => (f64::from(u16::MIN), f64::from(u16::MAX)),
            SampleType::I32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            SampleType::U32 => (f64::from(u32::MIN), f64::from(u32::MAX)),
            SampleType::F64 => return true,
        };
        lo <= min && max <= hi
    }

    /// Type name used in the NRRD `type:` field.
    pub fn nrrd_name(self) -> &'static str {
        match self {
            SampleType::I8 => "int8",
            SampleType::U8 => "uint8",
            SampleType::I16 => "int16",
            SampleType::U16 => "uint16",
            SampleType::I32 => "int32",
            SampleType::U32 => "uint32",
            SampleType::F64 => "double",
        }
    }
}

/// How a filter value is compared against an attribute value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    #[default]
    Contains,
}

impl MatchMode {
    pub fn matches(self, attribute: &str, wanted: &str) -> bool {
        match self {
            MatchMode::Exact => attribute == wanted,
            MatchMode::Contains => attribute.contains(wanted),
        }
    }
}

/// What happens to a selected file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transfer {
    #[default]
    Copy,
    Move,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_checks_both_bounds() {
        assert!(SampleType::U16.holds(0.0, 65535.0));
        assert!(!SampleType::U16.holds(0.0, 66000.0));
        assert!(!SampleType::U16.holds(-100.0, 100.0));
        assert!(SampleType::I16.holds(-32768.0, 32767.0));
        assert!(!SampleType::I8.holds(-129.0, 0.0));
        assert!(SampleType::F64.holds(f64::MIN, f64::MAX));
    }
}
