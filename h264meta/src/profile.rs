//! Profile identification from the `profile_idc` / constraint-flag pair.

use bitflags::bitflags;
use derive_more::Display;

bitflags! {
    /// The constraint-flag byte following `profile_idc`, bit 7 first.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ConstraintFlags: u8 {
        /// `constraint_set0_flag`
        const SET0 = 0x80;
        /// `constraint_set1_flag`
        const SET1 = 0x40;
        /// `constraint_set2_flag`
        const SET2 = 0x20;
        /// `constraint_set3_flag`
        const SET3 = 0x10;
        /// `constraint_set4_flag`
        const SET4 = 0x08;
        /// `constraint_set5_flag`
        const SET5 = 0x04;
    }
}

/// A named H.264 profile, identified bit-for-bit from `profile_idc` and the constraint flags.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Profile {
    #[display(fmt = "Baseline")]
    Baseline,
    #[display(fmt = "Constrained Baseline")]
    ConstrainedBaseline,
    #[display(fmt = "Main")]
    Main,
    #[display(fmt = "Extended")]
    Extended,
    #[display(fmt = "High")]
    High,
    #[display(fmt = "Progressive High")]
    ProgressiveHigh,
    #[display(fmt = "Constrained High")]
    ConstrainedHigh,
    #[display(fmt = "High 10")]
    High10,
    #[display(fmt = "High 10 Intra")]
    High10Intra,
    #[display(fmt = "High 4:2:2")]
    High422,
    #[display(fmt = "High 4:2:2 Intra")]
    High422Intra,
    #[display(fmt = "High 4:4:4 Predictive")]
    High444Predictive,
    #[display(fmt = "High 4:4:4 Intra")]
    High444Intra,
    #[display(fmt = "CAVLC 4:4:4 Intra")]
    Cavlc444Intra,
}

impl Profile {
    /// Identify the named profile for a `profile_idc` / constraint-flag pair, if any.
    pub fn identify(profile_idc: u8, constraints: ConstraintFlags) -> Option<Self> {
        let profile = match profile_idc {
            66 if constraints.contains(ConstraintFlags::SET1) => Self::ConstrainedBaseline,
            66 => Self::Baseline,
            77 => Self::Main,
            88 => Self::Extended,
            100 if constraints.contains(ConstraintFlags::SET4 | ConstraintFlags::SET5) => Self::ConstrainedHigh,
            100 if constraints.contains(ConstraintFlags::SET4) => Self::ProgressiveHigh,
            100 => Self::High,
            110 if constraints.contains(ConstraintFlags::SET3) => Self::High10Intra,
            110 => Self::High10,
            122 if constraints.contains(ConstraintFlags::SET3) => Self::High422Intra,
            122 => Self::High422,
            244 if constraints.contains(ConstraintFlags::SET3) => Self::High444Intra,
            244 => Self::High444Predictive,
            44 => Self::Cavlc444Intra,
            _ => return None,
        };
        Some(profile)
    }
}

/// Whether a `profile_idc` carries the chroma-format/bit-depth/scaling-matrix syntax block.
///
/// This is a fixed lookup, not an inference from other bits.
pub(crate) fn has_chroma_format_syntax(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn baseline_vs_constrained_baseline() {
        assert_eq!(
            Profile::identify(66, ConstraintFlags::empty()),
            Some(Profile::Baseline)
        );
        assert_eq!(
            Profile::identify(66, ConstraintFlags::SET1),
            Some(Profile::ConstrainedBaseline)
        );
    }

    #[test]
    fn high_family() {
        assert_eq!(Profile::identify(100, ConstraintFlags::empty()), Some(Profile::High));
        assert_eq!(
            Profile::identify(100, ConstraintFlags::SET4),
            Some(Profile::ProgressiveHigh)
        );
        assert_eq!(
            Profile::identify(100, ConstraintFlags::SET4 | ConstraintFlags::SET5),
            Some(Profile::ConstrainedHigh)
        );
        assert_eq!(Profile::identify(110, ConstraintFlags::SET3), Some(Profile::High10Intra));
    }

    #[test]
    fn unknown_profile() {
        assert_eq!(Profile::identify(0, ConstraintFlags::empty()), None);
        assert_eq!(Profile::identify(200, ConstraintFlags::all()), None);
    }
}
