// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition operators and their static properties.

use core::fmt;
use core::ops::BitOr;

use peniko::{BlendMode, Compose, Mix};

/// A composition operator, including the internal-only [`CompOpExt::AlphaInv`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CompOpExt {
    /// Source over.
    #[default]
    SrcOver = 0,
    /// Source copy.
    SrcCopy = 1,
    /// Source in.
    SrcIn = 2,
    /// Source out.
    SrcOut = 3,
    /// Source atop.
    SrcAtop = 4,
    /// Destination over.
    DstOver = 5,
    /// Destination copy (no-op).
    DstCopy = 6,
    /// Destination in.
    DstIn = 7,
    /// Destination out.
    DstOut = 8,
    /// Destination atop.
    DstAtop = 9,
    /// Xor.
    Xor = 10,
    /// Clear.
    Clear = 11,
    /// Plus (saturating add).
    Plus = 12,
    /// Minus (saturating subtract of color).
    Minus = 13,
    /// Modulate.
    Modulate = 14,
    /// Multiply.
    Multiply = 15,
    /// Screen.
    Screen = 16,
    /// Overlay.
    Overlay = 17,
    /// Darken.
    Darken = 18,
    /// Lighten.
    Lighten = 19,
    /// Color dodge.
    ColorDodge = 20,
    /// Color burn.
    ColorBurn = 21,
    /// Linear burn.
    LinearBurn = 22,
    /// Linear light.
    LinearLight = 23,
    /// Pin light.
    PinLight = 24,
    /// Hard light.
    HardLight = 25,
    /// Soft light.
    SoftLight = 26,
    /// Difference.
    Difference = 27,
    /// Exclusion.
    Exclusion = 28,
    /// Inverts destination alpha, `Da' = 1 - Da`. Only produced by simplification.
    AlphaInv = 29,
}

impl CompOpExt {
    /// Number of operator ids.
    pub const COUNT: usize = 30;

    /// Number of operators a caller may request.
    pub const PUBLIC_COUNT: usize = 29;

    /// All operators in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::SrcOver,
        Self::SrcCopy,
        Self::SrcIn,
        Self::SrcOut,
        Self::SrcAtop,
        Self::DstOver,
        Self::DstCopy,
        Self::DstIn,
        Self::DstOut,
        Self::DstAtop,
        Self::Xor,
        Self::Clear,
        Self::Plus,
        Self::Minus,
        Self::Modulate,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::LinearBurn,
        Self::LinearLight,
        Self::PinLight,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::AlphaInv,
    ];

    /// Decode an operator id.
    pub const fn from_u32(value: u32) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    /// The id of this operator.
    #[inline(always)]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Whether a caller may request this operator directly.
    pub const fn is_public(self) -> bool {
        (self as usize) < Self::PUBLIC_COUNT
    }

    /// Static flags of this operator.
    #[inline]
    pub const fn info(self) -> CompOpInfo {
        COMP_OP_INFO[self as usize]
    }

    /// Map a peniko blend mode to an operator.
    ///
    /// Separable mix modes map to the operator of the same name. Peniko's compose modes only
    /// apply with [`Mix::Normal`]; non-separable mix modes have no counterpart.
    pub fn from_blend_mode(mode: BlendMode) -> Option<Self> {
        let op = match mode.mix {
            Mix::Normal | Mix::Clip => return Some(Self::from_compose(mode.compose)),
            Mix::Multiply => Self::Multiply,
            Mix::Screen => Self::Screen,
            Mix::Overlay => Self::Overlay,
            Mix::Darken => Self::Darken,
            Mix::Lighten => Self::Lighten,
            Mix::ColorDodge => Self::ColorDodge,
            Mix::ColorBurn => Self::ColorBurn,
            Mix::HardLight => Self::HardLight,
            Mix::SoftLight => Self::SoftLight,
            Mix::Difference => Self::Difference,
            Mix::Exclusion => Self::Exclusion,
            Mix::Hue | Mix::Saturation | Mix::Color | Mix::Luminosity => return None,
        };
        Some(op)
    }

    /// Map a Porter-Duff compose mode to an operator.
    pub fn from_compose(compose: Compose) -> Self {
        match compose {
            Compose::Clear => Self::Clear,
            Compose::Copy => Self::SrcCopy,
            Compose::Dest => Self::DstCopy,
            Compose::SrcOver => Self::SrcOver,
            Compose::DestOver => Self::DstOver,
            Compose::SrcIn => Self::SrcIn,
            Compose::DestIn => Self::DstIn,
            Compose::SrcOut => Self::SrcOut,
            Compose::DestOut => Self::DstOut,
            Compose::SrcAtop => Self::SrcAtop,
            Compose::DestAtop => Self::DstAtop,
            Compose::Xor => Self::Xor,
            Compose::Plus | Compose::PlusLighter => Self::Plus,
        }
    }
}

impl fmt::Display for CompOpExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Flags describing what an operator reads and when it has no effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompOpFlags(u32);

impl CompOpFlags {
    /// No flags.
    pub const NONE: Self = Self(0);

    /// `Dca' = Func(Sca, Dca) + Dca.(1 - Sa)`: masking can be applied by scaling the source.
    pub const TYPE_A: Self = Self(0x0000_0001);
    /// `Dca' = Func(Sca, Dca)`: masking requires a convex combination with the destination.
    pub const TYPE_B: Self = Self(0x0000_0002);
    /// Neither A nor B.
    pub const TYPE_C: Self = Self(0x0000_0004);

    /// Uses destination color.
    pub const DC: Self = Self(0x0000_0100);
    /// Uses destination alpha.
    pub const DA: Self = Self(0x0000_0200);
    /// Uses both destination color and alpha.
    pub const DC_DA: Self = Self(0x0000_0300);
    /// Uses source color.
    pub const SC: Self = Self(0x0000_0400);
    /// Uses source alpha.
    pub const SA: Self = Self(0x0000_0800);
    /// Uses both source color and alpha.
    pub const SC_SA: Self = Self(0x0000_0C00);

    /// No-op when destination alpha is zero.
    pub const NOP_IF_DA_0: Self = Self(0x0001_0000);
    /// No-op when destination alpha is one.
    pub const NOP_IF_DA_1: Self = Self(0x0002_0000);
    /// No-op when source alpha is zero.
    pub const NOP_IF_SA_0: Self = Self(0x0004_0000);
    /// No-op when source alpha is one.
    pub const NOP_IF_SA_1: Self = Self(0x0008_0000);
    /// Always a no-op.
    pub const NOP: Self = Self(0x8000_0000);

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether all flags in `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any flag in `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for CompOpFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

/// Static information about an operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompOpInfo {
    /// Operator flags.
    pub flags: CompOpFlags,
}

impl CompOpInfo {
    /// Whether the operator ever reads the destination.
    pub const fn reads_dst(self) -> bool {
        self.flags.intersects(CompOpFlags::DC_DA)
    }

    /// Whether the operator ever reads the source.
    pub const fn reads_src(self) -> bool {
        self.flags.intersects(CompOpFlags::SC_SA)
    }

    /// Whether the operator leaves the destination untouched.
    pub const fn is_nop(self) -> bool {
        self.flags.contains(CompOpFlags::NOP)
    }
}

const fn info(flags: CompOpFlags) -> CompOpInfo {
    CompOpInfo { flags }
}

const A: CompOpFlags = CompOpFlags::TYPE_A;
const B: CompOpFlags = CompOpFlags::TYPE_B;
const C: CompOpFlags = CompOpFlags::TYPE_C;
const ALL_CHANNELS: CompOpFlags = CompOpFlags::DC_DA.with(CompOpFlags::SC_SA);

/// Blend modes all share the same flags.
const BLEND: CompOpInfo = info(A.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0));

static COMP_OP_INFO: [CompOpInfo; CompOpExt::COUNT] = [
    // SrcOver
    info(A.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0)),
    // SrcCopy
    info(B.with(CompOpFlags::SC_SA)),
    // SrcIn
    info(B.with(CompOpFlags::DA).with(CompOpFlags::SC_SA).with(CompOpFlags::NOP_IF_DA_0)),
    // SrcOut
    info(B.with(CompOpFlags::DA).with(CompOpFlags::SC_SA)),
    // SrcAtop
    info(
        A.with(ALL_CHANNELS)
            .with(CompOpFlags::NOP_IF_DA_0)
            .with(CompOpFlags::NOP_IF_SA_0),
    ),
    // DstOver
    info(
        A.with(ALL_CHANNELS)
            .with(CompOpFlags::NOP_IF_DA_1)
            .with(CompOpFlags::NOP_IF_SA_0),
    ),
    // DstCopy
    info(C.with(CompOpFlags::DC_DA).with(CompOpFlags::NOP)),
    // DstIn
    info(B.with(CompOpFlags::DC_DA).with(CompOpFlags::SA).with(CompOpFlags::NOP_IF_SA_1)),
    // DstOut
    info(A.with(CompOpFlags::DC_DA).with(CompOpFlags::SA).with(CompOpFlags::NOP_IF_SA_0)),
    // DstAtop
    info(B.with(ALL_CHANNELS)),
    // Xor
    info(A.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0)),
    // Clear
    info(C.with(CompOpFlags::NOP_IF_DA_0)),
    // Plus
    info(A.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0)),
    // Minus
    info(C.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0)),
    // Modulate
    info(B.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_DA_0)),
    // Multiply
    info(
        A.with(ALL_CHANNELS)
            .with(CompOpFlags::NOP_IF_DA_0)
            .with(CompOpFlags::NOP_IF_SA_0),
    ),
    // Screen
    BLEND,
    // Overlay
    BLEND,
    // Darken
    BLEND,
    // Lighten
    BLEND,
    // ColorDodge
    BLEND,
    // ColorBurn
    BLEND,
    // LinearBurn
    BLEND,
    // LinearLight
    BLEND,
    // PinLight
    info(C.with(ALL_CHANNELS).with(CompOpFlags::NOP_IF_SA_0)),
    // HardLight
    BLEND,
    // SoftLight
    BLEND,
    // Difference
    BLEND,
    // Exclusion
    BLEND,
    // AlphaInv
    info(C.with(CompOpFlags::DA)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense() {
        for (i, op) in CompOpExt::ALL.iter().enumerate() {
            assert_eq!(op.id() as usize, i);
            assert_eq!(CompOpExt::from_u32(i as u32), Some(*op));
        }
        assert_eq!(CompOpExt::from_u32(CompOpExt::COUNT as u32), None);
        assert!(!CompOpExt::AlphaInv.is_public());
        assert!(CompOpExt::Exclusion.is_public());
    }

    #[test]
    fn dst_copy_is_nop() {
        assert!(CompOpExt::DstCopy.info().is_nop());
        assert!(!CompOpExt::DstCopy.info().reads_src());
        assert!(!CompOpExt::Clear.info().reads_src());
        assert!(!CompOpExt::Clear.info().reads_dst());
        assert!(!CompOpExt::SrcCopy.info().reads_dst());
        assert!(CompOpExt::SrcOver.info().flags.contains(CompOpFlags::NOP_IF_SA_0));
    }

    #[test]
    fn peniko_modes() {
        assert_eq!(
            CompOpExt::from_blend_mode(BlendMode::new(Mix::Normal, Compose::DestOut)),
            Some(CompOpExt::DstOut)
        );
        assert_eq!(
            CompOpExt::from_blend_mode(BlendMode::new(Mix::Multiply, Compose::SrcOver)),
            Some(CompOpExt::Multiply)
        );
        assert_eq!(
            CompOpExt::from_blend_mode(BlendMode::new(Mix::Hue, Compose::SrcOver)),
            None
        );
    }
}
