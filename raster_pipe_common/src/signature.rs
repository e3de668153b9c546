// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline signatures.
//!
//! A [`Signature`] identifies a pipeline by the fields that change the generated code:
//!
//! | Bits    | Field                 |
//! |---------|-----------------------|
//! | 0..4    | destination format    |
//! | 4..8    | source format         |
//! | 8..14   | composition operator  |
//! | 14..17  | fill type             |
//! | 17..22  | fetch type            |
//! | 31      | pending flag          |

use core::fmt;

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert;

use crate::compop::CompOpExt;
use crate::format::FormatExt;

/// How the pixels to process are selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FillType {
    /// Invalid.
    #[default]
    None = 0,
    /// A pixel aligned box.
    BoxA = 1,
    /// A box on a 24.8 fixed point grid, with fractional coverage at its edges.
    BoxU = 2,
    /// Rows driven by mask commands.
    Mask = 3,
    /// Rows driven by analytic coverage cells.
    Analytic = 4,
}

impl FillType {
    /// Number of fill type ids.
    pub const COUNT: usize = 5;

    /// Decode a fill type id.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::BoxA),
            2 => Some(Self::BoxU),
            3 => Some(Self::Mask),
            4 => Some(Self::Analytic),
            _ => None,
        }
    }
}

/// How source pixels are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs, reason = "the variant names are self describing")]
pub enum FetchType {
    /// A single color.
    #[default]
    Solid = 0,

    /// Pattern without translation or scaling, blitted one to one.
    PatternAlignedBlit = 1,
    PatternAlignedPad = 2,
    PatternAlignedRepeat = 3,
    PatternAlignedRoR = 4,
    PatternFxPad = 5,
    PatternFxRoR = 6,
    PatternFyPad = 7,
    PatternFyRoR = 8,
    PatternFxFyPad = 9,
    PatternFxFyRoR = 10,
    PatternAffineNNAny = 11,
    PatternAffineNNOpt = 12,
    PatternAffineBIAny = 13,
    PatternAffineBIOpt = 14,

    LinearNNPad = 15,
    LinearNNRoR = 16,
    LinearDitherPad = 17,
    LinearDitherRoR = 18,

    RadialNNPad = 19,
    RadialNNRoR = 20,
    RadialDitherPad = 21,
    RadialDitherRoR = 22,

    ConicNN = 23,
    ConicDither = 24,
}

impl FetchType {
    /// Number of fetch type ids.
    pub const COUNT: usize = 25;

    /// All fetch types in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Solid,
        Self::PatternAlignedBlit,
        Self::PatternAlignedPad,
        Self::PatternAlignedRepeat,
        Self::PatternAlignedRoR,
        Self::PatternFxPad,
        Self::PatternFxRoR,
        Self::PatternFyPad,
        Self::PatternFyRoR,
        Self::PatternFxFyPad,
        Self::PatternFxFyRoR,
        Self::PatternAffineNNAny,
        Self::PatternAffineNNOpt,
        Self::PatternAffineBIAny,
        Self::PatternAffineBIOpt,
        Self::LinearNNPad,
        Self::LinearNNRoR,
        Self::LinearDitherPad,
        Self::LinearDitherRoR,
        Self::RadialNNPad,
        Self::RadialNNRoR,
        Self::RadialDitherPad,
        Self::RadialDitherRoR,
        Self::ConicNN,
        Self::ConicDither,
    ];

    /// Decode a fetch type id.
    pub const fn from_u32(value: u32) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    /// The fetch type `offset` ids after `self`, used to select an extend variant from a base.
    pub const fn offset(self, offset: u32) -> Option<Self> {
        Self::from_u32(self as u32 + offset)
    }

    /// Whether this is [`FetchType::Solid`].
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Solid)
    }

    /// Whether this fetches from a pattern.
    pub const fn is_pattern(self) -> bool {
        let id = self as u32;
        id >= Self::PatternAlignedBlit as u32 && id <= Self::PatternAffineBIOpt as u32
    }

    /// Whether this evaluates a gradient.
    pub const fn is_gradient(self) -> bool {
        self as u32 >= Self::LinearNNPad as u32
    }

    /// Whether this gradient fetch applies ordered dithering.
    pub const fn is_dithered(self) -> bool {
        matches!(
            self,
            Self::LinearDitherPad
                | Self::LinearDitherRoR
                | Self::RadialDitherPad
                | Self::RadialDitherRoR
                | Self::ConicDither
        )
    }
}

const DST_SHIFT: u32 = 0;
const DST_MASK: u32 = 0xF;
const SRC_SHIFT: u32 = 4;
const SRC_MASK: u32 = 0xF;
const OP_SHIFT: u32 = 8;
const OP_MASK: u32 = 0x3F;
const FILL_SHIFT: u32 = 14;
const FILL_MASK: u32 = 0x7;
const FETCH_SHIFT: u32 = 17;
const FETCH_MASK: u32 = 0x1F;
const PENDING_BIT: u32 = 1 << 31;

const_assert!(FormatExt::COUNT as u32 <= DST_MASK + 1);
const_assert!(FormatExt::COUNT as u32 <= SRC_MASK + 1);
const_assert!(CompOpExt::COUNT as u32 <= OP_MASK + 1);
const_assert!(FillType::COUNT as u32 <= FILL_MASK + 1);
const_assert!(FetchType::COUNT as u32 <= FETCH_MASK + 1);

/// A packed pipeline key.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Signature(u32);

impl Signature {
    /// The empty signature.
    pub const ZERO: Self = Self(0);

    /// Create a signature from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Create a signature from its parts.
    pub const fn new(
        dst: FormatExt,
        src: FormatExt,
        comp_op: CompOpExt,
        fill: FillType,
        fetch: FetchType,
    ) -> Self {
        Self(
            ((dst as u32) << DST_SHIFT)
                | ((src as u32) << SRC_SHIFT)
                | ((comp_op as u32) << OP_SHIFT)
                | ((fill as u32) << FILL_SHIFT)
                | ((fetch as u32) << FETCH_SHIFT),
        )
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline(always)]
    const fn field(self, shift: u32, mask: u32) -> u32 {
        (self.0 >> shift) & mask
    }

    #[inline(always)]
    const fn with_field(self, shift: u32, mask: u32, value: u32) -> Self {
        Self((self.0 & !(mask << shift)) | ((value & mask) << shift))
    }

    /// Raw destination format id.
    pub const fn dst_format_id(self) -> u32 {
        self.field(DST_SHIFT, DST_MASK)
    }

    /// Raw source format id.
    pub const fn src_format_id(self) -> u32 {
        self.field(SRC_SHIFT, SRC_MASK)
    }

    /// Raw operator id.
    pub const fn comp_op_id(self) -> u32 {
        self.field(OP_SHIFT, OP_MASK)
    }

    /// Raw fill type id.
    pub const fn fill_type_id(self) -> u32 {
        self.field(FILL_SHIFT, FILL_MASK)
    }

    /// Raw fetch type id.
    pub const fn fetch_type_id(self) -> u32 {
        self.field(FETCH_SHIFT, FETCH_MASK)
    }

    /// Destination format, if the stored id is valid.
    pub const fn dst_format(self) -> Option<FormatExt> {
        FormatExt::from_u32(self.dst_format_id())
    }

    /// Source format, if the stored id is valid.
    pub const fn src_format(self) -> Option<FormatExt> {
        FormatExt::from_u32(self.src_format_id())
    }

    /// Composition operator, if the stored id is valid.
    pub const fn comp_op(self) -> Option<CompOpExt> {
        CompOpExt::from_u32(self.comp_op_id())
    }

    /// Fill type, if the stored id is valid.
    pub const fn fill_type(self) -> Option<FillType> {
        FillType::from_u32(self.fill_type_id())
    }

    /// Fetch type, if the stored id is valid.
    pub const fn fetch_type(self) -> Option<FetchType> {
        FetchType::from_u32(self.fetch_type_id())
    }

    /// Whether fetch setup could not complete, in which case nothing must be rendered.
    pub const fn is_pending(self) -> bool {
        self.0 & PENDING_BIT != 0
    }

    /// Replace the destination format.
    #[must_use]
    pub const fn with_dst_format(self, format: FormatExt) -> Self {
        self.with_field(DST_SHIFT, DST_MASK, format as u32)
    }

    /// Replace the source format.
    #[must_use]
    pub const fn with_src_format(self, format: FormatExt) -> Self {
        self.with_field(SRC_SHIFT, SRC_MASK, format as u32)
    }

    /// Replace the composition operator.
    #[must_use]
    pub const fn with_comp_op(self, comp_op: CompOpExt) -> Self {
        self.with_field(OP_SHIFT, OP_MASK, comp_op as u32)
    }

    /// Replace the fill type.
    #[must_use]
    pub const fn with_fill_type(self, fill: FillType) -> Self {
        self.with_field(FILL_SHIFT, FILL_MASK, fill as u32)
    }

    /// Replace the fetch type.
    #[must_use]
    pub const fn with_fetch_type(self, fetch: FetchType) -> Self {
        self.with_field(FETCH_SHIFT, FETCH_MASK, fetch as u32)
    }

    /// Set the pending flag.
    #[must_use]
    pub const fn with_pending(self) -> Self {
        Self(self.0 | PENDING_BIT)
    }

    /// Merge the bits of another signature into this one.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every field holds a valid id.
    pub const fn is_valid(self) -> bool {
        self.dst_format().is_some()
            && self.src_format().is_some()
            && self.comp_op().is_some()
            && self.fill_type().is_some()
            && self.fetch_type().is_some()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("dst", &self.dst_format())
            .field("src", &self.src_format())
            .field("comp_op", &self.comp_op())
            .field("fill", &self.fill_type())
            .field("fetch", &self.fetch_type())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_do_not_overlap() {
        let sig = Signature::new(
            FormatExt::A8,
            FormatExt::Zero32,
            CompOpExt::AlphaInv,
            FillType::Analytic,
            FetchType::ConicDither,
        );
        assert_eq!(sig.dst_format(), Some(FormatExt::A8));
        assert_eq!(sig.src_format(), Some(FormatExt::Zero32));
        assert_eq!(sig.comp_op(), Some(CompOpExt::AlphaInv));
        assert_eq!(sig.fill_type(), Some(FillType::Analytic));
        assert_eq!(sig.fetch_type(), Some(FetchType::ConicDither));
        assert!(!sig.is_pending());
        assert!(sig.is_valid());
    }

    #[test]
    fn setters_replace_fields() {
        let sig = Signature::new(
            FormatExt::Prgb32,
            FormatExt::Prgb32,
            CompOpExt::SrcOver,
            FillType::BoxA,
            FetchType::Solid,
        )
        .with_fetch_type(FetchType::LinearNNRoR)
        .with_comp_op(CompOpExt::Xor);
        assert_eq!(sig.fetch_type(), Some(FetchType::LinearNNRoR));
        assert_eq!(sig.comp_op(), Some(CompOpExt::Xor));
        assert_eq!(sig.fill_type(), Some(FillType::BoxA));
        assert!(sig.with_pending().is_pending());
    }

    #[test]
    fn invalid_ids_are_reported() {
        // Operator id 63 does not exist.
        let sig = Signature::from_bits(0x3F << 8);
        assert_eq!(sig.comp_op(), None);
        assert!(!sig.is_valid());
    }

    #[test]
    fn fetch_type_classes() {
        assert_eq!(
            FetchType::PatternAlignedPad.offset(2),
            Some(FetchType::PatternAlignedRoR)
        );
        assert!(FetchType::PatternAffineBIOpt.is_pattern());
        assert!(!FetchType::LinearNNPad.is_pattern());
        assert!(FetchType::LinearNNPad.is_gradient());
        assert!(FetchType::ConicDither.is_dithered());
        assert!(!FetchType::Solid.is_gradient());
    }
}
