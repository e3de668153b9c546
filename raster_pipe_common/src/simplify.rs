// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simplification of `(operator, destination format, source format)` triples.
//!
//! Many combinations are equivalent to a cheaper operator. For example `SrcOver` with an opaque
//! source is `SrcCopy`, and `Clear` on a premultiplied destination is `SrcCopy` of a transparent
//! solid color. The table built here maps every combination to the triple that should actually
//! be run, optionally together with a solid color that replaces the source.
//!
//! Format legend used by the rules:
//!
//! - `P`: premultiplied ARGB32.
//! - `X`: RGB32 with undefined alpha.
//! - `A8`: alpha only.
//! - `F`: a premultiplied source known to be opaque.
//! - `Z`: a premultiplied source known to be fully transparent.

use crate::compop::CompOpExt;
use crate::format::FormatExt;

/// A solid color that replaces the source after simplification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompOpSolidId {
    /// The source is kept as is.
    #[default]
    None = 0,
    /// Replace the source by transparent black, `0x00000000`.
    Transparent = 1,
    /// Replace the source by opaque black, `0xFF000000`.
    OpaqueBlack = 2,
    /// Replace the source by opaque white, `0xFFFFFFFF`.
    OpaqueWhite = 3,
    /// The operation does nothing and the fill must be skipped.
    AlwaysNop = 4,
}

impl CompOpSolidId {
    /// Decode a solid id.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Transparent),
            2 => Some(Self::OpaqueBlack),
            3 => Some(Self::OpaqueWhite),
            4 => Some(Self::AlwaysNop),
            _ => None,
        }
    }

    /// The premultiplied ARGB32 color substituted for the source, if any.
    pub const fn prgb32(self) -> Option<u32> {
        match self {
            Self::Transparent => Some(0x0000_0000),
            Self::OpaqueBlack => Some(0xFF00_0000),
            Self::OpaqueWhite => Some(0xFFFF_FFFF),
            Self::None | Self::AlwaysNop => None,
        }
    }
}

/// The result of simplifying an operator, packed the same way a signature packs it.
///
/// The lower 14 bits match the layout of the corresponding pipeline signature fields, see
/// [`CompOpSimplifyInfo::signature`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompOpSimplifyInfo {
    data: u32,
}

const DST_SHIFT: u32 = 0;
const SRC_SHIFT: u32 = 4;
const OP_SHIFT: u32 = 8;
const SOLID_SHIFT: u32 = 16;
const SIGNATURE_MASK: u32 = 0x3FFF;

impl CompOpSimplifyInfo {
    /// Pack a simplification result.
    pub const fn new(
        comp_op: CompOpExt,
        dst_format: FormatExt,
        src_format: FormatExt,
        solid_id: CompOpSolidId,
    ) -> Self {
        Self {
            data: ((dst_format as u32) << DST_SHIFT)
                | ((src_format as u32) << SRC_SHIFT)
                | ((comp_op as u32) << OP_SHIFT)
                | ((solid_id as u32) << SOLID_SHIFT),
        }
    }

    /// The result used for operations that never change the destination.
    pub const fn dst_copy() -> Self {
        Self::new(
            CompOpExt::DstCopy,
            FormatExt::None,
            FormatExt::None,
            CompOpSolidId::AlwaysNop,
        )
    }

    /// The operator to run.
    pub const fn comp_op(self) -> CompOpExt {
        match CompOpExt::from_u32((self.data >> OP_SHIFT) & 0x3F) {
            Some(op) => op,
            None => CompOpExt::DstCopy,
        }
    }

    /// The destination format the pipeline works with.
    pub const fn dst_format(self) -> FormatExt {
        match FormatExt::from_u32((self.data >> DST_SHIFT) & 0xF) {
            Some(format) => format,
            None => FormatExt::None,
        }
    }

    /// The source format the pipeline works with.
    pub const fn src_format(self) -> FormatExt {
        match FormatExt::from_u32((self.data >> SRC_SHIFT) & 0xF) {
            Some(format) => format,
            None => FormatExt::None,
        }
    }

    /// The solid color replacing the source, if any.
    pub const fn solid_id(self) -> CompOpSolidId {
        match CompOpSolidId::from_u32((self.data >> SOLID_SHIFT) & 0x7) {
            Some(id) => id,
            None => CompOpSolidId::None,
        }
    }

    /// The `dst`, `src` and `comp_op` fields in signature layout.
    pub const fn signature(self) -> u32 {
        self.data & SIGNATURE_MASK
    }

    /// Raw packed value.
    pub const fn bits(self) -> u32 {
        self.data
    }
}

impl core::fmt::Debug for CompOpSimplifyInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompOpSimplifyInfo")
            .field("comp_op", &self.comp_op())
            .field("dst_format", &self.dst_format())
            .field("src_format", &self.src_format())
            .field("solid_id", &self.solid_id())
            .finish()
    }
}

const P: FormatExt = FormatExt::Prgb32;
const X: FormatExt = FormatExt::Xrgb32;
const A8: FormatExt = FormatExt::A8;
const F: FormatExt = FormatExt::Frgb32;
const Z: FormatExt = FormatExt::Zero32;

const fn make_op(op: CompOpExt, d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::new(op, d, s, CompOpSolidId::None)
}

const fn transparent(op: CompOpExt, d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::new(op, d, s, CompOpSolidId::Transparent)
}

const fn opaque_black(op: CompOpExt, d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::new(op, d, s, CompOpSolidId::OpaqueBlack)
}

/// A8 destinations only see the alpha of the replacement, so any opaque solid would do.
const fn opaque_alpha(op: CompOpExt, d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::new(op, d, s, CompOpSolidId::OpaqueWhite)
}

const fn alpha_inv(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::new(CompOpExt::AlphaInv, d, s, CompOpSolidId::OpaqueWhite)
}

const fn dst_copy() -> CompOpSimplifyInfo {
    CompOpSimplifyInfo::dst_copy()
}

// Dca' = 0, Da' = 0. Dc' = 0 for an RGB destination, which is opaque black.
const fn clear(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match d {
        P => transparent(CompOpExt::SrcCopy, P, P),
        X => opaque_black(CompOpExt::SrcCopy, P, P),
        A8 => transparent(CompOpExt::SrcCopy, A8, P),
        _ => make_op(CompOpExt::Clear, d, s),
    }
}

// Dca' = Sca, Da' = Sa.
const fn src_copy(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (P, F) => make_op(CompOpExt::SrcCopy, P, P),
        (X, P) | (X, Z) | (X, X) => make_op(CompOpExt::SrcCopy, P, X),
        (X, F) => make_op(CompOpExt::SrcCopy, P, P),
        (A8, Z) => clear(A8, Z),
        (A8, X) | (A8, F) => opaque_alpha(CompOpExt::SrcCopy, d, P),
        _ => make_op(CompOpExt::SrcCopy, d, s),
    }
}

// Dca' = Sca + Dca.(1 - Sa), Da' = Sa + Da.(1 - Sa).
const fn src_over(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) | (A8, Z) => dst_copy(),
        (P, X) | (X, X) => src_copy(P, X),
        (P, F) | (X, F) => src_copy(P, F),
        (X, P) => src_over(P, P),
        (A8, X) => src_copy(A8, X),
        (A8, F) => src_copy(A8, F),
        _ => make_op(CompOpExt::SrcOver, d, s),
    }
}

// Dca' = Dca + Sca.(1 - Da), Da' = Da + Sa.(1 - Da).
const fn dst_over(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => dst_copy(),
        (P, F) => dst_over(P, P),
        (X, _) => dst_copy(),
        (A8, _) => src_over(d, s),
        _ => make_op(CompOpExt::DstOver, d, s),
    }
}

// Dca' = Sca.Da, Da' = Sa.Da.
const fn src_in(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (P, F) => src_in(P, P),
        (X, _) => src_copy(d, s),
        (A8, Z) => clear(d, s),
        (A8, X) | (A8, F) => dst_copy(),
        _ => make_op(CompOpExt::SrcIn, d, s),
    }
}

// Dca' = Dca.Sa, Da' = Da.Sa.
const fn dst_in(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => src_copy(d, s),
        (P, X) | (P, F) => dst_copy(),
        (X, P) => dst_in(P, P),
        (X, Z) => dst_in(P, F),
        (X, X) | (X, F) => dst_copy(),
        (A8, _) => src_in(d, s),
        _ => make_op(CompOpExt::DstIn, d, s),
    }
}

// Dca' = Sca.(1 - Da), Da' = Sa.(1 - Da).
const fn src_out(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => clear(d, s),
        (P, F) => src_out(P, P),
        (X, _) => clear(d, s),
        (A8, Z) => clear(d, s),
        (A8, X) | (A8, F) => alpha_inv(d, X),
        _ => make_op(CompOpExt::SrcOut, d, s),
    }
}

// Dca' = Dca.(1 - Sa), Da' = Da.(1 - Sa).
const fn dst_out(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) | (A8, Z) => dst_copy(),
        (P, X) | (P, F) | (X, X) | (X, F) | (A8, X) | (A8, F) => clear(d, s),
        _ => make_op(CompOpExt::DstOut, d, s),
    }
}

// Dca' = Sca.Da + Dca.(1 - Sa), Da' = Da.
const fn src_atop(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => dst_copy(),
        (P, X) | (P, F) => src_in(d, s),
        (X, P) | (X, Z) => src_over(d, s),
        (X, X) | (X, F) => src_copy(d, s),
        (A8, _) => dst_copy(),
        _ => make_op(CompOpExt::SrcAtop, d, s),
    }
}

// Dca' = Dca.Sa + Sca.(1 - Da), Da' = Sa.
const fn dst_atop(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => clear(d, s),
        (P, X) | (P, F) => dst_over(d, s),
        (X, P) => dst_in(d, s),
        (X, Z) => clear(d, s),
        (X, X) | (X, F) => dst_copy(),
        (A8, _) => src_copy(d, s),
        _ => make_op(CompOpExt::DstAtop, d, s),
    }
}

// Dca' = Sca.(1 - Da) + Dca.(1 - Sa), Da' = Sa + Da - 2.Sa.Da.
const fn xor(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) | (A8, Z) => dst_copy(),
        (P, X) | (P, F) => src_out(d, s),
        (X, P) => dst_out(d, s),
        (X, X) | (X, F) => clear(d, s),
        (A8, X) | (A8, F) => alpha_inv(d, X),
        _ => make_op(CompOpExt::Xor, d, s),
    }
}

// Dca' = Sca + Dca, Da' = Sa + Da.
const fn plus(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) | (A8, Z) => dst_copy(),
        (P, F) | (X, P) | (X, X) | (X, F) => plus(P, P),
        (A8, X) | (A8, F) => opaque_alpha(CompOpExt::Plus, d, P),
        _ => make_op(CompOpExt::Plus, d, s),
    }
}

// Dca' = Dca - Sca, Da' = Da + Sa.(1 - Da).
const fn minus(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) => dst_copy(),
        (P, F) | (X, P) | (X, F) | (X, X) => minus(P, P),
        (A8, _) => src_over(d, s),
        _ => make_op(CompOpExt::Minus, d, s),
    }
}

// Dca' = Dca.Sca, Da' = Da.Sa.
const fn modulate(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) => transparent(CompOpExt::SrcCopy, P, P),
        (P, F) => modulate(P, P),
        (X, Z) => opaque_black(CompOpExt::SrcCopy, P, P),
        (X, F) | (X, X) => modulate(X, P),
        (A8, _) | (_, A8) => dst_in(d, s),
        _ => make_op(CompOpExt::Modulate, d, s),
    }
}

const fn multiply(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) => dst_copy(),
        (P, F) => multiply(P, X),
        (X, F) | (X, X) => modulate(X, X),
        (A8, _) | (_, A8) => dst_over(d, s),
        _ => make_op(CompOpExt::Multiply, d, s),
    }
}

const fn screen(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) => dst_copy(),
        (P, F) | (X, P) | (X, F) => screen(P, P),
        (X, X) => screen(P, X),
        (A8, _) | (_, A8) => src_over(d, s),
        _ => make_op(CompOpExt::Screen, d, s),
    }
}

const fn overlay(d: FormatExt, s: FormatExt) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) => dst_copy(),
        (P, F) => overlay(P, X),
        (X, F) => overlay(X, X),
        (A8, _) => src_over(d, s),
        _ => make_op(CompOpExt::Overlay, d, s),
    }
}

/// What a blend mode falls back to when alpha is involved.
#[derive(Clone, Copy)]
enum AlphaFallback {
    /// `dst_over` when either side is A8.
    DstOverAny,
    /// `src_over` when either side is A8.
    SrcOverAny,
    /// `src_over` when the destination is A8.
    SrcOverDst,
}

/// Shared rules of the separable blend modes.
///
/// `pf` and `xf` are the source formats used for an opaque source over a `P` and an `X`
/// destination respectively.
const fn blend(
    op: CompOpExt,
    d: FormatExt,
    s: FormatExt,
    pf: FormatExt,
    xf: FormatExt,
    fallback: AlphaFallback,
) -> CompOpSimplifyInfo {
    match (d, s) {
        (P, Z) | (X, Z) => return dst_copy(),
        (P, F) => return make_op(op, P, pf),
        (X, F) => return make_op(op, X, xf),
        _ => {}
    }
    match fallback {
        AlphaFallback::DstOverAny if matches!(d, A8) || matches!(s, A8) => dst_over(d, s),
        AlphaFallback::SrcOverAny if matches!(d, A8) || matches!(s, A8) => src_over(d, s),
        AlphaFallback::SrcOverDst if matches!(d, A8) => src_over(d, s),
        _ => make_op(op, d, s),
    }
}

/// Simplify an operator for the given destination and source formats without consulting the
/// precomputed table.
pub const fn simplify_uncached(
    op: CompOpExt,
    d: FormatExt,
    s: FormatExt,
) -> CompOpSimplifyInfo {
    use AlphaFallback::{DstOverAny, SrcOverAny, SrcOverDst};

    match op {
        CompOpExt::SrcCopy => src_copy(d, s),
        CompOpExt::SrcOver => src_over(d, s),
        CompOpExt::SrcIn => src_in(d, s),
        CompOpExt::SrcOut => src_out(d, s),
        CompOpExt::SrcAtop => src_atop(d, s),
        CompOpExt::DstCopy => dst_copy(),
        CompOpExt::DstOver => dst_over(d, s),
        CompOpExt::DstIn => dst_in(d, s),
        CompOpExt::DstOut => dst_out(d, s),
        CompOpExt::DstAtop => dst_atop(d, s),
        CompOpExt::Xor => xor(d, s),
        CompOpExt::Clear => clear(d, s),
        CompOpExt::Plus => plus(d, s),
        CompOpExt::Minus => minus(d, s),
        CompOpExt::Modulate => modulate(d, s),
        CompOpExt::Multiply => multiply(d, s),
        CompOpExt::Screen => screen(d, s),
        CompOpExt::Overlay => overlay(d, s),
        CompOpExt::Darken => blend(op, d, s, X, X, DstOverAny),
        CompOpExt::Lighten => blend(op, d, s, X, X, SrcOverAny),
        CompOpExt::ColorDodge => blend(op, d, s, P, X, SrcOverAny),
        CompOpExt::ColorBurn => blend(op, d, s, X, X, DstOverAny),
        CompOpExt::LinearBurn => blend(op, d, s, X, X, DstOverAny),
        CompOpExt::LinearLight => blend(op, d, s, X, X, SrcOverAny),
        CompOpExt::PinLight => blend(op, d, s, X, X, SrcOverAny),
        CompOpExt::HardLight => blend(op, d, s, X, X, SrcOverAny),
        CompOpExt::SoftLight => blend(op, d, s, X, X, SrcOverDst),
        CompOpExt::Difference => blend(op, d, s, P, P, SrcOverDst),
        CompOpExt::Exclusion => blend(op, d, s, P, P, SrcOverDst),
        CompOpExt::AlphaInv => alpha_inv(d, s),
    }
}

type SimplifyTable = [[[CompOpSimplifyInfo; FormatExt::COUNT]; FormatExt::COUNT]; CompOpExt::COUNT];

const fn build_table() -> SimplifyTable {
    let mut table = [[[CompOpSimplifyInfo { data: 0 }; FormatExt::COUNT]; FormatExt::COUNT];
        CompOpExt::COUNT];
    let mut op = 0;
    while op < CompOpExt::COUNT {
        let mut d = 0;
        while d < FormatExt::COUNT {
            let mut s = 0;
            while s < FormatExt::COUNT {
                table[op][d][s] = simplify_uncached(
                    CompOpExt::ALL[op],
                    FormatExt::ALL[d],
                    FormatExt::ALL[s],
                );
                s += 1;
            }
            d += 1;
        }
        op += 1;
    }
    table
}

static SIMPLIFY_TABLE: SimplifyTable = build_table();

/// Look up the simplified form of `op` drawn with a `src` source onto a `dst` destination.
#[inline]
pub fn simplify(op: CompOpExt, dst: FormatExt, src: FormatExt) -> CompOpSimplifyInfo {
    SIMPLIFY_TABLE[op as usize][dst as usize][src as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSTS: [FormatExt; 3] = [P, X, A8];
    const SRCS: [FormatExt; 5] = [P, X, A8, Z, F];

    #[test]
    fn table_matches_rules() {
        for op in CompOpExt::ALL {
            for d in FormatExt::ALL {
                for s in FormatExt::ALL {
                    assert_eq!(simplify(op, d, s), simplify_uncached(op, d, s));
                }
            }
        }
    }

    #[test]
    fn simplification_is_idempotent() {
        for op in CompOpExt::ALL {
            for d in DSTS {
                for s in SRCS {
                    let once = simplify(op, d, s);
                    if once.comp_op() == CompOpExt::DstCopy && once.dst_format() == FormatExt::None
                    {
                        continue;
                    }
                    let twice = simplify(once.comp_op(), once.dst_format(), once.src_format());
                    assert_eq!(
                        (twice.comp_op(), twice.dst_format(), twice.src_format()),
                        (once.comp_op(), once.dst_format(), once.src_format()),
                        "{op:?} {d} {s}"
                    );
                    if once.solid_id() == CompOpSolidId::None {
                        assert_eq!(twice.solid_id(), CompOpSolidId::None, "{op:?} {d} {s}");
                    }
                }
            }
        }
    }

    #[test]
    fn clear_becomes_transparent_copy() {
        let info = simplify(CompOpExt::Clear, P, P);
        assert_eq!(info.comp_op(), CompOpExt::SrcCopy);
        assert_eq!(info.dst_format(), P);
        assert_eq!(info.solid_id(), CompOpSolidId::Transparent);

        let info = simplify(CompOpExt::Clear, X, P);
        assert_eq!(info.solid_id(), CompOpSolidId::OpaqueBlack);
    }

    #[test]
    fn transparent_src_over_is_nop() {
        for d in DSTS {
            let info = simplify(CompOpExt::SrcOver, d, Z);
            assert_eq!(info, CompOpSimplifyInfo::dst_copy());
            assert_eq!(info.solid_id(), CompOpSolidId::AlwaysNop);
        }
    }

    #[test]
    fn opaque_src_over_is_copy() {
        let info = simplify(CompOpExt::SrcOver, P, F);
        assert_eq!(info.comp_op(), CompOpExt::SrcCopy);
        assert_eq!((info.dst_format(), info.src_format()), (P, P));
        assert_eq!(info.solid_id(), CompOpSolidId::None);
    }

    #[test]
    fn a8_src_out_inverts_alpha() {
        let info = simplify(CompOpExt::SrcOut, A8, F);
        assert_eq!(info.comp_op(), CompOpExt::AlphaInv);
        assert_eq!(info.src_format(), X);
        assert_eq!(info.solid_id(), CompOpSolidId::OpaqueWhite);
    }

    #[test]
    fn signature_bits() {
        let info = CompOpSimplifyInfo::new(CompOpExt::Xor, A8, X, CompOpSolidId::OpaqueWhite);
        assert_eq!(info.signature(), (10 << 8) | (2 << 4) | 3);
        assert_eq!(info.bits() >> 16, 3);
    }
}
