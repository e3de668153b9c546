// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fetch parts, which produce the source pixels of a fill.
//!
//! A fill drives its fetcher row by row. It calls [`FetchPart::init_y`] once with the first
//! row, then for every row starts one or more spans with [`FetchPart::start_x`], skips gaps
//! with [`FetchPart::advance_x`], reads pixels left to right with [`FetchPart::fetch`] and
//! finally moves to the next row with [`FetchPart::advance_y`].

mod gradient;
mod pattern;
mod solid;

use raster_pipe_common::fetch::FetchData;
use raster_pipe_common::signature::FetchType;

pub(crate) use gradient::{ConicFetch, LinearFetch, RadialFetch};
pub(crate) use pattern::{AffineFetch, AlignedFetch, BilinearFetch};
pub(crate) use solid::SolidFetch;

/// A source of premultiplied ARGB32 pixels.
pub(crate) trait FetchPart {
    /// Position the fetcher at row `y`.
    fn init_y(&mut self, y: i32);

    /// Start a span at `x` on the current row.
    fn start_x(&mut self, x: i32);

    /// Skip `diff` pixels of the current span, which moves it to `x`.
    fn advance_x(&mut self, x: i32, diff: u32);

    /// Move to the next row.
    fn advance_y(&mut self);

    /// Fetch the pixel at the current position and move one pixel to the right.
    fn fetch(&mut self) -> u32;

    /// The pixel every fetch returns, if it's constant.
    fn solid(&self) -> Option<u32> {
        None
    }
}

/// All fetch parts, selected by [`FetchType`].
#[derive(Debug)]
pub(crate) enum Fetcher<'a> {
    Solid(SolidFetch),
    Aligned(AlignedFetch<'a>),
    Bilinear(BilinearFetch<'a>),
    Affine(AffineFetch<'a>),
    Linear(LinearFetch<'a>),
    Radial(RadialFetch<'a>),
    Conic(ConicFetch<'a>),
}

impl<'a> Fetcher<'a> {
    /// Create the fetch part for `fetch_type`, or `None` if `data` describes another source.
    ///
    /// `origin` is the pixel origin of the destination, which offsets the dither matrix.
    pub(crate) fn new(fetch_type: FetchType, data: &FetchData<'a>, origin: (i32, i32)) -> Option<Self> {
        use raster_pipe_common::fetch::{GradientKind, PatternMode};

        let fetcher = match data {
            FetchData::Solid(solid) if fetch_type.is_solid() => {
                Self::Solid(SolidFetch::new(solid.prgb32))
            }
            // Nothing to sample, an empty pattern is transparent.
            FetchData::Pattern(pattern) if fetch_type.is_pattern() && pattern.src.is_empty() => {
                Self::Solid(SolidFetch::new(0))
            }
            FetchData::Pattern(pattern) if fetch_type.is_pattern() => match pattern.mode {
                PatternMode::Simple(simple) => match fetch_type {
                    FetchType::PatternAlignedBlit
                    | FetchType::PatternAlignedPad
                    | FetchType::PatternAlignedRepeat
                    | FetchType::PatternAlignedRoR => {
                        Self::Aligned(AlignedFetch::new(fetch_type, pattern.src, &simple))
                    }
                    FetchType::PatternFxPad
                    | FetchType::PatternFxRoR
                    | FetchType::PatternFyPad
                    | FetchType::PatternFyRoR
                    | FetchType::PatternFxFyPad
                    | FetchType::PatternFxFyRoR => {
                        Self::Bilinear(BilinearFetch::new(fetch_type, pattern.src, &simple))
                    }
                    _ => return None,
                },
                PatternMode::Affine(affine) => match fetch_type {
                    FetchType::PatternAffineNNAny
                    | FetchType::PatternAffineNNOpt
                    | FetchType::PatternAffineBIAny
                    | FetchType::PatternAffineBIOpt => {
                        Self::Affine(AffineFetch::new(fetch_type, pattern.src, &affine))
                    }
                    _ => return None,
                },
            },
            FetchData::Gradient(gradient) if fetch_type.is_gradient() => {
                let dither = fetch_type.is_dithered();
                match (gradient.kind, fetch_type) {
                    (
                        GradientKind::Linear(linear),
                        FetchType::LinearNNPad
                        | FetchType::LinearNNRoR
                        | FetchType::LinearDitherPad
                        | FetchType::LinearDitherRoR,
                    ) => Self::Linear(LinearFetch::new(
                        gradient.lut,
                        &linear,
                        is_ror(fetch_type),
                        dither.then_some(origin),
                    )),
                    (
                        GradientKind::Radial(radial),
                        FetchType::RadialNNPad
                        | FetchType::RadialNNRoR
                        | FetchType::RadialDitherPad
                        | FetchType::RadialDitherRoR,
                    ) => Self::Radial(RadialFetch::new(
                        gradient.lut,
                        &radial,
                        is_ror(fetch_type),
                        dither.then_some(origin),
                    )),
                    (GradientKind::Conic(conic), FetchType::ConicNN | FetchType::ConicDither) => {
                        Self::Conic(ConicFetch::new(gradient.lut, &conic, dither.then_some(origin)))
                    }
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(fetcher)
    }
}

fn is_ror(fetch_type: FetchType) -> bool {
    matches!(
        fetch_type,
        FetchType::LinearNNRoR
            | FetchType::LinearDitherRoR
            | FetchType::RadialNNRoR
            | FetchType::RadialDitherRoR
    )
}

macro_rules! dispatch {
    ($self:ident, $f:ident => $e:expr) => {
        match $self {
            Fetcher::Solid($f) => $e,
            Fetcher::Aligned($f) => $e,
            Fetcher::Bilinear($f) => $e,
            Fetcher::Affine($f) => $e,
            Fetcher::Linear($f) => $e,
            Fetcher::Radial($f) => $e,
            Fetcher::Conic($f) => $e,
        }
    };
}

impl FetchPart for Fetcher<'_> {
    #[inline]
    fn init_y(&mut self, y: i32) {
        dispatch!(self, f => f.init_y(y));
    }

    #[inline]
    fn start_x(&mut self, x: i32) {
        dispatch!(self, f => f.start_x(x));
    }

    #[inline]
    fn advance_x(&mut self, x: i32, diff: u32) {
        dispatch!(self, f => f.advance_x(x, diff));
    }

    #[inline]
    fn advance_y(&mut self) {
        dispatch!(self, f => f.advance_y());
    }

    #[inline]
    fn fetch(&mut self) -> u32 {
        dispatch!(self, f => f.fetch())
    }

    #[inline]
    fn solid(&self) -> Option<u32> {
        dispatch!(self, f => f.solid())
    }
}

/// Positive modulo.
#[inline(always)]
pub(crate) fn pmod(x: i32, m: i32) -> i32 {
    x.rem_euclid(m)
}
