// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill descriptors.
//!
//! A fill selects which pixels of the destination are processed, and with what coverage. All
//! coordinates are in pixels of the destination, except the 24.8 fixed point inputs of
//! [`BoxUData::new_24x8`].

use smallvec::SmallVec;

use crate::signature::FillType;

/// An integer box, `x0..x1` by `y0..y1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoxI {
    /// Left edge, inclusive.
    pub x0: i32,
    /// Top edge, inclusive.
    pub y0: i32,
    /// Right edge, exclusive.
    pub x1: i32,
    /// Bottom edge, exclusive.
    pub y1: i32,
}

impl BoxI {
    /// Create a new box.
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub const fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32
    }

    /// Height of the box.
    pub const fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32
    }

    /// Whether the box covers no pixel.
    pub const fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// The box clamped to `0..width` by `0..height`.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        Self {
            x0: self.x0.clamp(0, w),
            y0: self.y0.clamp(0, h),
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
        }
    }
}

/// A pixel aligned box with a constant coverage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxAData {
    /// Pixels to fill.
    pub bounds: BoxI,
    /// Coverage of every pixel, `0..=255`.
    pub alpha: u32,
}

impl BoxAData {
    /// Create a new aligned box fill, returning `None` if nothing would be rendered.
    pub fn new(alpha: u32, bounds: BoxI) -> Option<Self> {
        (alpha != 0 && !bounds.is_empty()).then_some(Self {
            bounds,
            alpha: alpha.min(255),
        })
    }
}

/// Coverage of one group of rows of an unaligned box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoxUTier {
    /// Coverage of the leftmost column.
    pub left: u32,
    /// Coverage of the columns between the leftmost and the rightmost one.
    pub inner: u32,
    /// Coverage of the rightmost column.
    pub right: u32,
    /// Number of rows this tier covers.
    pub rows: u32,
}

/// A box with fractional edges.
///
/// Such a box covers up to three distinct kinds of rows (a partial top row, fully covered
/// middle rows and a partial bottom row) and each row has up to three distinct coverages
/// (a partial left column, the inner columns and a partial right column).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxUData {
    /// Pixels touched by the box. Rows are consumed from `tiers` in order.
    pub bounds: BoxI,
    /// Row groups, from top to bottom.
    pub tiers: [BoxUTier; 3],
    /// Number of valid entries in `tiers`.
    pub tier_count: u32,
}

impl BoxUData {
    /// Compute the coverage of a box given in 24.8 fixed point.
    ///
    /// Returns `None` if the box would not render any pixel. `alpha` is the global alpha in
    /// `0..=255`; it is folded into the tier coverages.
    pub fn new_24x8(alpha: u32, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<Self> {
        if x0 >= x1 || y0 >= y1 || x0 < 0 || y0 < 0 {
            return None;
        }
        let alpha = alpha.min(255);

        let ax0 = (x0 as u32) >> 8;
        let ay0 = (y0 as u32) >> 8;
        let ax1 = ((x1 as u32) + 0xFF) >> 8;
        let ay1 = ((y1 as u32) + 0xFF) >> 8;

        let mut fx0 = (x0 as u32) & 0xFF;
        let fy0 = (y0 as u32) & 0xFF;
        let fx1 = (((x1 - 1) as u32) & 0xFF) + 1;
        let fy1 = (((y1 - 1) as u32) & 0xFF) + 1;

        let w = ax1 - ax0;
        let h = ay1 - ay0;

        let fy0 = if h == 1 { fy1 } else { 256 } - fy0;
        let fy0_a = fy0 * alpha;
        let fy1_a = fy1 * alpha;

        let mut bounds = BoxI::new(ax0 as i32, ay0 as i32, ax1 as i32, ay1 as i32);
        let top;
        let middle;
        let bottom;

        if w == 1 {
            // Both fractional edges fall into the same column.
            fx0 = fx1 - fx0;

            let m0 = (fx0 * fy0_a) >> 16;
            top = BoxUTier::uniform(m0);
            if h == 1 {
                return (m0 != 0).then(|| Self::from_tiers(bounds, &[top]));
            }

            let m1 = (fx0 * alpha) >> 8;
            let m2 = (fx0 * fy1_a) >> 16;
            middle = BoxUTier::uniform(m1);
            bottom = BoxUTier::uniform(m2);

            bounds.y0 += i32::from(m0 == 0);
            bounds.y1 -= i32::from(m2 == 0);
            if bounds.y0 >= bounds.y1 || m1 == 0 {
                return None;
            }
        } else {
            fx0 = 256 - fx0;

            let m0x1 = fy0_a >> 8;
            let m1x1 = alpha;
            let m2x1 = fy1_a >> 8;

            top = BoxUTier {
                left: (fx0 * fy0_a) >> 16,
                inner: m0x1,
                right: (fx1 * fy0_a) >> 16,
                rows: 1,
            };
            middle = BoxUTier {
                left: (fx0 * alpha) >> 8,
                inner: m1x1,
                right: (fx1 * alpha) >> 8,
                rows: 1,
            };
            bottom = BoxUTier {
                left: (fx0 * fy1_a) >> 16,
                inner: m2x1,
                right: (fx1 * fy1_a) >> 16,
                rows: 1,
            };

            bounds.y0 += i32::from(m0x1 == 0);
            bounds.y1 -= i32::from(m2x1 == 0);
            if bounds.y0 >= bounds.y1 {
                return None;
            }
            if h == 1 {
                return Some(Self::from_tiers(bounds, &[top]));
            }
        }

        // A zero top row is skipped by moving the first row forward, so the middle tier starts
        // right at the new `y0`.
        let top_visible = top.inner != 0;
        let mut tiers: SmallVec<[BoxUTier; 3]> = SmallVec::new();
        if top_visible {
            tiers.push(top);
        }
        if h > 2 {
            tiers.push(BoxUTier {
                rows: h - 2,
                ..middle
            });
        }
        tiers.push(bottom);
        Some(Self::from_tiers(bounds, &tiers))
    }

    /// Compute the coverage of a box given in pixels, truncating to 24.8 fixed point.
    pub fn new_f64(alpha: u32, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<Self> {
        let to_fixed = |v: f64| (v * 256.0).trunc() as i32;
        Self::new_24x8(alpha, to_fixed(x0), to_fixed(y0), to_fixed(x1), to_fixed(y1))
    }

    fn from_tiers(bounds: BoxI, tiers: &[BoxUTier]) -> Self {
        let mut out = [BoxUTier::default(); 3];
        out[..tiers.len()].copy_from_slice(tiers);
        Self {
            bounds,
            tiers: out,
            tier_count: tiers.len() as u32,
        }
    }

    /// The valid tiers.
    pub fn tiers(&self) -> &[BoxUTier] {
        &self.tiers[..self.tier_count as usize]
    }

    /// Coverage of a pixel, for diagnostics and tests.
    pub fn coverage_at(&self, x: i32, y: i32) -> u32 {
        if x < self.bounds.x0 || x >= self.bounds.x1 || y < self.bounds.y0 || y >= self.bounds.y1 {
            return 0;
        }
        let mut row = self.bounds.y0;
        for tier in self.tiers() {
            let end = row.saturating_add(tier.rows as i32);
            if y < end {
                return tier.coverage(x - self.bounds.x0, self.bounds.width());
            }
            row = end;
        }
        0
    }
}

impl BoxUTier {
    const fn uniform(m: u32) -> Self {
        Self {
            left: m,
            inner: m,
            right: m,
            rows: 1,
        }
    }

    /// Coverage of column `i` of a row that is `width` pixels wide.
    pub fn coverage(&self, i: i32, width: u32) -> u32 {
        if i == 0 {
            self.left
        } else if i as u32 + 1 == width {
            self.right
        } else {
            self.inner
        }
    }
}

/// Kind of a [`MaskCommand`], `0` is reserved for end/repeat markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MaskCommandType {
    /// Ends the commands of a row, optionally repeating them.
    EndOrRepeat = 0,
    /// Constant mask.
    CMask = 1,
    /// Variable A8 mask that already includes the global alpha.
    VMaskA8WithGa = 2,
    /// Variable A8 mask that still has to be multiplied by the global alpha.
    VMaskA8WithoutGa = 3,
}

/// One command of a [`MaskData`] fill.
///
/// Commands of a row are grouped and terminated by [`MaskCommand::EndOrRepeat`], whose count
/// tells how many rows use the same group. A group also ends at the first row one of its
/// variable masks has no data for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskCommand<'a> {
    /// Terminates a group, which is then used for `count` consecutive rows.
    ///
    /// A count of `0` never runs out.
    EndOrRepeat {
        /// Number of rows this group is used for.
        count: u32,
    },
    /// Composite `x0..x1` with a constant mask.
    CMask {
        /// First pixel.
        x0: u32,
        /// One past the last pixel.
        x1: u32,
        /// Mask value, `0..=255`, which already includes the global alpha.
        mask: u32,
    },
    /// Composite `x0..x1` with a mask that already includes the global alpha.
    VMaskWithGa {
        /// First pixel.
        x0: u32,
        /// One past the last pixel.
        x1: u32,
        /// Mask bytes for the first row of the group, one per pixel.
        data: &'a [u8],
        /// Distance in bytes between the mask rows of consecutive repeats.
        advance: usize,
    },
    /// Composite `x0..x1` with a mask that must be multiplied by the global alpha.
    VMaskWithoutGa {
        /// First pixel.
        x0: u32,
        /// One past the last pixel.
        x1: u32,
        /// Mask bytes for the first row of the group, one per pixel.
        data: &'a [u8],
        /// Distance in bytes between the mask rows of consecutive repeats.
        advance: usize,
    },
}

impl<'a> MaskCommand<'a> {
    /// Terminates a group that is used once.
    pub const fn end() -> Self {
        Self::EndOrRepeat { count: 1 }
    }

    /// Terminates a group that is used for `count` rows.
    pub const fn repeat(count: u32) -> Self {
        Self::EndOrRepeat { count }
    }

    /// Terminates a group that is used for every remaining row.
    pub const fn repeat_forever() -> Self {
        Self::EndOrRepeat { count: u32::MAX }
    }

    /// The kind of this command.
    pub const fn command_type(&self) -> MaskCommandType {
        match self {
            Self::EndOrRepeat { .. } => MaskCommandType::EndOrRepeat,
            Self::CMask { .. } => MaskCommandType::CMask,
            Self::VMaskWithGa { .. } => MaskCommandType::VMaskA8WithGa,
            Self::VMaskWithoutGa { .. } => MaskCommandType::VMaskA8WithoutGa,
        }
    }

    /// The span covered by this command, `None` for end markers.
    pub const fn span(&self) -> Option<(u32, u32)> {
        match *self {
            Self::EndOrRepeat { .. } => None,
            Self::CMask { x0, x1, .. }
            | Self::VMaskWithGa { x0, x1, .. }
            | Self::VMaskWithoutGa { x0, x1, .. } => Some((x0, x1)),
        }
    }
}

/// Builds the command stream of a [`MaskData`] fill.
#[derive(Debug, Default)]
pub struct MaskCommandBuilder<'a> {
    commands: SmallVec<[MaskCommand<'a>; 12]>,
}

impl<'a> MaskCommandBuilder<'a> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constant mask span.
    pub fn cmask(&mut self, x0: u32, x1: u32, mask: u32) -> &mut Self {
        self.commands.push(MaskCommand::CMask {
            x0,
            x1,
            mask: mask.min(255),
        });
        self
    }

    /// Append a variable mask span that includes the global alpha.
    pub fn vmask_with_ga(&mut self, x0: u32, x1: u32, data: &'a [u8], advance: usize) -> &mut Self {
        self.commands.push(MaskCommand::VMaskWithGa {
            x0,
            x1,
            data,
            advance,
        });
        self
    }

    /// Append a variable mask span that must be multiplied by the global alpha.
    pub fn vmask_without_ga(
        &mut self,
        x0: u32,
        x1: u32,
        data: &'a [u8],
        advance: usize,
    ) -> &mut Self {
        self.commands.push(MaskCommand::VMaskWithoutGa {
            x0,
            x1,
            data,
            advance,
        });
        self
    }

    /// Terminate the current group, used once.
    pub fn end(&mut self) -> &mut Self {
        self.commands.push(MaskCommand::end());
        self
    }

    /// Terminate the current group, used for `count` rows.
    pub fn repeat(&mut self, count: u32) -> &mut Self {
        self.commands.push(MaskCommand::repeat(count));
        self
    }

    /// The commands built so far.
    pub fn commands(&self) -> &[MaskCommand<'a>] {
        &self.commands
    }

    /// Consume the builder.
    pub fn into_commands(self) -> SmallVec<[MaskCommand<'a>; 12]> {
        self.commands
    }
}

/// Rows driven by mask commands.
#[derive(Clone, Copy, Debug)]
pub struct MaskData<'a> {
    /// Rows `y0..y1` are processed; `x0` and `x1` bound the commands.
    pub bounds: BoxI,
    /// Global alpha, applied to [`MaskCommand::VMaskWithoutGa`] spans.
    pub alpha: u32,
    /// The command stream.
    pub commands: &'a [MaskCommand<'a>],
}

impl<'a> MaskData<'a> {
    /// Create a mask fill, returning `None` if nothing would be rendered.
    pub fn new(alpha: u32, bounds: BoxI, commands: &'a [MaskCommand<'a>]) -> Option<Self> {
        (alpha != 0 && bounds.y0 < bounds.y1 && !commands.is_empty()).then_some(Self {
            bounds,
            alpha: alpha.min(255),
            commands,
        })
    }
}

/// Fill rule used to turn accumulated winding into coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillRule {
    /// Non-zero winding.
    #[default]
    NonZero,
    /// Even-odd winding.
    EvenOdd,
}

impl FillRule {
    /// The mask applied to the accumulated coverage.
    pub const fn mask(self) -> u32 {
        match self {
            Self::NonZero => 0xFFFF_FFFF,
            Self::EvenOdd => 0x0000_01FF,
        }
    }
}

impl From<peniko::Fill> for FillRule {
    fn from(value: peniko::Fill) -> Self {
        match value {
            peniko::Fill::NonZero => Self::NonZero,
            peniko::Fill::EvenOdd => Self::EvenOdd,
        }
    }
}

/// Number of pixels represented by one bit of the analytic bit buffer.
pub const PIXELS_PER_ONE_BIT: usize = 4;

/// Number of pixels represented by one word of the analytic bit buffer.
pub const PIXELS_PER_BIT_WORD: usize = PIXELS_PER_ONE_BIT * usize::BITS as usize;

/// Rows driven by accumulated coverage cells, as produced by an analytic rasterizer.
///
/// Each row has a bit buffer marking groups of [`PIXELS_PER_ONE_BIT`] cells that may be non-zero
/// (bit `i` of word `w` is group `w * usize::BITS + i`) and a cell buffer holding coverage
/// deltas. The fill consumes both and leaves them zeroed.
#[derive(Debug)]
pub struct AnalyticData<'a> {
    /// Rows `y0..y1` are processed; `x1` is the end of the raster.
    pub bounds: BoxI,
    /// Global alpha, `0..=255`.
    pub alpha: u32,
    /// See [`FillRule::mask`].
    pub fill_rule_mask: u32,
    /// Bit buffer, starting at row `y0`.
    pub bits: &'a mut [usize],
    /// Words per row of the bit buffer.
    pub bit_stride: usize,
    /// Cell buffer, starting at row `y0`.
    pub cells: &'a mut [u32],
    /// Cells per row of the cell buffer.
    pub cell_stride: usize,
}

/// Error returned when analytic buffers don't match the fill bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalyticBufferError;

impl core::fmt::Display for AnalyticBufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("analytic buffers are too small for the fill bounds")
    }
}

impl core::error::Error for AnalyticBufferError {}

impl<'a> AnalyticData<'a> {
    /// Create an analytic fill.
    ///
    /// Every row needs `x1 + 1` cells since the cell right after a span is consumed as well.
    pub fn new(
        alpha: u32,
        bounds: BoxI,
        fill_rule: FillRule,
        bits: &'a mut [usize],
        bit_stride: usize,
        cells: &'a mut [u32],
        cell_stride: usize,
    ) -> Result<Self, AnalyticBufferError> {
        let rows = bounds.height() as usize;
        let width = bounds.x1.max(0) as usize;
        if bounds.y0 >= bounds.y1
            || bit_stride * PIXELS_PER_BIT_WORD < width
            || cell_stride < width + 1
            || bits.len() < bit_stride * rows
            || cells.len() < cell_stride * (rows - 1) + width + 1
        {
            return Err(AnalyticBufferError);
        }
        Ok(Self {
            bounds,
            alpha: alpha.min(255),
            fill_rule_mask: fill_rule.mask(),
            bits,
            bit_stride,
            cells,
            cell_stride,
        })
    }
}

/// Fill descriptor, one variant per [`FillType`].
#[derive(Debug)]
pub enum FillData<'a> {
    /// See [`BoxAData`].
    BoxA(BoxAData),
    /// See [`BoxUData`].
    BoxU(BoxUData),
    /// See [`MaskData`].
    Mask(MaskData<'a>),
    /// See [`AnalyticData`].
    Analytic(AnalyticData<'a>),
}

impl FillData<'_> {
    /// The fill type this descriptor is for.
    pub const fn fill_type(&self) -> FillType {
        match self {
            Self::BoxA(_) => FillType::BoxA,
            Self::BoxU(_) => FillType::BoxU,
            Self::Mask(_) => FillType::Mask,
            Self::Analytic(_) => FillType::Analytic,
        }
    }

    /// Rows and columns the fill may touch.
    pub const fn bounds(&self) -> BoxI {
        match self {
            Self::BoxA(d) => d.bounds,
            Self::BoxU(d) => d.bounds,
            Self::Mask(d) => d.bounds,
            Self::Analytic(d) => d.bounds,
        }
    }
}
