// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A render context over an owned image.

use raster_pipe_common::compop::CompOpExt;
use raster_pipe_common::fetch::{
    ConicGradientValues, ExtendMode, FetchData, GradientData, GradientQuality,
    LinearGradientValues, PatternData, PatternQuality, RadialGradientValues, SolidData,
};
use raster_pipe_common::fill::{
    AnalyticBufferError, AnalyticData, BoxAData, BoxI, BoxUData, FillData, MaskCommand, MaskData,
};
use raster_pipe_common::gradient::GradientLut;
use raster_pipe_common::kurbo::{Affine, Rect};
use raster_pipe_common::peniko::{Color, Compose, Extend};
use raster_pipe_common::signature::{FetchType, Signature};
use raster_pipe_common::simplify::{simplify, CompOpSolidId};

use crate::cache::SignatureCache;
use crate::dispatch::ContextData;
use crate::error::Result;
use crate::image::Image;
use crate::runtime::{PipeProvider, PipelineRuntime};
use crate::util::scalar::mul_255;

/// Settings of a [`RasterContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    /// Use the static runtime when the primary runtime can't provide a pipeline.
    pub fallback_enabled: bool,
    /// Rows per band of band-parallel fills.
    pub band_height: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            band_height: 64,
        }
    }
}

/// A pattern source.
#[derive(Clone, Debug)]
pub struct PatternStyle {
    /// Pixels of the pattern.
    pub image: Image,
    /// Extend mode of both axes.
    pub extend: ExtendMode,
    /// Sampling quality of transformed patterns.
    pub quality: PatternQuality,
    /// Transform from pattern to destination space.
    pub transform: Affine,
}

/// Gradient geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientGeometry {
    /// See [`LinearGradientValues`].
    Linear(LinearGradientValues),
    /// See [`RadialGradientValues`].
    Radial(RadialGradientValues),
    /// See [`ConicGradientValues`].
    Conic(ConicGradientValues),
}

/// A gradient source.
#[derive(Clone, Debug)]
pub struct GradientStyle {
    /// Colors of the gradient.
    pub lut: GradientLut,
    /// Shape of the gradient.
    pub geometry: GradientGeometry,
    /// Extend mode, ignored by conic gradients.
    pub extend: Extend,
    /// Whether to dither.
    pub quality: GradientQuality,
    /// Transform from gradient to destination space.
    pub transform: Affine,
}

/// Where fills take their source pixels from.
#[derive(Clone, Debug)]
pub enum Style {
    /// A premultiplied ARGB32 color.
    Solid(u32),
    /// An image.
    Pattern(PatternStyle),
    /// A gradient.
    Gradient(GradientStyle),
}

impl Style {
    fn fetch_data(&self) -> (FetchData<'_>, Signature) {
        match self {
            Self::Solid(prgb32) => (FetchData::Solid(SolidData::new(*prgb32)), Signature::ZERO),
            Self::Pattern(p) => {
                let (data, sig) =
                    PatternData::init_affine(p.image.as_pattern(), p.extend, p.quality, &p.transform);
                (FetchData::Pattern(data), sig)
            }
            Self::Gradient(g) => {
                let (data, sig) = match &g.geometry {
                    GradientGeometry::Linear(v) => {
                        GradientData::init_linear(&g.lut, v, g.extend, g.quality, &g.transform)
                    }
                    GradientGeometry::Radial(v) => {
                        GradientData::init_radial(&g.lut, v, g.extend, g.quality, &g.transform)
                    }
                    GradientGeometry::Conic(v) => {
                        GradientData::init_conic(&g.lut, v, g.quality, &g.transform)
                    }
                };
                (FetchData::Gradient(data), sig)
            }
        }
    }
}

/// Renders fills into an owned [`Image`].
///
/// Pipelines are looked up by signature in a small cache and only requested from the runtime on
/// a miss.
#[derive(Debug)]
pub struct RasterContext {
    image: Image,
    config: ContextConfig,
    comp_op: CompOpExt,
    alpha: u32,
    style: Style,
    pixel_origin: (i32, i32),
    cache: SignatureCache<16>,
    provider: PipeProvider,
}

impl RasterContext {
    /// Create a context rendering into `image` with the static runtime.
    pub fn new(image: Image) -> Self {
        Self::with_config(image, ContextConfig::default())
    }

    /// Create a context with custom settings.
    pub fn with_config(image: Image, config: ContextConfig) -> Self {
        Self::with_provider(image, config, PipeProvider::new())
    }

    /// Create a context that asks `runtime` for pipelines first.
    pub fn with_runtime(
        image: Image,
        config: ContextConfig,
        runtime: Box<dyn PipelineRuntime + Send + Sync>,
    ) -> Self {
        let provider = PipeProvider::with_primary(runtime, config.fallback_enabled);
        Self::with_provider(image, config, provider)
    }

    fn with_provider(image: Image, config: ContextConfig, provider: PipeProvider) -> Self {
        Self {
            image,
            config,
            comp_op: CompOpExt::SrcOver,
            alpha: 255,
            style: Style::Solid(0xFF00_0000),
            pixel_origin: (0, 0),
            cache: SignatureCache::new(),
            provider,
        }
    }

    /// The render target.
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// The render target, mutably.
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    /// Consume the context, returning the render target.
    pub fn into_image(self) -> Image {
        self.image
    }

    /// Settings of the context.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Pipelines used so far.
    pub fn cache(&self) -> &SignatureCache<16> {
        &self.cache
    }

    /// Set the composition operator.
    pub fn set_comp_op(&mut self, comp_op: CompOpExt) {
        self.comp_op = comp_op;
    }

    /// Set the composition operator from a Porter-Duff mode.
    pub fn set_compose(&mut self, compose: Compose) {
        self.comp_op = CompOpExt::from_compose(compose);
    }

    /// Set the global alpha, multiplied into the coverage of every fill.
    pub fn set_alpha(&mut self, alpha: u8) {
        self.alpha = u32::from(alpha);
    }

    /// Set the offset of the image in a larger render target.
    pub fn set_pixel_origin(&mut self, x: i32, y: i32) {
        self.pixel_origin = (x, y);
    }

    /// Set the source.
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// Fill with a premultiplied ARGB32 color.
    pub fn set_solid(&mut self, prgb32: u32) {
        self.style = Style::Solid(prgb32);
    }

    /// Fill with a color.
    pub fn set_color(&mut self, color: Color) {
        self.style = Style::Solid(SolidData::from_color(color).prgb32);
    }

    /// Fill with an image.
    pub fn set_pattern(
        &mut self,
        image: Image,
        extend: ExtendMode,
        quality: PatternQuality,
        transform: Affine,
    ) {
        self.style = Style::Pattern(PatternStyle {
            image,
            extend,
            quality,
            transform,
        });
    }

    /// Fill with a gradient.
    pub fn set_gradient(&mut self, gradient: GradientStyle) {
        self.style = Style::Gradient(gradient);
    }

    /// Fill a pixel aligned box.
    pub fn fill_box_a(&mut self, bounds: BoxI) -> Result<()> {
        let bounds = bounds.clamp_to(self.image.width(), self.image.height());
        let Some(data) = BoxAData::new(self.alpha, bounds) else {
            return Ok(());
        };
        self.render(self.comp_op, FillData::BoxA(data), false)
    }

    /// Fill a box with fractional edges.
    pub fn fill_box_u(&mut self, rect: Rect) -> Result<()> {
        let r = rect.abs();
        let (w, h) = (f64::from(self.image.width()), f64::from(self.image.height()));
        let Some(data) = BoxUData::new_f64(
            self.alpha,
            r.x0.max(0.0),
            r.y0.max(0.0),
            r.x1.min(w),
            r.y1.min(h),
        ) else {
            return Ok(());
        };
        self.render(self.comp_op, FillData::BoxU(data), false)
    }

    /// Fill rows `bounds.y0..bounds.y1` driven by mask commands.
    ///
    /// Spans are clipped to the image width. The global alpha only scales
    /// [`MaskCommand::VMaskWithoutGa`] spans, every other span already includes it.
    pub fn fill_mask(&mut self, bounds: BoxI, commands: &[MaskCommand<'_>]) -> Result<()> {
        let bounds = bounds.clamp_to(self.image.width(), self.image.height());
        let Some(data) = MaskData::new(self.alpha, bounds, commands) else {
            return Ok(());
        };
        self.render(self.comp_op, FillData::Mask(data), false)
    }

    /// Fill accumulated coverage cells.
    ///
    /// The global alpha is multiplied into the alpha of `data`. Rows and columns outside of the
    /// image are dropped. The bit and cell buffers of `data` are zeroed afterwards, also when
    /// nothing is rendered or rendering fails.
    pub fn fill_analytic(&mut self, data: AnalyticData<'_>) -> Result<()> {
        let AnalyticData {
            bounds,
            alpha,
            fill_rule_mask,
            bits,
            bit_stride,
            cells,
            cell_stride,
        } = data;
        let alpha = mul_255(alpha, self.alpha);
        let clipped = bounds.clamp_to(self.image.width(), self.image.height());

        let rendered = alpha != 0 && !clipped.is_empty();
        let result = if rendered {
            // Both buffers start at row `bounds.y0`.
            let skip = (clipped.y0 - bounds.y0) as usize;
            match (
                bits.get_mut(skip * bit_stride..),
                cells.get_mut(skip * cell_stride..),
            ) {
                (Some(bits), Some(cells)) => {
                    let data = AnalyticData {
                        bounds: clipped,
                        alpha,
                        fill_rule_mask,
                        bits,
                        bit_stride,
                        cells,
                        cell_stride,
                    };
                    self.render(self.comp_op, FillData::Analytic(data), false)
                }
                _ => Err(AnalyticBufferError.into()),
            }
        } else {
            Ok(())
        };

        // A fill only consumes the rows and cells it renders.
        if !rendered || clipped != bounds || result.is_err() {
            bits.fill(0);
            cells.fill(0);
        }
        result
    }

    /// Make every pixel transparent, regardless of the operator, alpha and style.
    pub fn clear_all(&mut self) -> Result<()> {
        let bounds = BoxI::new(0, 0, self.image.width() as i32, self.image.height() as i32);
        let Some(data) = BoxAData::new(255, bounds) else {
            return Ok(());
        };
        self.render(CompOpExt::Clear, FillData::BoxA(data), true)
    }

    fn render(&mut self, comp_op: CompOpExt, mut fill: FillData<'_>, clear: bool) -> Result<()> {
        let (mut fetch, fetch_sig) = if clear {
            (FetchData::Solid(SolidData::new(0)), Signature::ZERO)
        } else {
            self.style.fetch_data()
        };
        if fetch_sig.is_pending() {
            log::debug!("skipping fill, the source can't be rendered");
            return Ok(());
        }
        let mut fetch_type = fetch_sig.fetch_type().unwrap_or(FetchType::Solid);

        let info = simplify(comp_op, self.image.format(), fetch.src_format());
        if matches!(info.solid_id(), CompOpSolidId::AlwaysNop) {
            return Ok(());
        }
        if let Some(prgb32) = info.solid_id().prgb32() {
            fetch = FetchData::Solid(SolidData::new(prgb32));
            fetch_type = FetchType::Solid;
        }

        let signature = Signature::from_bits(info.signature())
            .with_fill_type(fill.fill_type())
            .with_fetch_type(fetch_type);
        let dispatch = match self.cache.get(signature) {
            Some(dispatch) => {
                log::trace!("pipeline cache hit for {signature}");
                *dispatch
            }
            None => {
                log::debug!("pipeline cache miss for {signature}");
                let dispatch = self.provider.get(signature)?;
                self.cache.insert(dispatch);
                dispatch
            }
        };

        let mut ctx = ContextData {
            dst: self.image.dst_buffer()?,
            pixel_origin: self.pixel_origin,
        };

        #[cfg(feature = "multithreading")]
        if let Some(result) = bands::run(
            &dispatch,
            &mut ctx,
            &fill,
            &fetch,
            self.config.band_height,
        ) {
            return result;
        }

        dispatch.run(&mut ctx, &mut fill, &fetch)
    }
}

#[cfg(feature = "multithreading")]
mod bands {
    use rayon::prelude::*;

    use raster_pipe_common::fetch::FetchData;
    use raster_pipe_common::fill::{BoxAData, BoxI, FillData};

    use crate::dispatch::{ContextData, DispatchData};
    use crate::error::Result;
    use crate::fill::clip_rows;

    /// Run box fills taller than one band on the rayon thread pool, one task per band.
    ///
    /// Returns `None` for fills that have to run on the calling thread.
    pub(super) fn run(
        dispatch: &DispatchData,
        ctx: &mut ContextData<'_>,
        fill: &FillData<'_>,
        fetch: &FetchData<'_>,
        band_height: u32,
    ) -> Option<Result<()>> {
        if !matches!(fill, FillData::BoxA(_) | FillData::BoxU(_))
            || fill.bounds().height() <= band_height
        {
            return None;
        }

        let pixel_origin = ctx.pixel_origin;
        let result = ctx
            .dst
            .bands(band_height)
            .into_par_iter()
            .filter_map(|band| {
                let rows = band.rows();
                let mut fill = clip(fill, rows.start, rows.end)?;
                let mut ctx = ContextData {
                    dst: band,
                    pixel_origin,
                };
                Some(dispatch.run(&mut ctx, &mut fill, fetch))
            })
            .collect::<Result<()>>();
        Some(result)
    }

    fn clip(fill: &FillData<'_>, y0: i32, y1: i32) -> Option<FillData<'static>> {
        match fill {
            FillData::BoxA(data) => {
                let b = data.bounds;
                let bounds = BoxI::new(b.x0, y0.max(b.y0), b.x1, y1.min(b.y1));
                BoxAData::new(data.alpha, bounds).map(FillData::BoxA)
            }
            FillData::BoxU(data) => clip_rows(data, y0, y1).map(FillData::BoxU),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipe_common::format::FormatExt;

    #[test]
    fn cache_is_filled_once_per_signature() {
        let image = Image::new(4, 4, FormatExt::Prgb32).unwrap();
        let mut ctx = RasterContext::new(image);
        ctx.set_solid(0xFF10_2030);
        ctx.fill_box_a(BoxI::new(0, 0, 2, 2)).unwrap();
        ctx.fill_box_a(BoxI::new(1, 1, 4, 4)).unwrap();
        assert_eq!(ctx.cache().len(), 1);
        ctx.fill_box_u(Rect::new(0.5, 0.5, 1.5, 1.5)).unwrap();
        assert_eq!(ctx.cache().len(), 2);
    }

    #[test]
    fn nop_fills_skip_the_runtime() {
        let image = Image::new(2, 2, FormatExt::Prgb32).unwrap();
        let mut ctx = RasterContext::new(image);
        ctx.set_comp_op(CompOpExt::DstCopy);
        ctx.fill_box_a(BoxI::new(0, 0, 2, 2)).unwrap();
        assert!(ctx.cache().is_empty());
        assert!(ctx.image().pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn global_alpha_scales_coverage() {
        let image = Image::new(1, 1, FormatExt::Prgb32).unwrap();
        let mut ctx = RasterContext::new(image);
        ctx.set_comp_op(CompOpExt::SrcCopy);
        ctx.set_solid(0xFFFF_FFFF);
        ctx.set_alpha(128);
        ctx.fill_box_a(BoxI::new(0, 0, 1, 1)).unwrap();
        assert_eq!(ctx.image().pixel(0, 0), 0x8080_8080);
    }
}
