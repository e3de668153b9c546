// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::FetchPart;

/// A constant premultiplied pixel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolidFetch {
    pixel: u32,
}

impl SolidFetch {
    pub(crate) fn new(pixel: u32) -> Self {
        Self { pixel }
    }
}

impl FetchPart for SolidFetch {
    #[inline(always)]
    fn init_y(&mut self, _: i32) {}

    #[inline(always)]
    fn start_x(&mut self, _: i32) {}

    #[inline(always)]
    fn advance_x(&mut self, _: i32, _: u32) {}

    #[inline(always)]
    fn advance_y(&mut self) {}

    #[inline(always)]
    fn fetch(&mut self) -> u32 {
        self.pixel
    }

    fn solid(&self) -> Option<u32> {
        Some(self.pixel)
    }
}
