// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::fill::{MaskCommand, MaskData};

use crate::compositor::Compositor;
use crate::dispatch::DstBuffer;
use crate::fetch::FetchPart;
use crate::pixel::DstFormat;

/// Run the command groups of `data` over its rows.
///
/// A group is every command up to the next [`MaskCommand::EndOrRepeat`], which tells how many
/// consecutive rows use the group. Variable masks of the `k`-th row of a group start `k`
/// advances into their mask data, and a group ends early at the first row one of its variable
/// masks has no data for.
pub(crate) fn fill<D: DstFormat>(
    dst: &mut DstBuffer<'_>,
    data: &MaskData<'_>,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    let b = data.bounds;
    let commands = data.commands;
    let width = dst.width() as usize;

    fetch.init_y(b.y0);
    let mut y = b.y0;
    let mut group = 0;
    while y < b.y1 && group < commands.len() {
        let rest = &commands[group..];
        let end = rest
            .iter()
            .position(|c| matches!(c, MaskCommand::EndOrRepeat { .. }));
        let (spans, count) = match end {
            Some(e) => match rest[e] {
                MaskCommand::EndOrRepeat { count } => (&rest[..e], count),
                _ => (&rest[..e], 1),
            },
            None => (rest, 1),
        };
        let forever = count == 0 || count == u32::MAX;

        let mut repeat = 0_usize;
        while y < b.y1 && has_mask_row(spans, repeat, width) {
            if !spans.is_empty() {
                run_row(dst.row_mut(y), width, spans, repeat, data.alpha, fetch, comp);
            }
            fetch.advance_y();
            y += 1;
            repeat += 1;
            if !forever && repeat as u32 >= count {
                break;
            }
        }
        group += end.map_or(rest.len(), |e| e + 1);
    }
}

fn run_row<D: DstFormat>(
    row: &mut [u8],
    width: usize,
    spans: &[MaskCommand<'_>],
    repeat: usize,
    alpha: u32,
    fetch: &mut impl FetchPart,
    comp: &Compositor<D>,
) {
    let mut x = None;
    for cmd in spans {
        let Some((x0, x1)) = clipped_span(cmd, width) else {
            continue;
        };
        match x {
            Some(cur) if cur == x0 => {}
            Some(cur) if cur < x0 => fetch.advance_x(x0 as i32, (x0 - cur) as u32),
            _ => fetch.start_x(x0 as i32),
        }
        x = Some(x1);

        match *cmd {
            MaskCommand::CMask { mask, .. } => comp.composite_cspan(row, x0, x1, fetch, mask),
            MaskCommand::VMaskWithGa { data, advance, .. }
            | MaskCommand::VMaskWithoutGa { data, advance, .. } => {
                // In bounds, see `has_mask_row`.
                let masks = &data[repeat * advance..][..x1 - x0];
                let ga = matches!(cmd, MaskCommand::VMaskWithoutGa { .. }).then_some(alpha);
                comp.composite_vspan(row, x0, masks, fetch, ga);
            }
            MaskCommand::EndOrRepeat { .. } => {}
        }
    }
}

/// Span of `cmd` clipped to `width`, `None` for end markers and empty spans.
fn clipped_span(cmd: &MaskCommand<'_>, width: usize) -> Option<(usize, usize)> {
    let (x0, x1) = cmd.span()?;
    let (x0, x1) = (x0 as usize, (x1 as usize).min(width));
    (x0 < x1).then_some((x0, x1))
}

/// Whether every variable mask of `spans` has data for row `repeat` of its group.
fn has_mask_row(spans: &[MaskCommand<'_>], repeat: usize, width: usize) -> bool {
    spans.iter().all(|cmd| {
        let (MaskCommand::VMaskWithGa { data, advance, .. }
        | MaskCommand::VMaskWithoutGa { data, advance, .. }) = *cmd
        else {
            return true;
        };
        let Some((x0, x1)) = clipped_span(cmd, width) else {
            return true;
        };
        repeat
            .checked_mul(advance)
            .and_then(|start| start.checked_add(x1 - x0))
            .is_some_and(|end| end <= data.len())
    })
}
