use std::ops::Range;
use tracing::trace;

/// Fixed-height list windowing. All measures (heights, offsets) share one unit,
/// terminal lines in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    item_height: usize,
    viewport_height: usize,
    buffer: usize,
}

/// The part of a list that has to be materialized for a given scroll position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewportWindow {
    /// Items intersecting the viewport.
    pub visible: Range<usize>,
    /// `visible` widened by the render buffer.
    pub rendered: Range<usize>,
    /// Items lying completely inside the viewport. Never empty when `visible` isn't.
    pub whole: Range<usize>,
    /// Scroll offset after clamping.
    pub offset: usize,
    /// Height of the whole list, sizes the scrollbar.
    pub total_extent: usize,
}

impl ViewportWindow {
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

impl Viewport {
    pub fn new(item_height: usize, viewport_height: usize) -> Self {
        Viewport {
            item_height: std::cmp::max(item_height, 1),
            viewport_height,
            buffer: 0,
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn item_height(&self) -> usize {
        self.item_height
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
    }

    /// Number of whole items that fit into the viewport, at least one.
    pub fn page_items(&self) -> usize {
        std::cmp::max(self.viewport_height / self.item_height, 1)
    }

    pub fn total_extent(&self, len: usize) -> usize {
        len * self.item_height
    }

    /// Largest offset that still fills the viewport.
    pub fn max_offset(&self, len: usize) -> usize {
        self.total_extent(len).saturating_sub(self.viewport_height)
    }

    pub fn clamp_offset(&self, len: usize, offset: usize) -> usize {
        std::cmp::min(offset, self.max_offset(len))
    }

    pub fn window(&self, len: usize, scroll_offset: usize) -> ViewportWindow {
        let total_extent = self.total_extent(len);
        let offset = self.clamp_offset(len, scroll_offset);
        if len == 0 || self.viewport_height == 0 {
            return ViewportWindow {
                visible: 0..0,
                rendered: 0..0,
                whole: 0..0,
                offset,
                total_extent,
            };
        }

        let first = offset / self.item_height;
        let last = std::cmp::min(
            len - 1,
            (offset + self.viewport_height - 1) / self.item_height,
        );
        let rbegin = first.saturating_sub(self.buffer);
        let rend = std::cmp::min(last + 1 + self.buffer, len);
        let wbegin = offset.div_ceil(self.item_height);
        let wend = std::cmp::min(len, (offset + self.viewport_height) / self.item_height);
        // An item taller than the viewport is never whole, show the top one
        let whole = if wbegin < wend {
            wbegin..wend
        } else {
            first..first + 1
        };

        trace!(
            "Window: len {}, offset {}->{}, visible {}..{}, rendered {}..{}",
            len,
            scroll_offset,
            offset,
            first,
            last + 1,
            rbegin,
            rend
        );
        ViewportWindow {
            visible: first..last + 1,
            rendered: rbegin..rend,
            whole,
            offset,
            total_extent,
        }
    }
}
