//! Scan-line aligned transfer chunking

use platform::{DisplayError, PixelRegion};

/// Whole scan-lines of `width` bytes that fit under `ceiling`.
///
/// A scan-line is never split, so a region whose single row exceeds the
/// ceiling cannot be transferred at all.
pub fn lines_per_chunk(width: u32, ceiling: usize) -> Result<u32, DisplayError> {
    let row = width as usize;
    if row == 0 || row > ceiling {
        return Err(DisplayError::RegionTooWide { width, ceiling });
    }
    Ok(u32::try_from(ceiling / row).unwrap_or(u32::MAX))
}

/// Splits a [`PixelRegion`] into [`TransferChunk`]s, top to bottom.
///
/// Every chunk spans the full region width and at most
/// [`lines_per_chunk`] rows; the last chunk takes the remainder.
#[derive(Debug, Clone)]
pub struct ChunkPlan<'a> {
    region: PixelRegion<'a>,
    lines: u32,
    next_row: u32,
}

/// One load-area write: whole scan-lines positioned on the panel.
pub type TransferChunk<'a> = PixelRegion<'a>;

impl<'a> ChunkPlan<'a> {
    /// Plan the transfer of `region` under `ceiling` bytes per chunk.
    pub fn new(region: PixelRegion<'a>, ceiling: usize) -> Result<Self, DisplayError> {
        let lines = lines_per_chunk(region.rect().width, ceiling)?;
        Ok(Self {
            region,
            lines,
            next_row: 0,
        })
    }

    /// Rows per full chunk.
    pub fn lines_per_chunk(&self) -> u32 {
        self.lines
    }

    /// Total number of chunks the region needs.
    pub fn chunk_count(&self) -> u32 {
        self.region.rect().height.div_ceil(self.lines)
    }
}

impl<'a> Iterator for ChunkPlan<'a> {
    type Item = TransferChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.region.rect().height.checked_sub(self.next_row)?;
        let rows = remaining.min(self.lines);
        let chunk = self.region.rows(self.next_row, rows)?;
        self.next_row += rows;
        Some(chunk)
    }
}
