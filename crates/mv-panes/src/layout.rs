//! Pure geometry for the two pane arrangements.

use mv_core::SurfaceRect;

/// How live panes are arranged inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// All panes side by side in one row.
    #[default]
    Row,
    /// Two panes per row, `ceil(n / 2)` rows.
    Grid,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Row => "Nx1",
            Self::Grid => "Grid",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Row => Self::Grid,
            Self::Grid => Self::Row,
        }
    }
}

pub const GRID_COLUMNS: usize = 2;

/// Cell rectangles for `count` panes, in pane order.
pub fn compute_cells(mode: LayoutMode, count: usize, viewport: SurfaceRect) -> Vec<SurfaceRect> {
    if count == 0 {
        return Vec::new();
    }

    match mode {
        LayoutMode::Row => split_horizontally(viewport, count),
        LayoutMode::Grid => {
            let rows = count.div_ceil(GRID_COLUMNS);
            let mut cells = Vec::with_capacity(count);
            let mut remaining = count;
            for row in split_vertically(viewport, rows) {
                let in_row = remaining.min(GRID_COLUMNS);
                cells.extend(split_horizontally(row, in_row));
                remaining -= in_row;
            }
            cells
        }
    }
}

/// Equal widths; the last cell absorbs the remainder pixels.
fn split_horizontally(area: SurfaceRect, parts: usize) -> Vec<SurfaceRect> {
    let widths = equal_shares(area.width, parts);
    let mut x = area.x;
    widths
        .into_iter()
        .map(|width| {
            let cell = SurfaceRect::new(x, area.y, width, area.height);
            x = x.saturating_add(width as i32);
            cell
        })
        .collect()
}

fn split_vertically(area: SurfaceRect, parts: usize) -> Vec<SurfaceRect> {
    let heights = equal_shares(area.height, parts);
    let mut y = area.y;
    heights
        .into_iter()
        .map(|height| {
            let cell = SurfaceRect::new(area.x, y, area.width, height);
            y = y.saturating_add(height as i32);
            cell
        })
        .collect()
}

fn equal_shares(total: u32, parts: usize) -> Vec<u32> {
    let parts_u32 = u32::try_from(parts).unwrap_or(u32::MAX).max(1);
    let share = total / parts_u32;
    let mut shares = vec![share; parts];
    if let Some(last) = shares.last_mut() {
        *last += total - share * parts_u32;
    }
    shares
}
