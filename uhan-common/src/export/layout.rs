//! Page layout for exported bitmaps

use serde::{Deserialize, Serialize};

/// A4 portrait width in PDF points
pub const A4_WIDTH_PT: f64 = 595.28;
/// A4 portrait height in PDF points
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Most pages a single export may produce
pub const MAX_EXPORT_PAGES: usize = 20;

/// Slack absorbed before a sliver of image spills onto an extra page
const SPLIT_EPSILON_PT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    /// Fit to A4 width; split across pages when taller than one page
    A4,
    /// One page exactly the size of the bitmap (1 px = 1 pt)
    FitToImage,
}

/// Where the bitmap is drawn on one page, in PDF points (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

/// Number of pages a `width` x `height` bitmap occupies in `format`
pub fn page_count(format: PageFormat, width: u32, height: u32) -> usize {
    match format {
        PageFormat::FitToImage => 1,
        PageFormat::A4 => {
            let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));
            let draw_height = h * A4_WIDTH_PT / w;
            ((draw_height - SPLIT_EPSILON_PT) / A4_HEIGHT_PT).ceil().max(1.0) as usize
        }
    }
}

/// Compute page placements for a `width` x `height` bitmap
///
/// For A4 every page draws the whole image shifted up by one page height per
/// page, so page `n` shows the `n`-th slice and the page box clips the rest.
pub fn layout_pages(format: PageFormat, width: u32, height: u32) -> Vec<PagePlacement> {
    let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));

    match format {
        PageFormat::FitToImage => vec![PagePlacement {
            page_width: w,
            page_height: h,
            x: 0.0,
            y: 0.0,
            draw_width: w,
            draw_height: h,
        }],
        PageFormat::A4 => {
            let draw_width = A4_WIDTH_PT;
            let draw_height = h * A4_WIDTH_PT / w;
            let pages = page_count(format, width, height);

            (0..pages)
                .map(|n| PagePlacement {
                    page_width: A4_WIDTH_PT,
                    page_height: A4_HEIGHT_PT,
                    x: 0.0,
                    // top of image at page top, then one page further per page
                    y: A4_HEIGHT_PT - draw_height + n as f64 * A4_HEIGHT_PT,
                    draw_width,
                    draw_height,
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_to_image_is_one_page_of_bitmap_size() {
        let pages = layout_pages(PageFormat::FitToImage, 800, 1200);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_width, 800.0);
        assert_eq!(pages[0].page_height, 1200.0);
    }

    #[test]
    fn test_a4_short_image_single_page() {
        // Landscape-ish capture fits on one page
        let pages = layout_pages(PageFormat::A4, 1600, 900);
        assert_eq!(pages.len(), 1);
        let p = pages[0];
        assert!((p.draw_width - A4_WIDTH_PT).abs() < 1e-9);
        assert!((p.y + p.draw_height - A4_HEIGHT_PT).abs() < 1e-9);
    }

    #[test]
    fn test_a4_exact_page_height_does_not_split() {
        let height = (A4_HEIGHT_PT / A4_WIDTH_PT * 1000.0).round() as u32;
        assert_eq!(layout_pages(PageFormat::A4, 1000, height).len(), 1);
    }

    #[test]
    fn test_page_count_of_thin_strip_is_huge() {
        assert_eq!(page_count(PageFormat::FitToImage, 1, 100_000), 1);
        assert!(page_count(PageFormat::A4, 1, 100_000) > 50_000);
        assert_eq!(page_count(PageFormat::A4, 1000, 3000), 3);
    }

    #[test]
    fn test_a4_tall_image_splits_into_slices() {
        let pages = layout_pages(PageFormat::A4, 1000, 3000);
        // 3000 px at 0.59528 pt/px = 1785.8 pt -> 3 pages
        assert_eq!(pages.len(), 3);
        for (n, pair) in pages.windows(2).enumerate() {
            assert!((pair[1].y - pair[0].y - A4_HEIGHT_PT).abs() < 1e-9, "page {}", n);
        }
        // Last page still shows the bottom of the image
        assert!(pages[2].y >= 0.0 && pages[2].y < A4_HEIGHT_PT);
    }
}
