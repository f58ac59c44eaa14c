//! Filename footers stamped onto imported pages.

use lopdf::Object;
use lopdf::content::Operation;

use crate::error::Result;
use crate::geometry::Rectangle;
use crate::merge::document::DestinationDocument;
use crate::merge::pages::ImportedPage;
use crate::merge::text::{show_text, string_width};

/// Footer font size on an A4 page.
pub const FOOTER_FONT_SIZE: f32 = 10.0;

/// Distance from the right and bottom edges on an A4 page.
const FOOTER_MARGIN: f32 = 20.0;

/// Writes `"<name> - <page>"` in the bottom right corner of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FooterWriter {
    enabled: bool,
}

impl FooterWriter {
    /// Footer writer that does nothing unless `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Text of the footer for page `page_number` of `base_name`.
    pub fn footer_text(base_name: &str, page_number: usize) -> String {
        format!("{base_name} - {page_number}")
    }

    /// Stamp the footer onto `page`.
    ///
    /// Font size and margin follow the displayed page height, so the footer
    /// keeps its proportions on small and large pages alike.
    pub fn add_footer(
        &self,
        dest: &mut DestinationDocument,
        page: &ImportedPage,
        base_name: &str,
        page_number: usize,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let display = page.display_size();
        let factor = display.height() / Rectangle::A4.height();
        let size = FOOTER_FONT_SIZE * factor;
        let margin = FOOTER_MARGIN * factor;

        let text = Self::footer_text(base_name, page_number);
        let x = (display.width() - margin - string_width(&text, size)).max(margin);

        let font = dest.helvetica();
        let font_name = dest.add_font_resource(page.id, font)?;

        let matrix = page.media_box.display_matrix(page.rotation);
        let mut after = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix.iter().map(|v| Object::Real(*v)).collect()),
            Operation::new("g", vec![Object::Integer(0)]),
        ];
        after.extend(show_text(&font_name, size, x, margin, &text));
        after.push(Operation::new("Q", vec![]));

        dest.wrap_contents(page.id, Vec::new(), after)
    }
}
