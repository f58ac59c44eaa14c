//! Page boxes and the transforms needed to draw on rotated pages.

use lopdf::{Document, Object};

use crate::utils::{number, resolve};

/// A page box in default user space units (points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left x.
    pub llx: f32,
    /// Lower-left y.
    pub lly: f32,
    /// Upper-right x.
    pub urx: f32,
    /// Upper-right y.
    pub ury: f32,
}

impl Rectangle {
    /// ISO A4, 210 x 297 mm.
    pub const A4: Rectangle = Rectangle::with_size(595.276, 841.89);

    /// US Letter, 8.5 x 11 in.
    pub const LETTER: Rectangle = Rectangle::with_size(612.0, 792.0);

    /// Rectangle anchored at the origin.
    pub const fn with_size(width: f32, height: f32) -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: width,
            ury: height,
        }
    }

    /// Parse a `[llx lly urx ury]` array, normalizing swapped corners.
    pub fn from_object(doc: &Document, obj: &Object) -> Option<Self> {
        let Object::Array(values) = resolve(doc, obj)? else {
            return None;
        };
        if values.len() != 4 {
            return None;
        }
        let mut coords = [0.0f32; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = number(resolve(doc, value)?)?;
        }
        let [x1, y1, x2, y2] = coords;
        Some(Self {
            llx: x1.min(x2),
            lly: y1.min(y2),
            urx: x1.max(x2),
            ury: y1.max(y2),
        })
    }

    /// The box as a PDF array.
    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx),
            Object::Real(self.lly),
            Object::Real(self.urx),
            Object::Real(self.ury),
        ])
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Size of the box as displayed with the given page rotation.
    pub fn rotate(self, rotation: i64) -> Self {
        if normalize_rotation(rotation) % 180 == 90 {
            Self::with_size(self.height(), self.width())
        } else {
            Self::with_size(self.width(), self.height())
        }
    }

    /// Box scaled around the origin.
    pub fn scale(self, factor: f32) -> Self {
        Self {
            llx: self.llx * factor,
            lly: self.lly * factor,
            urx: self.urx * factor,
            ury: self.ury * factor,
        }
    }

    /// Matrix mapping upright display coordinates onto user space.
    ///
    /// Text drawn under this matrix at `(x, y)` appears at `(x, y)` from the
    /// lower-left corner of the page as a viewer shows it.
    pub fn display_matrix(&self, rotation: i64) -> [f32; 6] {
        match normalize_rotation(rotation) {
            90 => [0.0, 1.0, -1.0, 0.0, self.urx, self.lly],
            180 => [-1.0, 0.0, 0.0, -1.0, self.urx, self.ury],
            270 => [0.0, -1.0, 1.0, 0.0, self.llx, self.ury],
            _ => [1.0, 0.0, 0.0, 1.0, self.llx, self.lly],
        }
    }
}

/// Rotation folded into `0`, `90`, `180` or `270`.
pub fn normalize_rotation(rotation: i64) -> i64 {
    let folded = rotation.rem_euclid(360);
    folded - folded % 90
}
