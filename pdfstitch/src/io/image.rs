//! Image inputs: a PNG or JPEG becomes a one-page document.
//!
//! The page is as large as the image in pixels, taken as points, and the
//! document title is the image base name so title-based tables of contents
//! show something sensible.

use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

use crate::error::{Result, StitchError};
use crate::utils::{base_name, encode_text_string};

/// Name of the image XObject in the page resources.
const IMAGE_RESOURCE: &str = "Im0";

/// Decode `bytes` and wrap the image in a single-page PDF document.
pub fn image_to_document(name: &str, bytes: &[u8]) -> Result<Document> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| StitchError::image_conversion(name, err.to_string()))?;
    build_document(name, &image)
}

fn build_document(name: &str, image: &DynamicImage) -> Result<Document> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(StitchError::image_conversion(name, "image has no pixels"));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let pixels = image.to_rgb8().into_raw();
    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels,
    );
    let xobject_id = doc.add_object(xobject);

    let (w, h) = (width as f32, height as f32);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(w), Object::Real(h)],
        "Resources" => dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => xobject_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }
        .into(),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => encode_text_string(&base_name(name)),
    });
    doc.trailer.set("Info", info_id);

    Ok(doc)
}
