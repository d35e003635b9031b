//! PDF packing with lopdf

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::{Bitmap, ExportError, PagePlacement};

/// Packs a bitmap into a paged document
pub trait DocumentPacker: Send + Sync {
    fn pack(&self, bitmap: &Bitmap, pages: &[PagePlacement]) -> Result<Vec<u8>, ExportError>;
}

/// Writes a PDF with the bitmap as one shared image XObject
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfPacker;

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn page_content(placement: &PagePlacement) -> Result<Vec<u8>, ExportError> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(placement.draw_width),
                    real(0.0),
                    real(0.0),
                    real(placement.draw_height),
                    real(placement.x),
                    real(placement.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    content.encode().map_err(|e| ExportError::Pack(e.to_string()))
}

impl DocumentPacker for LopdfPacker {
    fn pack(&self, bitmap: &Bitmap, pages: &[PagePlacement]) -> Result<Vec<u8>, ExportError> {
        if pages.is_empty() {
            return Err(ExportError::Pack("no pages to write".to_string()));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(bitmap.width),
                "Height" => i64::from(bitmap.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            bitmap.pixels.clone(),
        );
        let image_id = doc.add_object(image);

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for placement in pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), page_content(placement)?));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    real(placement.page_width),
                    real(placement.page_height),
                ],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Pack(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{layout_pages, PageFormat};

    #[test]
    fn test_pack_writes_page_per_placement() {
        let bitmap = Bitmap::blank(10, 10);
        let pages = layout_pages(PageFormat::FitToImage, 10, 10);
        let bytes = LopdfPacker.pack(&bitmap, &pages).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pack_rejects_empty_layout() {
        assert!(LopdfPacker.pack(&Bitmap::blank(1, 1), &[]).is_err());
    }
}
