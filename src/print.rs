//! Print handoff: the rendered canvas goes through a temporary PNG and
//! lands on a single A4-landscape PDF page ready for the system printer.

use crate::error::AppError;
use crate::form::FormState;
use crate::layout::TemplateLayout;
use crate::preferences::{PreferenceRecord, APPLICATION_NAME};
use crate::render::{render_to_canvas, Typeface};
use chrono::NaiveDateTime;
use ::image::{DynamicImage, ImageFormat};
use log::{debug, info};
use printpdf::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// A4 landscape in mm
const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;

const MM_PER_INCH: f32 = 25.4;

/// Everything the printed page is built from.
pub struct PrintJob<'a> {
    pub form: &'a FormState,
    pub prefs: &'a PreferenceRecord,
    pub layout: &'a TemplateLayout,
    pub typeface: &'a Typeface,
    pub template: Option<&'a DynamicImage>,
}

/// `CarForm_<YYYY-MM-DD>_<HHMMSS>.pdf`
pub fn default_print_filename(now: &NaiveDateTime) -> String {
    format!("{}_{}.pdf", APPLICATION_NAME, now.format("%Y-%m-%d_%H%M%S"))
}

/// Render the job and write the print-ready PDF to `output`. When
/// `preview_png` is given the raw canvas is saved there as well.
pub fn print_form(job: &PrintJob<'_>, output: &Path, preview_png: Option<&Path>) -> Result<(), AppError> {
    print_form_in(job, output, preview_png, &std::env::temp_dir())
}

/// Same as [`print_form`], with the temporary bitmap created in `temp_dir`.
pub fn print_form_in(
    job: &PrintJob<'_>,
    output: &Path,
    preview_png: Option<&Path>,
    temp_dir: &Path,
) -> Result<(), AppError> {
    let canvas = render_to_canvas(job.form, job.prefs, job.layout, job.typeface, job.template)?;

    if let Some(png) = preview_png {
        canvas
            .save_with_format(png, ImageFormat::Png)
            .map_err(|e| AppError::Render(format!("{}: {}", png.display(), e)))?;
        info!("saved preview to {}", png.display());
    }

    // The temporary bitmap is removed when `temp` drops, on every path.
    let mut temp = tempfile::Builder::new()
        .prefix("carform-")
        .suffix(".png")
        .tempfile_in(temp_dir)?;
    debug!("rendering through {}", temp.path().display());

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        canvas
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| AppError::Render(e.to_string()))?;
        writer.flush()?;
    }
    drop(canvas);

    temp.as_file_mut().seek(SeekFrom::Start(0))?;
    let page_image = ::image::load(BufReader::new(temp.as_file()), ImageFormat::Png)
        .map_err(|e| AppError::Render(e.to_string()))?;

    write_pdf(&page_image, output)?;
    temp.close()?;

    info!("wrote print page to {}", output.display());
    Ok(())
}

/// Place the image at the top-left of an A4-landscape page, scaled to fit
/// while keeping its aspect ratio.
fn write_pdf(page_image: &DynamicImage, output: &Path) -> Result<(), AppError> {
    let (doc, page1, layer1) = PdfDocument::new(
        "Vehicle Inspection Record",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);

    let gray = page_image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::Pdf("rendered page is empty".to_string()));
    }

    // Smallest DPI that still fits both dimensions on the page
    let dpi = (width as f32 / (PAGE_WIDTH_MM / MM_PER_INCH))
        .max(height as f32 / (PAGE_HEIGHT_MM / MM_PER_INCH));
    let height_mm = height as f32 / dpi * MM_PER_INCH;

    let image = Image::from(ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Greyscale,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: gray.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| AppError::Pdf(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormField;
    use crate::layout::{Anchor, FieldAnchor};
    use chrono::NaiveDate;

    fn small_layout() -> TemplateLayout {
        TemplateLayout {
            width: 350,
            height: 248,
            font_size: 24.0,
            fields: vec![FieldAnchor {
                field: FormField::RegistrationNumber,
                x: 20,
                y: 20,
            }],
            preferences: vec![],
            looked_items: vec![Anchor { x: 20, y: 80 }],
            parts_replacement: vec![],
        }
    }

    #[test]
    fn test_print_writes_pdf_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("out.pdf");
        let png = dir.path().join("out.png");

        let mut form = FormState::new();
        form.set_field(FormField::RegistrationNumber, "AB123");
        let layout = small_layout();
        let job = PrintJob {
            form: &form,
            prefs: &PreferenceRecord::default(),
            layout: &layout,
            typeface: &Typeface::Bitmap,
            template: None,
        };
        print_form(&job, &pdf, Some(&png)).unwrap();

        let bytes = std::fs::read(&pdf).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let preview = ::image::open(&png).unwrap();
        assert_eq!((preview.width(), preview.height()), (350, 248));
    }

    #[test]
    fn test_temp_bitmap_removed_after_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let form = FormState::new();
        let layout = small_layout();
        let job = PrintJob {
            form: &form,
            prefs: &PreferenceRecord::default(),
            layout: &layout,
            typeface: &Typeface::Bitmap,
            template: None,
        };

        print_form_in(&job, &dir.path().join("ok.pdf"), None, scratch.path()).unwrap();
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

        let unwritable = dir.path().join("missing-dir").join("out.pdf");
        assert!(print_form_in(&job, &unwritable, None, scratch.path()).is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_default_filename() {
        let now = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(13, 4, 5)
            .unwrap();
        assert_eq!(default_print_filename(&now), "CarForm_2025-01-02_130405.pdf");
    }
}
