//! Work-order PDF rendering.
//!
//! A single A4 page drawn with the standard Helvetica fonts, so no font
//! program is embedded. Photos and the logo go in as JPEG image XObjects.

use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use thiserror::Error;

use crate::photos::PreparedImage;
use crate::workorder::WorkOrder;

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const CM: f32 = 28.346_457;

const MARGIN_X: f32 = 2.0 * CM;
const NOTES_MAX_LINES: usize = 22;
const NOTES_MAX_CHARS: usize = 120;
const GRID_COLUMNS: usize = 2;
const GRID_ROWS: usize = 3;

type Rgb = (f32, f32, f32);

const TITLE: Rgb = hex(0x4a4a4a);
const BLACK: Rgb = hex(0x000000);
const WHITE: Rgb = hex(0xffffff);
const CARD_BORDER: Rgb = hex(0xd8e2ef);
const CELL_BORDER: Rgb = hex(0xcfd9e6);
const PHOTO_FRAME: Rgb = hex(0xdde6f2);
const FOOTER_RULE: Rgb = hex(0xd9e3f1);
const FOOTER_TEXT: Rgb = hex(0x6b7c93);

const fn hex(value: u32) -> Rgb {
    (
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    )
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf encoding failed: {0}")]
    Encode(#[from] lopdf::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header and footer branding.
#[derive(Debug, Clone, Default)]
pub struct PdfBranding {
    pub company_name: String,
    pub logo: Option<PreparedImage>,
}

/// A photo cell: its caption and, when embeddable, the image.
#[derive(Debug, Clone)]
pub struct PdfPhoto {
    pub caption: String,
    pub image: Option<PreparedImage>,
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Oblique => "Helvetica-Oblique",
        }
    }

    /// Approximate advance width of `text` at `size` points.
    fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(helvetica_width).sum();
        let scale = match self {
            Self::Bold => 1.06,
            _ => 1.0,
        };
        units as f32 * size / 1000.0 * scale
    }
}

/// Helvetica glyph widths in 1/1000 em.
fn helvetica_width(c: char) -> u32 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | 'I' | '[' | '\\' | ']' | 'f' | 't' | '·' => 278,
        'i' | 'j' | 'l' => 222,
        '\'' => 191,
        '"' => 355,
        '(' | ')' | '-' | '`' | 'r' => 333,
        '*' => 389,
        '^' => 469,
        '|' => 260,
        '{' | '}' => 334,
        '+' | '<' | '=' | '>' | '~' => 584,
        '%' => 889,
        '@' => 1015,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        'L' => 556,
        'F' | 'T' | 'Z' => 611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' => 667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'w' => 722,
        'G' | 'O' | 'Q' => 778,
        'M' | 'm' => 833,
        'W' => 944,
        _ => 556,
    }
}

/// Encodes text for a `WinAnsiEncoding` font; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 || (0xa0..=0xff).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Accumulates content-stream operations and the images they reference.
struct Canvas {
    ops: Vec<Operation>,
    images: Vec<(String, PreparedImage)>,
}

impl Canvas {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            images: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, (r, g, b): Rgb) {
        self.op("rg", vec![r.into(), g.into(), b.into()]);
    }

    fn stroke_color(&mut self, (r, g, b): Rgb) {
        self.op("RG", vec![r.into(), g.into(), b.into()]);
    }

    fn line_width(&mut self, width: f32) {
        self.op("w", vec![width.into()]);
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op("Tf", vec![font.resource().into(), size.into()]);
        self.op("Td", vec![x.into(), y.into()]);
        self.op(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    fn text_right(&mut self, font: Font, size: f32, right: f32, y: f32, text: &str) {
        let x = right - font.text_width(text, size);
        self.text(font, size, x, y, text);
    }

    fn text_centered(&mut self, font: Font, size: f32, center: f32, y: f32, text: &str) {
        let x = center - font.text_width(text, size) / 2.0;
        self.text(font, size, x, y, text);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.op("m", vec![x1.into(), y1.into()]);
        self.op("l", vec![x2.into(), y2.into()]);
        self.op("S", vec![]);
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.op("re", vec![x.into(), y.into(), width.into(), height.into()]);
        self.op("S", vec![]);
    }

    /// Rounded rectangle path, stroked and optionally filled.
    fn round_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32, fill: bool) {
        // Bezier control offset approximating a quarter circle.
        let k = radius * 0.552_284_8;
        let (x2, y2) = (x + width, y + height);

        self.op("m", vec![(x + radius).into(), y.into()]);
        self.op("l", vec![(x2 - radius).into(), y.into()]);
        self.op(
            "c",
            vec![
                (x2 - radius + k).into(),
                y.into(),
                x2.into(),
                (y + radius - k).into(),
                x2.into(),
                (y + radius).into(),
            ],
        );
        self.op("l", vec![x2.into(), (y2 - radius).into()]);
        self.op(
            "c",
            vec![
                x2.into(),
                (y2 - radius + k).into(),
                (x2 - radius + k).into(),
                y2.into(),
                (x2 - radius).into(),
                y2.into(),
            ],
        );
        self.op("l", vec![(x + radius).into(), y2.into()]);
        self.op(
            "c",
            vec![
                (x + radius - k).into(),
                y2.into(),
                x.into(),
                (y2 - radius + k).into(),
                x.into(),
                (y2 - radius).into(),
            ],
        );
        self.op("l", vec![x.into(), (y + radius).into()]);
        self.op(
            "c",
            vec![
                x.into(),
                (y + radius - k).into(),
                (x + radius - k).into(),
                y.into(),
                (x + radius).into(),
                y.into(),
            ],
        );
        self.op("h", vec![]);
        self.op(if fill { "B" } else { "S" }, vec![]);
    }

    fn image(&mut self, image: &PreparedImage, x: f32, y: f32, width: f32, height: f32) {
        let name = format!("Im{}", self.images.len());
        self.op("q", vec![]);
        self.op(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        );
        self.op("Do", vec![Object::Name(name.clone().into_bytes())]);
        self.op("Q", vec![]);
        self.images.push((name, image.clone()));
    }

    fn card(&mut self, x: f32, y: f32, width: f32, height: f32, title: &str) {
        self.fill_color(WHITE);
        self.stroke_color(CARD_BORDER);
        self.line_width(0.6);
        self.round_rect(x, y, width, height, 8.0, true);
        self.fill_color(TITLE);
        self.text(Font::Bold, 12.0, x + 0.6 * CM, y + height - 0.55 * CM, title);
    }

    fn pair(&mut self, x: f32, y: f32, label: &str, value: &str) {
        self.fill_color(TITLE);
        self.text(Font::Bold, 10.0, x, y, &format!("{label}:"));
        self.fill_color(BLACK);
        let value = if value.is_empty() { "-" } else { value };
        self.text(Font::Regular, 10.0, x + 3.2 * CM, y, value);
    }
}

fn image_xobject(image: &PreparedImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        image.jpeg.clone(),
    )
    .with_compression(false)
}

fn draw_header(canvas: &mut Canvas, branding: &PdfBranding, generated_at: &str) {
    if let Some(logo) = branding.logo.as_ref().filter(|l| l.width > 0 && l.height > 0) {
        let height = 3.8 * CM;
        let width = logo.width as f32 * height / logo.height as f32;
        canvas.image(logo, MARGIN_X, PAGE_HEIGHT - height - 0.8 * CM, width, height);
    }

    let title_y = PAGE_HEIGHT - 3.2 * CM;
    let right = PAGE_WIDTH - MARGIN_X;
    canvas.fill_color(TITLE);
    canvas.text_right(Font::Bold, 16.0, right, title_y, "Opdrachtbon");
    canvas.text_right(Font::Regular, 10.0, right, title_y - 0.9 * CM, generated_at);
}

fn draw_details(canvas: &mut Canvas, order: &WorkOrder, top: f32, width: f32) -> f32 {
    let height = 4.8 * CM;
    canvas.card(MARGIN_X, top - height, width, height, "Klant & Voertuig");

    let left = MARGIN_X + 0.8 * CM;
    let right = MARGIN_X + width / 2.0 + 0.2 * CM;
    let y = top - 1.4 * CM;
    let step = 0.85 * CM;

    canvas.pair(left, y, "Klantnaam", &order.customer_name);
    canvas.pair(left, y - step, "Kenteken", &order.plate);
    canvas.pair(left, y - 2.0 * step, "Merk/Type", &order.make_and_model());
    canvas.pair(left, y - 3.0 * step, "Werkzaamheden", &order.work_type);
    canvas.pair(right, y, "Bouwjaar", &order.build_year);
    canvas.pair(right, y - step, "IMEI", &order.imei);
    canvas.pair(right, y - 2.0 * step, "VIN", &order.vin);

    top - height - 0.5 * CM
}

fn draw_notes(canvas: &mut Canvas, notes: &str, top: f32, width: f32) -> f32 {
    let height = 3.6 * CM;
    canvas.card(MARGIN_X, top - height, width, height, "Opmerkingen");

    canvas.fill_color(BLACK);
    let x = MARGIN_X + 0.8 * CM;
    let mut y = top - 1.2 * CM;
    for line in notes.lines().take(NOTES_MAX_LINES) {
        let line: String = line.chars().take(NOTES_MAX_CHARS).collect();
        canvas.text(Font::Regular, 10.0, x, y, &line);
        y -= 14.0;
    }

    top - height - 0.5 * CM
}

fn draw_photos(canvas: &mut Canvas, photos: &[PdfPhoto], top: f32, width: f32) {
    let height = 8.2 * CM;
    canvas.card(MARGIN_X, top - height, width, height, "Foto's");

    let inner_x = MARGIN_X + 0.6 * CM;
    let inner_top = top - 1.4 * CM;
    let cell_w = (width - 1.2 * CM) / GRID_COLUMNS as f32;
    let cell_h = (height - 2.1 * CM) / GRID_ROWS as f32;
    let pad_x = 0.45 * CM;
    let pad_y = 0.75 * CM;
    let max_w = cell_w - 2.0 * pad_x;
    let max_h = cell_h - pad_y - 0.9 * CM;

    for (i, photo) in photos.iter().take(GRID_COLUMNS * GRID_ROWS).enumerate() {
        let cx = inner_x + (i % GRID_COLUMNS) as f32 * cell_w;
        let cy = inner_top - (i / GRID_COLUMNS) as f32 * cell_h;

        canvas.stroke_color(CELL_BORDER);
        canvas.round_rect(
            cx + 0.2 * CM,
            cy - cell_h + 0.2 * CM,
            cell_w - 0.4 * CM,
            cell_h - 0.4 * CM,
            6.0,
            false,
        );

        if let Some(image) = photo.image.as_ref().filter(|img| img.width > 0 && img.height > 0) {
            let scale = (max_w / image.width as f32).min(max_h / image.height as f32);
            let w = image.width as f32 * scale;
            let h = image.height as f32 * scale;
            canvas.stroke_color(PHOTO_FRAME);
            canvas.rect(cx + pad_x, cy - pad_y - max_h, max_w, max_h);
            canvas.image(image, cx + (cell_w - w) / 2.0, cy - pad_y - h, w, h);
        }

        let caption: String = photo.caption.chars().take(70).collect();
        canvas.fill_color(TITLE);
        canvas.text_centered(
            Font::Regular,
            9.0,
            cx + cell_w / 2.0,
            cy - cell_h + 0.45 * CM,
            &caption,
        );
    }
}

fn draw_footer(canvas: &mut Canvas, company_name: &str) {
    canvas.stroke_color(FOOTER_RULE);
    canvas.line_width(0.8);
    canvas.line(MARGIN_X, 2.15 * CM, PAGE_WIDTH - MARGIN_X, 2.15 * CM);
    canvas.fill_color(FOOTER_TEXT);
    canvas.text_centered(
        Font::Oblique,
        9.0,
        PAGE_WIDTH / 2.0,
        1.55 * CM,
        &format!("{company_name} · gegenereerd via webformulier"),
    );
}

/// Renders the work order as a one-page PDF.
///
/// `photos` are drawn in order into a 2×3 grid; a photo without an image
/// keeps its frame and caption. `generated_at` is printed under the title.
pub fn render_work_order(
    order: &WorkOrder,
    photos: &[PdfPhoto],
    branding: &PdfBranding,
    generated_at: &str,
) -> Result<Vec<u8>, PdfError> {
    let mut canvas = Canvas::new();
    let column_width = PAGE_WIDTH - 2.0 * MARGIN_X;

    draw_header(&mut canvas, branding, generated_at);
    let y = draw_details(&mut canvas, order, PAGE_HEIGHT - 6.8 * CM, column_width);
    let y = draw_notes(&mut canvas, &order.notes, y, column_width);
    draw_photos(&mut canvas, photos, y, column_width);
    draw_footer(&mut canvas, &branding.company_name);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in [Font::Regular, Font::Bold, Font::Oblique] {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource(), id);
    }

    let mut xobjects = Dictionary::new();
    for (name, image) in &canvas.images {
        let id: ObjectId = doc.add_object(image_xobject(image));
        xobjects.set(name.as_str(), id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let content = Content {
        operations: canvas.ops,
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::photos::prepare_for_pdf;

    fn order() -> WorkOrder {
        let fields: HashMap<String, String> = [
            ("klantnaam", "Jansen Transport"),
            ("kenteken", "vgk91x"),
            ("merk", "VOLKSWAGEN"),
            ("type", "CRAFTER"),
            ("imei", "49015420323751"),
            ("opmerkingen", "Tracker achter dashboard\nAntenne onder ruit"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        WorkOrder::from_form(&fields, vec![])
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn page_content(pdf: &[u8]) -> Vec<u8> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_page_content(page_id).unwrap()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn image_count(pdf: &[u8]) -> usize {
        let doc = Document::load_mem(pdf).unwrap();
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|n| n == b"Image")
            })
            .count()
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("Foto's"), b"Foto's");
        assert_eq!(win_ansi("a · b"), vec![b'a', b' ', 0xb7, b' ', b'b']);
        assert_eq!(win_ansi("–€"), vec![0x96, 0x80]);
        assert_eq!(win_ansi("✓"), b"?");
    }

    #[test]
    fn test_text_width() {
        assert_eq!(Font::Regular.text_width("", 10.0), 0.0);
        let narrow = Font::Regular.text_width("iii", 10.0);
        let wide = Font::Regular.text_width("WWW", 10.0);
        assert!(narrow < wide);
        assert!(Font::Bold.text_width("Opdrachtbon", 16.0) > Font::Regular.text_width("Opdrachtbon", 16.0));
    }

    #[test]
    fn test_render_contains_fields() {
        let branding = PdfBranding {
            company_name: "IC-North Automotive".into(),
            logo: None,
        };
        let pdf = render_work_order(&order(), &[], &branding, "18-10-2026 09:30").unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let content = page_content(&pdf);
        for needle in [
            &b"(Opdrachtbon)"[..],
            b"(18-10-2026 09:30)",
            b"(Jansen Transport)",
            b"(VGK-91-X)",
            b"(VOLKSWAGEN CRAFTER)",
            b"(490154203237518)",
            b"(Antenne onder ruit)",
            b"(-)",
        ] {
            assert!(contains(&content, needle), "{}", String::from_utf8_lossy(needle));
        }
        assert!(contains(&content, b"gegenereerd via webformulier"));
        assert_eq!(image_count(&pdf), 0);
    }

    #[test]
    fn test_render_embeds_photos_and_logo() {
        let photos = vec![
            PdfPhoto {
                caption: "Kenteken · voor.png".into(),
                image: prepare_for_pdf(&png(64, 48)),
            },
            PdfPhoto {
                caption: "IMEI · kapot.heic".into(),
                image: None,
            },
        ];
        let branding = PdfBranding {
            company_name: "Garage Noord".into(),
            logo: prepare_for_pdf(&png(120, 40)),
        };

        let pdf = render_work_order(&order(), &photos, &branding, "01-01-2026 08:00").unwrap();
        assert_eq!(image_count(&pdf), 2);

        let content = page_content(&pdf);
        assert!(contains(&content, b"/Im0 Do"));
        assert!(contains(&content, b"/Im1 Do"));
        assert!(contains(&content, b"IMEI \xb7 kapot.heic"));
        assert!(contains(&content, b"Garage Noord"));
    }

    #[test]
    fn test_notes_are_capped() {
        let mut order = order();
        order.notes = (0..40).map(|i| format!("regel {i}\n")).collect();
        let pdf = render_work_order(&order, &[], &PdfBranding::default(), "").unwrap();
        let content = page_content(&pdf);
        assert!(contains(&content, b"(regel 21)"));
        assert!(!contains(&content, b"(regel 22)"));
    }
}
