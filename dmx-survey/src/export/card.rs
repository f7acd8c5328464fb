//! PDF exhibition card
//!
//! A card is laid out as a list of positioned text runs and images per page,
//! then written with `lopdf`. Coordinates are PDF points with the origin at
//! the bottom-left corner of a US-Letter page.
//!
//! Image loading is best-effort: any fetch or decode failure puts the
//! [`IMAGE_UNAVAILABLE`] marker in the image box and the card is still built.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use tracing::{debug, warn};

use dmx_common::Catalog;

use super::wrap::wrap;
use super::ExportError;
use crate::models::CuratedExhibition;
use crate::services::ImageFetcher;
use crate::workflow::{description_for, NO_DESCRIPTION};

pub const PAGE_WIDTH: i64 = 612;
pub const PAGE_HEIGHT: i64 = 792;
pub const MARGIN: i64 = 72;
pub const IMAGE_BOX_WIDTH: i64 = 432;
pub const IMAGE_BOX_HEIGHT: i64 = 288;
pub const BODY_WRAP: usize = 90;
pub const INTRO_WRAP: usize = 100;

/// Marker drawn in place of an artwork image that could not be loaded
pub const IMAGE_UNAVAILABLE: &str = "[Image could not be loaded]";

const TITLE_WRAP: usize = 36;
const HEADING_WRAP: usize = 48;
const TOP: i64 = PAGE_HEIGHT - MARGIN;

// Decoded images are downscaled to twice the box size
const MAX_RASTER_WIDTH: u32 = 864;
const MAX_RASTER_HEIGHT: u32 = 576;

/// One selected artwork as it appears on the card
#[derive(Debug, Clone, PartialEq)]
pub struct CardArtwork {
    pub artwork_id: String,
    pub title: String,
    pub theme: Option<String>,
    pub image_url: String,
    /// Text of the description the participant preferred
    pub description: String,
}

impl CardArtwork {
    pub fn theme_line(&self) -> String {
        match self.theme.as_deref().map(str::trim) {
            Some(theme) if !theme.is_empty() => format!("Theme: {}", theme),
            _ => "Theme: Not specified".to_string(),
        }
    }
}

/// Resolve the selected artworks and their chosen description text
pub fn card_artworks(
    exhibition: &CuratedExhibition,
    catalog: &Catalog,
) -> Result<Vec<CardArtwork>, ExportError> {
    exhibition
        .selected_ids
        .iter()
        .map(|id| {
            let record = catalog
                .find(id)
                .ok_or_else(|| ExportError::MissingArtwork(id.clone()))?;
            let description = match exhibition.preferences.get(id) {
                Some(preference) => description_for(record, preference.chosen_source()),
                None => NO_DESCRIPTION.to_string(),
            };
            Ok(CardArtwork {
                artwork_id: record.id.clone(),
                title: record.title.clone(),
                theme: record.theme.clone(),
                image_url: record.image_url.clone(),
                description,
            })
        })
        .collect()
}

/// Decoded 8-bit RGB pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        let scaled = if decoded.width() > MAX_RASTER_WIDTH || decoded.height() > MAX_RASTER_HEIGHT {
            decoded.thumbnail(MAX_RASTER_WIDTH, MAX_RASTER_HEIGHT)
        } else {
            decoded
        };
        let rgb = scaled.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    /// Draw size scaled to fit the image box, aspect ratio preserved
    fn fitted(&self) -> (i64, i64) {
        let scale = f64::min(
            IMAGE_BOX_WIDTH as f64 / self.width.max(1) as f64,
            IMAGE_BOX_HEIGHT as f64 / self.height.max(1) as f64,
        );
        let width = (self.width as f64 * scale).round().max(1.0) as i64;
        let height = (self.height as f64 * scale).round().max(1.0) as i64;
        (width.min(IMAGE_BOX_WIDTH), height.min(IMAGE_BOX_HEIGHT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Positioned drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        font: Font,
        size: i64,
        x: i64,
        y: i64,
        text: String,
    },
    Image {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        raster: RasterImage,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPage {
    pub elements: Vec<Element>,
}

impl CardPage {
    /// Text runs in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Image { .. } => None,
        })
    }

    pub fn has_image(&self) -> bool {
        self.elements.iter().any(|e| matches!(e, Element::Image { .. }))
    }
}

/// Horizontal start that centers `text` using an average glyph width of half the font size
fn centered_x(text: &str, size: i64) -> i64 {
    let width = text.chars().count() as f64 * size as f64 * 0.5;
    ((PAGE_WIDTH as f64 - width) / 2.0).round().max(MARGIN as f64) as i64
}

/// Top-to-bottom page filler that starts a new page when content reaches the bottom margin
struct Flow {
    pages: Vec<CardPage>,
    current: CardPage,
    cursor: i64,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: CardPage::default(),
            cursor: TOP,
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = TOP;
    }

    /// Reserve `height` points, breaking the page first if they do not fit
    fn reserve(&mut self, height: i64) -> i64 {
        if self.cursor - height < MARGIN && !self.current.elements.is_empty() {
            self.new_page();
        }
        let top = self.cursor;
        self.cursor -= height;
        top
    }

    fn gap(&mut self, height: i64) {
        self.cursor -= height;
    }

    fn line(&mut self, font: Font, size: i64, leading: i64, x: Option<i64>, text: &str) {
        let top = self.reserve(leading);
        let x = x.unwrap_or_else(|| centered_x(text, size));
        self.current.elements.push(Element::Text {
            font,
            size,
            x,
            y: top - size,
            text: text.to_string(),
        });
    }

    fn finish(mut self) -> Vec<CardPage> {
        if !self.current.elements.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

fn layout_cover(flow: &mut Flow, exhibition: &CuratedExhibition) {
    flow.gap(MARGIN);
    for line in wrap(&exhibition.title, TITLE_WRAP) {
        flow.line(Font::Bold, 24, 30, None, &line);
    }
    flow.gap(6);
    let count = exhibition.selected_ids.len();
    let subtitle = format!(
        "A curated exhibition of {} artwork{}",
        count,
        if count == 1 { "" } else { "s" }
    );
    flow.line(Font::Regular, 11, 16, None, &subtitle);
    flow.gap(24);
    for line in wrap(&exhibition.description, INTRO_WRAP) {
        flow.line(Font::Regular, 9, 13, Some(MARGIN), &line);
    }
}

fn layout_artwork(flow: &mut Flow, artwork: &CardArtwork, image: Option<RasterImage>) {
    flow.new_page();

    for line in wrap(&artwork.title, HEADING_WRAP) {
        flow.line(Font::Bold, 18, 24, Some(MARGIN), &line);
    }
    flow.line(Font::Regular, 12, 18, Some(MARGIN), &artwork.theme_line());
    flow.gap(12);

    let box_top = flow.reserve(IMAGE_BOX_HEIGHT);
    let box_left = (PAGE_WIDTH - IMAGE_BOX_WIDTH) / 2;
    let box_bottom = box_top - IMAGE_BOX_HEIGHT;
    match image {
        Some(raster) => {
            let (width, height) = raster.fitted();
            flow.current.elements.push(Element::Image {
                x: box_left + (IMAGE_BOX_WIDTH - width) / 2,
                y: box_bottom + (IMAGE_BOX_HEIGHT - height) / 2,
                width,
                height,
                raster,
            });
        }
        None => {
            flow.current.elements.push(Element::Text {
                font: Font::Regular,
                size: 12,
                x: centered_x(IMAGE_UNAVAILABLE, 12),
                y: box_bottom + IMAGE_BOX_HEIGHT / 2 - 6,
                text: IMAGE_UNAVAILABLE.to_string(),
            });
        }
    }
    flow.gap(18);

    for line in wrap(&artwork.description, BODY_WRAP) {
        flow.line(Font::Regular, 10, 14, Some(MARGIN), &line);
    }
}

/// Lay out the cover and one page per artwork
///
/// `images` is parallel to `artworks`; `None` marks an image that could not
/// be loaded. Long text continues onto extra pages.
pub fn layout_card(
    exhibition: &CuratedExhibition,
    artworks: &[CardArtwork],
    images: Vec<Option<RasterImage>>,
) -> Vec<CardPage> {
    let mut flow = Flow::new();
    layout_cover(&mut flow, exhibition);

    let mut images = images.into_iter();
    for artwork in artworks {
        let image = images.next().flatten();
        layout_artwork(&mut flow, artwork, image);
    }
    flow.finish()
}

async fn load_image(fetcher: &dyn ImageFetcher, artwork: &CardArtwork) -> Option<RasterImage> {
    let bytes = match fetcher.fetch(&artwork.image_url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(artwork_id = %artwork.artwork_id, url = %artwork.image_url, error = %e, "Artwork image fetch failed");
            return None;
        }
    };
    match RasterImage::decode(&bytes) {
        Ok(raster) => {
            debug!(artwork_id = %artwork.artwork_id, width = raster.width, height = raster.height, "Decoded artwork image");
            Some(raster)
        }
        Err(e) => {
            warn!(artwork_id = %artwork.artwork_id, error = %e, "Artwork image could not be decoded");
            None
        }
    }
}

/// Build the exhibition card PDF
pub async fn render_card(
    exhibition: &CuratedExhibition,
    artworks: &[CardArtwork],
    fetcher: &dyn ImageFetcher,
) -> Result<Vec<u8>, ExportError> {
    let mut images = Vec::with_capacity(artworks.len());
    for artwork in artworks {
        images.push(load_image(fetcher, artwork).await);
    }
    let pages = layout_card(exhibition, artworks, images);
    write_pdf(&pages)
}

/// Encode text for the standard Type1 fonts (WinAnsiEncoding)
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            '\u{20AC}' => 0x80,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn font_dictionary(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Serialize laid-out pages; streams are left uncompressed
pub fn write_pdf(pages: &[CardPage]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();
        let mut image_count = 0;

        for element in &page.elements {
            match element {
                Element::Text { font, size, x, y, text } => {
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new("Tf", vec![font.resource_name().into(), (*size).into()]));
                    operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    operations.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
                    operations.push(Operation::new("ET", vec![]));
                }
                Element::Image { x, y, width, height, raster } => {
                    image_count += 1;
                    let name = format!("Im{}", image_count);
                    let image_stream = Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => raster.width as i64,
                            "Height" => raster.height as i64,
                            "ColorSpace" => "DeviceRGB",
                            "BitsPerComponent" => 8i64,
                        },
                        raster.rgb.clone(),
                    );
                    let image_id = doc.add_object(image_stream);
                    xobjects.set(name.clone(), image_id);

                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            (*width).into(),
                            0i64.into(),
                            0i64.into(),
                            (*height).into(),
                            (*x).into(),
                            (*y).into(),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    operations.push(Operation::new("Q", vec![]));
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => regular_id,
                    "F2" => bold_id,
                },
                "XObject" => xobjects,
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

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DescriptionLabel, DescriptionOrdering, DescriptionPreference, DescriptionSource};
    use crate::services::FetchError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    struct Fixed(Result<Vec<u8>, FetchError>);

    #[async_trait]
    impl ImageFetcher for Fixed {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.0.clone()
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"[
                {"id": "a1", "title": "Water Lilies", "image_url": "http://img/a1.png",
                 "description": "Curator text for lilies.", "ai_story": "AI text for lilies.", "theme": "Nature"},
                {"id": 7, "title": "Nighthawks", "image_url": "http://img/7.png",
                 "description": "Curator text for a diner."}
            ]"#,
        )
        .unwrap()
    }

    fn exhibition() -> CuratedExhibition {
        let mut preferences = BTreeMap::new();
        preferences.insert(
            "a1".to_string(),
            DescriptionPreference::new(
                "Water Lilies",
                DescriptionLabel::B,
                DescriptionOrdering {
                    slot_a: DescriptionSource::Curator,
                    slot_b: DescriptionSource::Ai,
                },
            ),
        );
        preferences.insert(
            "7".to_string(),
            DescriptionPreference::new(
                "Nighthawks",
                DescriptionLabel::B,
                DescriptionOrdering {
                    slot_a: DescriptionSource::Curator,
                    slot_b: DescriptionSource::Ai,
                },
            ),
        );
        CuratedExhibition {
            selected_ids: vec!["a1".to_string(), "7".to_string()],
            title: "My Picks".to_string(),
            description: "Favorites.".to_string(),
            preferences,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_artworks_resolve_chosen_source() {
        let artworks = card_artworks(&exhibition(), &catalog()).unwrap();
        assert_eq!(artworks.len(), 2);
        assert_eq!(artworks[0].description, "AI text for lilies.");
        assert_eq!(artworks[0].theme_line(), "Theme: Nature");
        // Chosen AI slot has no text for this record
        assert_eq!(artworks[1].description, NO_DESCRIPTION);
        assert_eq!(artworks[1].theme_line(), "Theme: Not specified");
    }

    #[test]
    fn test_card_artworks_missing_record() {
        let mut ex = exhibition();
        ex.selected_ids.push("gone".to_string());
        let err = card_artworks(&ex, &catalog()).unwrap_err();
        assert!(matches!(err, ExportError::MissingArtwork(id) if id == "gone"));
    }

    #[test]
    fn test_layout_cover_plus_page_per_artwork() {
        let ex = exhibition();
        let artworks = card_artworks(&ex, &catalog()).unwrap();
        let raster = RasterImage::decode(&png_bytes(40, 20)).unwrap();
        let pages = layout_card(&ex, &artworks, vec![Some(raster), None]);

        assert_eq!(pages.len(), 3);
        assert!(pages[0].texts().any(|t| t == "My Picks"));
        assert!(pages[0].texts().any(|t| t == "Favorites."));

        assert!(pages[1].has_image());
        assert!(!pages[1].texts().any(|t| t == IMAGE_UNAVAILABLE));

        assert!(!pages[2].has_image());
        assert!(pages[2].texts().any(|t| t == IMAGE_UNAVAILABLE));
        assert!(pages[2].texts().any(|t| t == "Theme: Not specified"));
    }

    #[test]
    fn test_image_is_aspect_fit_in_box() {
        let wide = RasterImage {
            width: 800,
            height: 200,
            rgb: vec![0; 800 * 200 * 3],
        };
        assert_eq!(wide.fitted(), (432, 108));

        let tall = RasterImage {
            width: 100,
            height: 400,
            rgb: vec![0; 100 * 400 * 3],
        };
        assert_eq!(tall.fitted(), (72, 288));
    }

    #[test]
    fn test_long_description_continues_on_next_page() {
        let ex = exhibition();
        let mut artworks = card_artworks(&ex, &catalog()).unwrap();
        artworks.truncate(1);
        artworks[0].description = "word ".repeat(2000);

        let pages = layout_card(&ex, &artworks, vec![None]);
        assert!(pages.len() > 2);
        for page in &pages {
            for element in &page.elements {
                if let Element::Text { y, .. } = element {
                    assert!(*y >= MARGIN - 10);
                }
            }
        }
    }

    #[test]
    fn test_centered_title_is_centered() {
        let x = centered_x("My Picks", 24);
        // 8 chars * 12pt average width = 96pt
        assert_eq!(x, (612 - 96) / 2);
        assert_eq!(centered_x(&"W".repeat(200), 24), MARGIN);
    }

    #[test]
    fn test_win_ansi_maps_typographic_quotes() {
        assert_eq!(win_ansi("It\u{2019}s"), vec![b'I', b't', 0x92, b's']);
        assert_eq!(win_ansi("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi("\u{4e2d}"), vec![b'?']);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(RasterImage::decode(b"not an image").is_err());
    }

    #[tokio::test]
    async fn test_render_with_missing_image_keeps_marker_and_text() {
        let ex = exhibition();
        let artworks = card_artworks(&ex, &catalog()).unwrap();
        let bytes = render_card(&ex, &artworks, &Fixed(Err(FetchError::Status(404))))
            .await
            .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);

        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("Image could not be loaded"));
        assert!(raw.contains("AI text for lilies."));
    }

    #[tokio::test]
    async fn test_render_with_image_embeds_xobject() {
        let ex = exhibition();
        let artworks = card_artworks(&ex, &catalog()).unwrap();
        let bytes = render_card(&ex, &artworks, &Fixed(Ok(png_bytes(30, 10))))
            .await
            .unwrap();

        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("/Im1"));
        assert!(raw.contains("/DeviceRGB"));
        assert!(!raw.contains("Image could not be loaded"));
    }
}
