//! Shared fixtures for dmx-survey integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use dmx_common::{ArtworkRecord, Catalog};
use dmx_survey::services::{ExternalLog, FetchError, ImageFetcher, LogTable, SheetsError};

/// Catalog of `n` artworks with distinct curator and AI texts
pub fn catalog(n: usize) -> Catalog {
    let records = (0..n)
        .map(|i| ArtworkRecord {
            id: format!("art-{}", i),
            title: format!("Artwork {}", i),
            artist: if i % 3 == 0 { None } else { Some(format!("Painter {}", i)) },
            image_url: format!("http://images.test/{}.png", i),
            curator_description: Some(format!("Curator note {}", i)),
            ai_description: Some(format!("Generated story {}", i)),
            theme: if i % 2 == 0 { Some("Landscapes".to_string()) } else { None },
        })
        .collect();
    Catalog::new(records).unwrap()
}

/// External log that records every append, or fails every append
#[derive(Default)]
pub struct RecordingLog {
    pub appends: Mutex<Vec<(LogTable, Vec<Vec<String>>)>>,
    pub fail: bool,
}

impl RecordingLog {
    pub fn failing() -> Self {
        Self {
            appends: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn appends_to(&self, table: LogTable) -> Vec<Vec<Vec<String>>> {
        self.appends
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, rows)| rows.clone())
            .collect()
    }
}

#[async_trait]
impl ExternalLog for RecordingLog {
    async fn append_rows(&self, table: LogTable, rows: Vec<Vec<String>>) -> Result<usize, SheetsError> {
        if self.fail {
            return Err(SheetsError::Network("connection refused".to_string()));
        }
        let count = rows.len();
        self.appends.lock().unwrap().push((table, rows));
        Ok(count)
    }
}

/// Image source that returns a fixed response for every URL
pub struct StaticImages(pub Result<Vec<u8>, FetchError>);

impl StaticImages {
    pub fn png() -> Self {
        Self(Ok(png_bytes(12, 8)))
    }

    pub fn not_found() -> Self {
        Self(Err(FetchError::Status(404)))
    }
}

#[async_trait]
impl ImageFetcher for StaticImages {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.0.clone()
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 90, 160]));
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}
