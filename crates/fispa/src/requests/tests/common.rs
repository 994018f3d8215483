use std::io::Cursor;
use std::sync::Arc;

use axum::response::Response;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

use crate::requests::domain::{NationalId, Neighborhood, NewRequest, RequestSubmission};
use crate::requests::{
    request_router, RequestIntakeService, SharedSecretPolicy, SqliteRequestStore,
};

pub(super) const STAFF_TOKEN: &str = "paving-crew";

/// Scratch database plus a service wired to it. The directory lives as long as the desk.
pub(super) struct Desk {
    _dir: TempDir,
    pub(super) store: Arc<SqliteRequestStore>,
    pub(super) service: Arc<RequestIntakeService<SqliteRequestStore>>,
}

impl Desk {
    pub(super) fn router(&self) -> axum::Router {
        request_router(
            self.service.clone(),
            Arc::new(SharedSecretPolicy::new(STAFF_TOKEN)),
        )
    }

    /// Insert straight through the store, bypassing validation.
    pub(super) fn seed(&self, name: &str, neighborhood: Neighborhood) -> crate::requests::Request {
        use crate::requests::RequestStore;
        self.store
            .create(stored_request(name, neighborhood))
            .expect("seed insert")
    }
}

pub(super) fn desk() -> Desk {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(
        SqliteRequestStore::open(dir.path().join("fispa.db")).expect("store opens"),
    );
    let service = Arc::new(RequestIntakeService::new(store.clone()));
    Desk {
        _dir: dir,
        store,
        service,
    }
}

pub(super) fn jpeg_photo(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([90, 90, 90]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("jpeg encodes");
    bytes
}

pub(super) fn rgba_png_photo(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([10, 120, 30, 200]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encodes");
    bytes
}

/// Pseudo-random pixels so the PNG barely compresses.
pub(super) fn noisy_png_photo(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    let image = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encodes");
    bytes
}

pub(super) fn maria_submission() -> RequestSubmission {
    RequestSubmission {
        name: "Maria Silva".to_string(),
        national_id: "123.456.789-00".to_string(),
        phone: "61999999999".to_string(),
        neighborhood: "Centro".to_string(),
        address: "Rua A, 10".to_string(),
        comment: String::new(),
        photo: Some(jpeg_photo(10, 10)),
    }
}

pub(super) fn stored_request(name: &str, neighborhood: Neighborhood) -> NewRequest {
    NewRequest {
        name: name.to_string(),
        national_id: NationalId("98765432100".to_string()),
        phone: "6133334444".to_string(),
        neighborhood,
        address: "Quadra 3, Lote 7".to_string(),
        comment: "cratera na pista".to_string(),
        photo: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
