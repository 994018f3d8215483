//! End-to-end scenarios for the citizen request desk, driven through the public
//! service facade, the SQLite store, and the HTTP router.

mod common {
    use std::io::Cursor;
    use std::sync::Arc;

    use fispa::requests::{RequestIntakeService, RequestSubmission, SqliteRequestStore};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    pub(super) struct Fixture {
        pub(super) dir: TempDir,
        pub(super) service: Arc<RequestIntakeService<SqliteRequestStore>>,
    }

    pub(super) fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SqliteRequestStore::open(dir.path().join("desk.db")).expect("store opens");
        Fixture {
            dir,
            service: Arc::new(RequestIntakeService::new(Arc::new(store))),
        }
    }

    pub(super) fn photo() -> Vec<u8> {
        let image = RgbImage::from_pixel(12, 8, Rgb([200, 180, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encodes");
        bytes
    }

    pub(super) fn submission(name: &str, neighborhood: &str) -> RequestSubmission {
        RequestSubmission {
            name: name.to_string(),
            national_id: "529.982.247-25".to_string(),
            phone: "(61) 98888-7777".to_string(),
            neighborhood: neighborhood.to_string(),
            address: "Quadra 12, Casa 4".to_string(),
            comment: "buraco em frente à escola".to_string(),
            photo: Some(photo()),
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use fispa::requests::{
    request_router, write_csv, IntakeServiceError, RequestId, RequestStatus, RequestStore,
    SharedSecretPolicy, SqliteRequestStore, StatusUpdate, ValidationError, ADMIN_TOKEN_HEADER,
    EXPORT_HEADERS,
};
use tower::ServiceExt;

#[test]
fn resident_submission_flows_through_status_changes_to_dashboard() {
    let fixture = fixture();
    let service = &fixture.service;

    let first = service
        .submit(submission("Joana Prado", "Parque das Rosas"))
        .expect("first accepted");
    let second = service
        .submit(submission("Joana Prado", "Parque das Rosas"))
        .expect("second accepted");
    let third = service
        .submit(submission("Rafael Lima", "Aldeia da Paz"))
        .expect("third accepted");

    assert_eq!(first.national_id, "52998224725");
    assert_eq!(first.status, RequestStatus::Open);

    service
        .update_status(first.id, "Completed")
        .expect("status updated");
    service
        .update_status(third.id, "In Progress")
        .expect("status updated");

    let summary = service.dashboard(5).expect("dashboard");
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.count_for(RequestStatus::Open), 1);
    assert_eq!(summary.count_for(RequestStatus::InProgress), 1);
    assert_eq!(summary.count_for(RequestStatus::Completed), 1);
    assert_eq!(summary.by_neighborhood[0].neighborhood, "Parque das Rosas");
    assert_eq!(summary.by_neighborhood[0].count, 2);
    assert_eq!(summary.top_submitters[0].name, "Joana Prado");
    assert_eq!(summary.top_submitters[0].count, 2);

    assert_eq!(
        service.get(second.id).expect("present").status,
        RequestStatus::Open
    );
}

#[test]
fn rejected_submission_leaves_the_table_untouched() {
    let fixture = fixture();
    let mut bad = submission("", "Bairro Novo");
    bad.national_id = "1234567890".to_string();
    bad.photo = Some(b"not an image".to_vec());

    let errors = match fixture.service.submit(bad) {
        Err(IntakeServiceError::Validation(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    };

    assert_eq!(errors.len(), 4);
    assert!(errors
        .iter()
        .any(|error| matches!(error, ValidationError::InvalidFormat { digits: 10 })));
    assert!(errors
        .iter()
        .any(|error| matches!(error, ValidationError::UnknownNeighborhood(value) if value == "Bairro Novo")));
    assert!(errors
        .iter()
        .any(|error| matches!(error, ValidationError::InvalidPhoto(_))));
    assert!(fixture.service.list_all().expect("list").is_empty());
}

#[test]
fn export_writes_newest_first_to_disk() {
    let fixture = fixture();
    let older = fixture
        .service
        .submit(submission("Rafael Lima", "Centro"))
        .expect("accepted");
    let newer = fixture
        .service
        .submit(submission("Joana Prado", "Vila União"))
        .expect("accepted");

    let rows = fixture.service.export_rows().expect("rows");
    let target = fixture.dir.path().join("export.csv");
    let file = std::fs::File::create(&target).expect("file created");
    write_csv(&rows, file).expect("csv written");

    let written = std::fs::read_to_string(&target).expect("file read");
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], EXPORT_HEADERS.join(";"));
    assert!(lines[1].starts_with(&format!("{};", newer.id)));
    assert!(lines[1].contains(";Vila União;"));
    assert!(lines[2].starts_with(&format!("{};", older.id)));
    assert!(lines[2].ends_with(";yes;Open"));
}

#[test]
fn stores_sharing_a_file_see_each_others_writes() {
    let fixture = fixture();
    let created = fixture
        .service
        .submit(submission("Rafael Lima", "Centro"))
        .expect("accepted");

    let second_handle =
        SqliteRequestStore::open(fixture.dir.path().join("desk.db")).expect("reopens");
    assert_eq!(
        second_handle
            .update_status(created.id, RequestStatus::Completed)
            .expect("update"),
        StatusUpdate::Updated
    );
    assert_eq!(
        second_handle
            .update_status(RequestId(created.id.0 + 100), RequestStatus::Completed)
            .expect("update"),
        StatusUpdate::NoMatchingRecord
    );

    assert_eq!(
        fixture.service.get(created.id).expect("present").status,
        RequestStatus::Completed
    );
}

#[tokio::test]
async fn router_serves_the_public_form_and_guards_staff_views() {
    let fixture = fixture();
    let router = request_router(
        fixture.service.clone(),
        Arc::new(SharedSecretPolicy::new("desk-secret")),
    );

    let payload = serde_json::json!({
        "name": "Joana Prado",
        "national_id": "52998224725",
        "phone": "61988887777",
        "neighborhood": "Centro",
        "address": "Quadra 12, Casa 4",
        "photo": base64_photo(),
    });
    let created = router
        .clone()
        .oneshot(
            Request::post("/api/v1/requests")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);

    let denied = router
        .clone()
        .oneshot(
            Request::get("/api/v1/exports/requests.csv")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = router
        .oneshot(
            Request::get("/api/v1/exports/requests.csv")
                .header(ADMIN_TOKEN_HEADER, "desk-secret")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(allowed.status(), StatusCode::OK);
}

fn base64_photo() -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(photo())
}
