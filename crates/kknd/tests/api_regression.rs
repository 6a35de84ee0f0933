//! Router-level regression tests: the full HTTP surface over one store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use kkn_api::{ApiSettings, NullOracle, build_router};
use kkn_state::StateStore;
use serde_json::{Value, json};
use tower::ServiceExt;

fn router() -> Router {
    build_router(
        StateStore::open_in_memory().unwrap(),
        ApiSettings::default(),
        Arc::new(NullOracle),
    )
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn roster(count: usize) -> Value {
    let students: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "NIM": format!("2101{i:04}"),
                "Nama": format!("Mahasiswa {i:02}"),
                "Prodi": (["Informatika", "Hukum", "Agroteknologi"][i % 3]),
                "Fakultas": (["Teknik", "Hukum", "Pertanian"][i % 3]),
                "Jenis Kelamin": if i % 2 == 0 { "Laki-laki" } else { "Perempuan" },
                "Nomor Telepon": format!("0812{i:06}")
            })
        })
        .collect();
    Value::Array(students)
}

async fn seed_locations(router: &Router) {
    let bodies = [
        json!({ "lokasi": "Wates", "desa": "Wates", "kecamatan": "Wates",
                "kabupaten": "Kulon Progo", "kuota_total": 40,
                "latitude": -7.8607, "longitude": 110.1583, "faskes": 1 }),
        json!({ "lokasi": "Sleman", "desa_kecamatan": "Tridadi / Sleman",
                "kabupaten": "Sleman", "kuota": "40",
                "latitude": "-7.7167", "longitude": "110.3550", "faskes": 0 }),
        json!({ "lokasi": "Bantul", "desa": "Trirenggo", "kecamatan": "Bantul",
                "kabupaten": "Bantul", "kuota_total": 40,
                "latitude": -7.8881, "longitude": 110.3289 }),
    ];
    for body in bodies {
        let (status, _) = send(router, "POST", "/api/locations", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn healthz_and_unknown_routes() {
    let router = router();
    let (status, body) = send(&router, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "ok");

    let (status, _) = send(&router, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_grouping_workflow() {
    let router = router();
    seed_locations(&router).await;

    let (status, body) = send(&router, "GET", "/api/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 3);
    let sleman = listed.iter().find(|l| l["lokasi"] == "Sleman").unwrap();
    assert_eq!(sleman["desa"], "Tridadi");
    assert_eq!(sleman["kecamatan"], "Sleman");
    assert_eq!(sleman["sisa_kuota"], 40);

    let (status, body) = send(&router, "GET", "/api/locations/by-distance", None).await;
    assert_eq!(status, StatusCode::OK);
    let ranked: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["lokasi"].as_str().unwrap())
        .collect();
    assert_eq!(ranked, ["Sleman", "Bantul", "Wates"]);

    let (status, body) = send(
        &router,
        "POST",
        "/api/filter-criteria",
        Some(json!({
            "nama_kriteria": "Campuran",
            "min_jumlah_mahasiswa": 8,
            "max_jumlah_mahasiswa": 12,
            "jenis_kelamin": "semua"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_active"], true);

    let (status, body) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({
            "nama_angkatan": "KKN Reguler",
            "angkatan_ke": 84,
            "mahasiswaList": roster(50)
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    let id = data["id_grouping"].as_u64().unwrap();
    assert_eq!(data["jumlah_kelompok"], 7);
    assert_eq!(data["jumlah_mahasiswa"], 50);
    assert_eq!(data["filter_criteria"]["nama_kriteria"], "Campuran");
    assert_eq!(data["groups"][0]["lokasi"], "Sleman");
    assert_eq!(data["groups"][0]["desa_kecamatan"], "Tridadi / Sleman");

    let (status, body) = send(&router, "GET", "/api/grouping-history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["nama_angkatan"], "KKN Reguler");

    let uri = format!("/api/grouping-results/{id}");
    let (status, body) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 50);
    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 7);
    assert_eq!(groups[0]["nomor_kelompok"], 1);
    let members: usize = groups
        .iter()
        .map(|g| g["anggota"].as_array().unwrap().len())
        .sum();
    assert_eq!(members, 50);

    let history_uri = format!("/api/grouping-history/{id}");
    let (status, body) = send(&router, "DELETE", &history_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedId"], id);

    let (status, _) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn autogroup_rejects_bad_input() {
    let router = router();
    seed_locations(&router).await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({ "nama_angkatan": "KKN", "mahasiswaList": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({
            "nama_angkatan": "KKN",
            "mahasiswaList": roster(20),
            "filterCriteria": { "minJumlahMahasiswa": 12, "maxJumlahMahasiswa": 8 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({ "nama_angkatan": "KKN", "mahasiswaList": roster(20), "criteria_id": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "GET", "/api/grouping-history", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn location_validation_and_lifecycle() {
    let router = router();

    let (status, body) = send(
        &router,
        "POST",
        "/api/locations",
        Some(json!({ "lokasi": "Pakem", "kabupaten": "Sleman" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("desa"));
    assert!(msg.contains("kuota_total"));

    let (status, body) = send(
        &router,
        "POST",
        "/api/locations",
        Some(json!({ "lokasi": "Pakem", "desa": "Harjobinangun", "kecamatan": "Pakem",
                     "kabupaten": "Sleman", "kuota_total": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id_lokasi"].as_u64().unwrap();

    let uri = format!("/api/locations/{id}");
    let (status, body) = send(
        &router,
        "PUT",
        &uri,
        Some(json!({ "lokasi": "Pakem Baru", "desa": "Harjobinangun", "kecamatan": "Pakem",
                     "kabupaten": "Sleman", "kuota_total": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lokasi"], "Pakem Baru");
    assert_eq!(body["data"]["kuota_total"], 25);

    let (status, _) = send(&router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn criteria_names_are_unique() {
    let router = router();
    let body = json!({ "nama_kriteria": "Putri", "jenis_kelamin": "perempuan" });
    let (status, _) = send(&router, "POST", "/api/filter-criteria", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let dup = json!({ "nama_kriteria": "PUTRI" });
    let (status, _) = send(&router, "POST", "/api/filter-criteria", Some(dup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kkn.redb");

    {
        let router = build_router(
            StateStore::open(&path).unwrap(),
            ApiSettings::default(),
            Arc::new(NullOracle),
        );
        seed_locations(&router).await;
    }

    let router = build_router(
        StateStore::open(&path).unwrap(),
        ApiSettings::default(),
        Arc::new(NullOracle),
    );
    let (status, body) = send(&router, "GET", "/api/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_gender_filter_is_a_bad_request() {
    let router = router();
    seed_locations(&router).await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({
            "nama_angkatan": "KKN",
            "mahasiswaList": roster(20),
            "filterCriteria": { "jenis_kelamin": "L" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("unknown variant"));

    let (status, body) = send(
        &router,
        "POST",
        "/api/filter-criteria",
        Some(json!({ "nama_kriteria": "Putra", "jenis_kelamin": "Laki-laki" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unknown variant"));
}

#[tokio::test]
async fn roster_rows_with_duplicate_spellings_are_grouped() {
    let router = router();
    seed_locations(&router).await;

    let students: Vec<Value> = (0..16)
        .map(|i| {
            json!({
                "nim": "",
                "NIM": format!("2101{i:04}"),
                "nama": format!("Mahasiswa {i:02}"),
                "Nama": format!("Mahasiswa {i:02}"),
                "jenis_kelamin": "P",
                "Jenis Kelamin": "P"
            })
        })
        .collect();

    let (status, body) = send(
        &router,
        "POST",
        "/api/autogroup",
        Some(json!({ "nama_angkatan": "KKN", "mahasiswaList": students })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["jumlah_mahasiswa"], 16);
    assert_eq!(body["data"]["groups"][0]["anggota"][0]["nim"], "21010000");
}
