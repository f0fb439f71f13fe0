//! Router tests against an in-memory SQLite store.

use std::{io::Cursor, sync::Arc};

use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use barbaros_core::{
  account::{NewAdmin, StaffRole},
  client::{ClientRecord, NewClient},
  store::ClientRepository,
};
use barbaros_qr::{RenderOptions, badge_payload, encode_badge};
use barbaros_store_sqlite::SqliteStore;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

const ADMIN_EMAIL: &str = "desk@barbaros.test";
const ADMIN_PASS: &str = "clippers";
const CLIENT_PASS: &str = "fresh-fade";

type Creds<'a> = Option<(&'a str, &'a str)>;

const ADMIN: Creds<'static> = Some((ADMIN_EMAIL, ADMIN_PASS));

// ── Harness ──────────────────────────────────────────────────────────────────

/// Argon2id with the smallest legal cost; verification reads the params back
/// out of the PHC string.
fn cheap_hash(password: &str) -> String {
  let params = Params::new(8, 1, 1, None).unwrap();
  Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
    .unwrap()
    .to_string()
}

async fn make_state(config: ApiConfig) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .create_admin(NewAdmin {
      email:         ADMIN_EMAIL.to_owned(),
      name:          "Front Desk".to_owned(),
      staff_role:    StaffRole::Receptionist,
      password_hash: cheap_hash(ADMIN_PASS),
    })
    .await
    .unwrap();

  AppState { store: Arc::new(store), config: Arc::new(config) }
}

async fn seed_client(state: &AppState<SqliteStore>, email: &str, last_name: &str) -> ClientRecord {
  state
    .store
    .create_client(NewClient {
      first_name: "Marcus".to_owned(),
      last_name: last_name.to_owned(),
      email: email.to_owned(),
      phone_number: "(555) 010-2000".to_owned(),
      password_hash: Some(cheap_hash(CLIENT_PASS)),
      ..NewClient::default()
    })
    .await
    .unwrap()
}

fn auth_header(email: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{email}:{pass}")))
}

fn request(method: &str, uri: &str, creds: Creds<'_>) -> axum::http::request::Builder {
  let builder = Request::builder().method(method).uri(uri);
  match creds {
    Some((email, pass)) => builder.header(header::AUTHORIZATION, auth_header(email, pass)),
    None => builder,
  }
}

async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> Response {
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn read_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() }
}

async fn call(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  creds: Creds<'_>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let builder = request(method, uri, creds);
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = send(state, req).await;
  let status = resp.status();
  (status, read_json(resp).await)
}

async fn upload(
  state: &AppState<SqliteStore>,
  mime: &str,
  bytes: Vec<u8>,
) -> (StatusCode, Value) {
  let req = request("POST", "/scan", ADMIN)
    .header(header::CONTENT_TYPE, mime)
    .body(Body::from(bytes))
    .unwrap();
  let resp = send(state, req).await;
  let status = resp.status();
  (status, read_json(resp).await)
}

fn blank_png() -> Vec<u8> {
  let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 120, Luma([255])));
  let mut out = Vec::new();
  image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
  out
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_then_sign_in() {
  let state = make_state(ApiConfig::default()).await;
  let body = json!({
    "first_name": "Dario",
    "last_name": "Vance",
    "email": "dario@example.com",
    "phone_number": "555-0101",
    "password": "hunter22",
  });

  let (status, client) = call(&state, "POST", "/register", None, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert!(client["client_code"].as_str().unwrap().starts_with('C'));
  assert!(client.get("password_hash").is_none());

  let (status, _) = call(&state, "POST", "/register", None, Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(
    &state,
    "POST",
    "/login",
    None,
    Some(json!({ "email": "dario@example.com", "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, profile) = call(
    &state,
    "POST",
    "/login",
    None,
    Some(json!({ "email": "dario@example.com", "password": "hunter22" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(profile["role"], "client");
  assert_eq!(profile["name"], "Dario Vance");
  assert_eq!(profile["user_id"], client["id"]);
}

#[tokio::test]
async fn register_requires_every_field() {
  let state = make_state(ApiConfig::default()).await;
  let (status, body) = call(
    &state,
    "POST",
    "/register",
    None,
    Some(json!({ "first_name": "Dario", "email": "dario@example.com", "password": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "all fields are required");
}

#[tokio::test]
async fn staff_cannot_register_over_their_email() {
  let state = make_state(ApiConfig::default()).await;
  let (status, _) = call(
    &state,
    "POST",
    "/register",
    None,
    Some(json!({
      "first_name": "Not",
      "last_name": "Staff",
      "email": ADMIN_EMAIL.to_uppercase(),
      "phone_number": "555-0101",
      "password": "hunter22",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn me_describes_the_caller() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let (status, me) = call(&state, "GET", "/me", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["role"], "admin");
  assert_eq!(me["name"], "Front Desk");
  assert!(me.get("client").is_none());

  let (status, me) =
    call(&state, "GET", "/me", Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["role"], "client");
  assert_eq!(me["client"]["client_code"], client.client_code.as_str());
}

#[tokio::test]
async fn disabled_accounts_cannot_sign_in() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/clients/{}", client.id),
    ADMIN,
    Some(json!({ "account_active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) =
    call(&state, "GET", "/me", Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "account is disabled");
}

// ── Access control ───────────────────────────────────────────────────────────

#[tokio::test]
async fn staff_routes_reject_anonymous_and_clients() {
  let state = make_state(ApiConfig::default()).await;
  seed_client(&state, "marcus@example.com", "Reyes").await;

  let resp = send(&state, request("GET", "/clients", None).body(Body::empty()).unwrap()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let (status, _) =
    call(&state, "GET", "/clients", Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, page) = call(&state, "GET", "/clients", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn clients_see_only_themselves() {
  let state = make_state(ApiConfig::default()).await;
  let marcus = seed_client(&state, "marcus@example.com", "Reyes").await;
  let other = seed_client(&state, "other@example.com", "Okafor").await;
  let creds = Some(("marcus@example.com", CLIENT_PASS));

  let (status, body) = call(&state, "GET", &format!("/clients/{}", marcus.id), creds, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["email"], "marcus@example.com");

  let (status, _) = call(&state, "GET", &format!("/clients/{}", other.id), creds, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&state, "GET", &format!("/clients/{}/rewards", other.id), creds, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Clients ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_lifecycle() {
  let state = make_state(ApiConfig::default()).await;

  let (status, created) = call(
    &state,
    "POST",
    "/clients",
    ADMIN,
    Some(json!({
      "first_name": "Lena",
      "last_name": "Ortiz",
      "email": "lena@example.com",
      "phone_number": "555-0199",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = created["id"].as_str().unwrap().to_owned();
  let code = created["client_code"].as_str().unwrap().to_owned();

  let (status, by_code) = call(&state, "GET", &format!("/clients/{code}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(by_code["id"], id.as_str());

  let (status, updated) = call(
    &state,
    "PUT",
    &format!("/clients/{id}"),
    ADMIN,
    Some(json!({ "first_name": "Helena" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["first_name"], "Helena");
  assert_eq!(updated["last_name"], "Ortiz");

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/clients/{id}"),
    ADMIN,
    Some(json!({ "email": "not-an-email" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "DELETE", &format!("/clients/{id}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&state, "GET", &format!("/clients/{id}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_client_email_conflicts() {
  let state = make_state(ApiConfig::default()).await;
  seed_client(&state, "marcus@example.com", "Reyes").await;

  let (status, _) = call(
    &state,
    "POST",
    "/clients",
    ADMIN,
    Some(json!({ "first_name": "M", "last_name": "R", "email": "MARCUS@example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_and_lookup() {
  let state = make_state(ApiConfig::default()).await;
  let marcus = seed_client(&state, "marcus@example.com", "Reyes").await;
  seed_client(&state, "other@example.com", "Okafor").await;

  let (status, page) = call(&state, "GET", "/clients/search?q=reyes", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 1);
  assert_eq!(page["items"][0]["id"], marcus.id.as_str());

  let (status, summary) =
    call(&state, "GET", "/clients/lookup?email=marcus@example.com", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary["name"], "Marcus Reyes");
  assert_eq!(summary["client_code"], marcus.client_code.as_str());

  let (status, summary) =
    call(&state, "GET", "/clients/lookup?phone=555.010.2000", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(summary["id"].is_string());

  let (status, _) = call(&state, "GET", "/clients/lookup", ADMIN, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) =
    call(&state, "GET", "/clients/lookup?email=nobody@example.com", ADMIN, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Badges ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn badge_is_stable_until_rotated() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;
  let uri = format!("/clients/{}/qrcode", client.id);

  let (status, first) = call(&state, "GET", &uri, ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["subject_id"], client.client_code.as_str());
  assert!(first["qr_code"].as_str().unwrap().starts_with("data:image/png;base64,"));
  let payload: Value = serde_json::from_str(first["payload"].as_str().unwrap()).unwrap();
  assert_eq!(payload["type"], "barbaros-client");
  assert_eq!(payload["id"], client.client_code.as_str());

  let (_, again) =
    call(&state, "GET", &uri, Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(again["subject_id"], first["subject_id"]);

  let (status, _) =
    call(&state, "POST", &uri, Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, rotated) = call(&state, "POST", &uri, ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  let rotated_id = rotated["subject_id"].as_str().unwrap().to_owned();
  assert!(rotated_id.starts_with(&format!("{}-", client.client_code)));

  let (_, after) = call(&state, "GET", &uri, ADMIN, None).await;
  assert_eq!(after["subject_id"], rotated_id.as_str());

  // The rotated id is now an alternate key for the client.
  let (status, found) = call(&state, "GET", &format!("/clients/{rotated_id}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(found["id"], client.id.as_str());
}

#[tokio::test]
async fn badge_as_png() {
  let state = make_state(ApiConfig { badge_width: 200, ..ApiConfig::default() }).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let req = request("GET", &format!("/clients/{}/qrcode?format=png", client.id), ADMIN)
    .body(Body::empty())
    .unwrap();
  let resp = send(&state, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let image = image::load_from_memory(&bytes).unwrap();
  assert_eq!(image.width(), 200);
}

// ── Scanning ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scanning_a_badge_finds_the_client() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let req = request("GET", &format!("/clients/{}/qrcode?format=png", client.id), ADMIN)
    .body(Body::empty())
    .unwrap();
  let png = axum::body::to_bytes(send(&state, req).await.into_body(), usize::MAX)
    .await
    .unwrap()
    .to_vec();

  let (status, body) = upload(&state, "image/png", png).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["resolution"], "badge");
  assert_eq!(body["subject_id"], client.client_code.as_str());
  assert_eq!(body["client"]["id"], client.id.as_str());
}

#[tokio::test]
async fn scanning_refuses_bad_uploads() {
  let state = make_state(ApiConfig::default()).await;

  let (status, _) = upload(&state, "text/plain", b"hello".to_vec()).await;
  assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

  let (status, _) = upload(&state, "image/png", Vec::new()).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = upload(&state, "image/png", b"not really a png".to_vec()).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = upload(&state, "image/png", blank_png()).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "no QR code detected in this image");
}

#[tokio::test]
async fn scanning_enforces_the_size_limit() {
  let state = make_state(ApiConfig { max_upload_bytes: 16, ..ApiConfig::default() }).await;
  let (status, _) = upload(&state, "image/png", blank_png()).await;
  assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn scanning_an_unknown_badge_is_a_miss() {
  let state = make_state(ApiConfig::default()).await;
  let png = encode_badge("C00000000", &RenderOptions::default()).unwrap().png;

  let (status, body) = upload(&state, "image/png", png).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "scanned code does not correspond to any existing client");
}

#[tokio::test]
async fn scanning_requires_staff() {
  let state = make_state(ApiConfig::default()).await;
  seed_client(&state, "marcus@example.com", "Reyes").await;

  let req = request("POST", "/scan", Some(("marcus@example.com", CLIENT_PASS)))
    .header(header::CONTENT_TYPE, "image/png")
    .body(Body::from(blank_png()))
    .unwrap();
  assert_eq!(send(&state, req).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn decoded_text_resolves_like_an_image() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;
  let scan = |raw: String| json!({ "raw_text": raw });

  let (status, body) = call(
    &state,
    "POST",
    "/scan/text",
    ADMIN,
    Some(scan(badge_payload(&client.client_code).unwrap())),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["resolution"], "badge");
  assert_eq!(body["client"]["id"], client.id.as_str());

  let (status, body) =
    call(&state, "POST", "/scan/text", ADMIN, Some(scan(client.id.clone()))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["resolution"], "document_id");

  let (status, body) =
    call(&state, "POST", "/scan/text", ADMIN, Some(scan(client.client_code.clone()))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["resolution"], "client_code");

  let (status, body) = call(&state, "POST", "/scan/text", ADMIN, Some(scan("abcd".into()))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "not a recognized client code");

  let (status, _) = call(
    &state,
    "POST",
    "/scan/text",
    ADMIN,
    Some(scan("0123456789abcdef01234567".into())),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Visits and rewards ───────────────────────────────────────────────────────

#[tokio::test]
async fn visits_earn_and_redeem_rewards() {
  let state = make_state(ApiConfig { visits_per_reward: 2, ..ApiConfig::default() }).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;
  let visits = format!("/clients/{}/visits", client.id);
  let visit = json!({
    "barber": "Tomas",
    "services": [{ "name": "Skin fade", "price_cents": 3500, "duration_minutes": 40 }],
  });

  let (status, first) = call(&state, "POST", &visits, ADMIN, Some(visit.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["visit"]["visit_number"], 1);
  assert_eq!(first["visit"]["total_price_cents"], 3500);
  assert_eq!(first["loyalty"]["rewards_available"], 0);
  assert_eq!(first["loyalty"]["visits_until_next"], 1);

  let (_, second) = call(&state, "POST", &visits, ADMIN, Some(visit)).await;
  assert_eq!(second["client"]["visit_count"], 2);
  assert_eq!(second["loyalty"]["rewards_available"], 1);

  let rewards = format!("/clients/{}/rewards", client.id);
  let (status, loyalty) =
    call(&state, "GET", &rewards, Some(("marcus@example.com", CLIENT_PASS)), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(loyalty["rewards_earned"], 1);

  let (status, loyalty) = call(&state, "POST", &format!("{rewards}/redeem"), ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(loyalty["rewards_redeemed"], 1);
  assert_eq!(loyalty["rewards_available"], 0);

  let (status, _) = call(&state, "POST", &format!("{rewards}/redeem"), ADMIN, None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, page) = call(&state, "GET", &visits, ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 2);
  assert_eq!(page["items"][0]["visit_number"], 2);
}

#[tokio::test]
async fn deleting_a_visit_debits_the_count() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let (_, recorded) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({ "barber": "Tomas" })),
  )
  .await;
  let visit_id = recorded["visit"]["id"].as_str().unwrap().to_owned();

  let (status, _) = call(&state, "DELETE", &format!("/visits/{visit_id}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&state, "DELETE", &format!("/visits/{visit_id}"), ADMIN, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, after) = call(&state, "GET", &format!("/clients/{}", client.id), ADMIN, None).await;
  assert_eq!(after["visit_count"], 0);
}

#[tokio::test]
async fn visits_need_a_barber() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let (status, body) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({ "barber": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("barber"));

  let (status, _) = call(
    &state,
    "POST",
    "/clients/C99999999/visits",
    ADMIN,
    Some(json!({ "barber": "Tomas" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visit_totals_that_overflow_are_refused() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;
  let service = json!({ "name": "Gold leaf", "price_cents": i64::MAX, "duration_minutes": 5 });

  let (status, body) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({ "barber": "Tomas", "services": [service.clone(), service] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("services"));

  let (_, after) = call(&state, "GET", &format!("/clients/{}", client.id), ADMIN, None).await;
  assert_eq!(after["visit_count"], 0);
}

#[tokio::test]
async fn visits_can_be_corrected() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;

  let (_, recorded) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({
      "barber": "Tomas",
      "services": [{ "name": "Skin fade", "price_cents": 3500, "duration_minutes": 40 }],
    })),
  )
  .await;
  let uri = format!("/visits/{}", recorded["visit"]["id"].as_str().unwrap());

  let patch = json!({
    "services": [
      { "name": "Skin fade", "price_cents": 3500, "duration_minutes": 40 },
      { "name": "Beard trim", "price_cents": 1500, "duration_minutes": 15 },
    ],
    "notes": "added a trim at the till",
  });
  let (status, visit) = call(&state, "PUT", &uri, ADMIN, Some(patch.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(visit["total_price_cents"], 5000);
  assert_eq!(visit["visit_number"], 1);
  assert_eq!(visit["notes"], "added a trim at the till");

  let client_creds = Some(("marcus@example.com", CLIENT_PASS));
  let (status, _) = call(&state, "PUT", &uri, client_creds, Some(patch.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&state, "PUT", &uri, ADMIN, Some(json!({ "barber": "" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "PUT", "/visits/unknown", ADMIN, Some(patch)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visits_by_date_range() {
  let state = make_state(ApiConfig::default()).await;
  let marcus = seed_client(&state, "marcus@example.com", "Reyes").await;
  let dani = seed_client(&state, "dani@example.com", "Okafor").await;

  for (client, date) in [
    (&marcus, "2024-03-01T10:00:00Z"),
    (&dani, "2024-03-15T10:00:00Z"),
    (&marcus, "2024-04-02T10:00:00Z"),
  ] {
    let (status, _) = call(
      &state,
      "POST",
      &format!("/clients/{}/visits", client.id),
      ADMIN,
      Some(json!({ "barber": "Tomas", "visit_date": date })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let march = "/visits?from=2024-03-01T00:00:00Z&to=2024-03-31T23:59:59Z";
  let (status, page) = call(&state, "GET", march, ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 2);
  assert_eq!(page["items"][0]["client_id"], dani.id.as_str());
  assert_eq!(page["items"][1]["client_id"], marcus.id.as_str());

  let backwards = "/visits?from=2024-04-01T00:00:00Z&to=2024-03-01T00:00:00Z";
  let (status, _) = call(&state, "GET", backwards, ADMIN, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let open_ended = request("GET", "/visits?from=2024-03-01T00:00:00Z", ADMIN)
    .body(Body::empty())
    .unwrap();
  assert_eq!(send(&state, open_ended).await.status(), StatusCode::BAD_REQUEST);

  let client_creds = Some(("marcus@example.com", CLIENT_PASS));
  let (status, _) = call(&state, "GET", march, client_creds, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Service catalog ──────────────────────────────────────────────────────────

async fn seed_category(state: &AppState<SqliteStore>, name: &str, display_order: i32) -> String {
  let (status, category) = call(
    state,
    "POST",
    "/service-categories",
    ADMIN,
    Some(json!({
      "name": name,
      "description": format!("{name} services"),
      "display_order": display_order,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  category["id"].as_str().unwrap().to_owned()
}

async fn seed_service(state: &AppState<SqliteStore>, category_id: &str, name: &str) -> Value {
  let (status, service) = call(
    state,
    "POST",
    "/services",
    ADMIN,
    Some(json!({
      "category_id": category_id,
      "name": name,
      "description": format!("A {name}"),
      "price_cents": 2500,
      "duration_minutes": 30,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  service
}

#[tokio::test]
async fn catalog_is_managed_by_staff() {
  let state = make_state(ApiConfig::default()).await;
  seed_client(&state, "marcus@example.com", "Reyes").await;
  let client_creds = Some(("marcus@example.com", CLIENT_PASS));
  let cuts = seed_category(&state, "Cuts", 0).await;

  let (status, _) = call(
    &state,
    "POST",
    "/service-categories",
    ADMIN,
    Some(json!({ "name": "CUTS", "description": "again" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let fade = seed_service(&state, &cuts, "Skin fade").await;
  assert_eq!(fade["popularity_score"], 0);
  assert_eq!(fade["active"], true);
  let uri = format!("/services/{}", fade["id"].as_str().unwrap());

  let (status, _) = call(
    &state,
    "POST",
    "/services",
    client_creds,
    Some(json!({
      "category_id": &cuts,
      "name": "Free cut",
      "description": "d",
      "price_cents": 0,
      "duration_minutes": 30,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(
    &state,
    "POST",
    "/services",
    ADMIN,
    Some(json!({
      "category_id": "60d5ec49f1b2c8b1f8e4e1a1",
      "name": "Orphan",
      "description": "d",
      "price_cents": 100,
      "duration_minutes": 30,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, seen) = call(&state, "GET", &uri, client_creds, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(seen["name"], "Skin fade");

  let (status, updated) =
    call(&state, "PUT", &uri, ADMIN, Some(json!({ "price_cents": 3000 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["price_cents"], 3000);

  let (status, _) = call(&state, "PUT", &uri, ADMIN, Some(json!({ "price_cents": -5 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "DELETE", &uri, client_creds, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&state, "DELETE", &uri, ADMIN, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&state, "GET", &uri, ADMIN, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(&state, "GET", "/services", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recording_visits_ranks_the_catalog() {
  let state = make_state(ApiConfig::default()).await;
  let client = seed_client(&state, "marcus@example.com", "Reyes").await;
  let cuts = seed_category(&state, "Cuts", 0).await;
  let fade = seed_service(&state, &cuts, "Skin fade").await;
  seed_service(&state, &cuts, "Buzz cut").await;

  let received = json!({
    "service_id": fade["id"],
    "name": "Skin fade",
    "price_cents": 2500,
    "duration_minutes": 30,
  });
  let (status, recorded) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({ "barber": "Tomas", "services": [received] })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(recorded["visit"]["services"][0]["service_id"], fade["id"]);

  let (status, page) = call(&state, "GET", "/services", ADMIN, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 2);
  assert_eq!(page["items"][0]["name"], "Skin fade");
  assert_eq!(page["items"][0]["popularity_score"], 1);
  assert_eq!(page["items"][1]["name"], "Buzz cut");

  let unknown = json!({
    "service_id": "60d5ec49f1b2c8b1f8e4e1a1",
    "name": "Ghost",
    "price_cents": 100,
    "duration_minutes": 5,
  });
  let (status, _) = call(
    &state,
    "POST",
    &format!("/clients/{}/visits", client.id),
    ADMIN,
    Some(json!({ "barber": "Tomas", "services": [unknown] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn menu_hides_inactive_entries_from_clients() {
  let state = make_state(ApiConfig::default()).await;
  seed_client(&state, "marcus@example.com", "Reyes").await;
  let client_creds = Some(("marcus@example.com", CLIENT_PASS));

  let beard = seed_category(&state, "Beard", 2).await;
  let cuts = seed_category(&state, "Cuts", 1).await;
  seed_service(&state, &cuts, "Skin fade").await;
  let flat_top = seed_service(&state, &cuts, "Flat top").await;
  seed_service(&state, &beard, "Hot shave").await;

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/services/{}", flat_top["id"].as_str().unwrap()),
    ADMIN,
    Some(json!({ "active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, categories) = call(&state, "GET", "/service-categories", client_creds, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(categories[0]["name"], "Cuts");
  assert_eq!(categories[1]["name"], "Beard");

  let menu = format!("/service-categories/{cuts}/services");
  let (status, listed) = call(&state, "GET", &menu, client_creds, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed.as_array().unwrap().len(), 1);
  assert_eq!(listed[0]["name"], "Skin fade");

  let (_, listed) = call(&state, "GET", &format!("{menu}?all=true"), client_creds, None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let (_, listed) = call(&state, "GET", &format!("{menu}?all=true"), ADMIN, None).await;
  assert_eq!(listed.as_array().unwrap().len(), 2);
}
