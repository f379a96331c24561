//! Portal API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! 1. Auth validator → 2. Audit logger

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{self, health_info, Validate};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;
use crate::db::PatientRecord;
use crate::models::{Allergy, CognitiveSymptom, Diagnosis, EmergencyContact, Medication};

/// Build the portal API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

/// The four routes of one clinical record kind.
fn record_routes<R>() -> Router<ApiContext>
where
    R: PatientRecord + Serialize + Send + 'static,
    R::New: DeserializeOwned + Validate + Send + 'static,
    R::Update: DeserializeOwned + Send + 'static,
{
    Router::new()
        .route("/add", post(health_info::add::<R>))
        .route("/set", post(health_info::set_one::<R>))
        .route("/set-all", post(health_info::set_all::<R>))
        .route("/get", get(health_info::list::<R>))
}

fn cors_layer(public_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    match HeaderValue::from_str(public_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(public_url, "Public URL is not a valid origin; CORS disabled");
            cors
        }
    }
}

fn build_router(ctx: ApiContext) -> Router {
    use endpoints::{
        appointments, billing, doctors, invoices, management, messages, patients, roles,
    };

    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Auth → Audit (innermost) → Handler
    //
    // Extension must be outermost so all middleware can access ApiContext.
    let protected = Router::new()
        .route("/db/management/user-role/add", post(roles::add))
        .route("/db/management/user-role/get", get(roles::get))
        .route("/db/management/user-role/has", get(roles::has))
        .route("/db/patient/add", post(patients::add))
        .route("/db/patient/set", post(patients::set))
        .route("/db/patient/get", get(patients::get))
        .route("/db/doctor/add", post(doctors::add))
        .route("/db/doctor/set", post(doctors::set))
        .route("/db/doctor/get", get(doctors::get))
        .route("/db/doctor/all", get(doctors::all))
        .route("/db/doctor/credentials/add", post(doctors::add_credentials))
        .route("/db/doctor/credentials/set", post(doctors::set_credentials))
        .route("/db/doctor/credentials/get", get(doctors::get_credentials))
        .route(
            "/db/management/patient-doctor-management/add",
            post(management::add),
        )
        .route(
            "/db/management/patient-doctor-management/get",
            get(management::get),
        )
        .route(
            "/db/management/patient-doctor-management/doctors",
            get(management::doctors),
        )
        .route(
            "/db/management/patient-doctor-management/patients",
            get(management::patients),
        )
        .route("/db/management/appointments/add", post(appointments::add))
        .route("/db/management/appointments/get", get(appointments::get))
        .route(
            "/db/management/appointments/cancel",
            post(appointments::cancel),
        )
        .nest(
            "/db/patient/health-info/allergies",
            record_routes::<Allergy>(),
        )
        .nest(
            "/db/patient/health-info/cognitive-symptoms",
            record_routes::<CognitiveSymptom>(),
        )
        .nest(
            "/db/patient/health-info/diagnoses",
            record_routes::<Diagnosis>(),
        )
        .nest(
            "/db/patient/health-info/emergency-contacts",
            record_routes::<EmergencyContact>(),
        )
        .nest(
            "/db/patient/health-info/medications",
            record_routes::<Medication>(),
        )
        .route("/db/patient/health-info/get", get(health_info::aggregate))
        .route(
            "/db/messages/conversations/add",
            post(messages::open_conversation),
        )
        .route(
            "/db/messages/conversations/get",
            get(messages::conversations),
        )
        .route("/db/messages/send", post(messages::send))
        .route("/db/messages/get", get(messages::list))
        .route("/db/invoices/add", post(invoices::add))
        .route("/db/invoices/get", get(invoices::get))
        .route("/db/invoices/set-status", post(invoices::set_status))
        .route(
            "/stripe/create-checkout-session",
            post(billing::create_checkout_session),
        )
        .route(
            "/stripe/create-portal-session",
            post(billing::create_portal_session),
        )
        .route("/check-session", post(billing::check_session))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone());

    Router::new()
        .nest("/api", protected.merge(public))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors_layer(&ctx.core.config.public_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::billing::{Billing, MockPaymentProcessor};
    use crate::config::AppConfig;
    use crate::db::{self, DbPool};
    use crate::identity;
    use crate::models::NewUser;

    fn test_core_state(billing: Option<Billing>) -> Arc<CoreState> {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        Arc::new(CoreState::new(DbPool::in_memory().unwrap(), config, billing))
    }

    fn mock_billing() -> Billing {
        Billing {
            processor: Arc::new(MockPaymentProcessor::new("cus_test_9")),
            price_id: "price_basic".into(),
        }
    }

    /// Open a session for `email` and return its bearer token.
    fn login(core: &CoreState, email: &str) -> String {
        let conn = core.open_db().unwrap();
        identity::issue_session(
            &conn,
            &NewUser {
                email: email.into(),
                name: None,
                image: None,
            },
            Duration::hours(1),
        )
        .unwrap()
        .token
    }

    fn user_id(core: &CoreState, email: &str) -> String {
        let conn = core.open_db().unwrap();
        db::get_user_by_email(&conn, email).unwrap().unwrap().id
    }

    fn make_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(make_request(method, uri, token, body))
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn patient_body(email: &str) -> Value {
        json!({
            "first_name": "Ada",
            "last_name": "Moreau",
            "date_of_birth": "1948-03-02",
            "age": 76,
            "gender": "female",
            "primary_language": "English",
            "phone_number": "555-0100",
            "email": email,
            "street_address": "1 Elm St",
            "city": "Springfield",
            "state": "IL",
            "zip_code": "62701",
            "hipaa_compliance": true
        })
    }

    /// Log in, pick the patient role and fill in the intake form.
    async fn onboard_patient(app: &Router, core: &CoreState, email: &str) -> String {
        let token = login(core, email);
        let (status, _) = call(
            app,
            "POST",
            "/api/db/management/user-role/add",
            Some(&token),
            Some(json!({"role": "patient"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) =
            call(app, "POST", "/api/db/patient/add", Some(&token), Some(patient_body(email))).await;
        assert_eq!(status, StatusCode::CREATED);
        token
    }

    async fn onboard_doctor(app: &Router, core: &CoreState, email: &str) -> String {
        let token = login(core, email);
        call(
            app,
            "POST",
            "/api/db/management/user-role/add",
            Some(&token),
            Some(json!({"role": "doctor"})),
        )
        .await;
        let (status, _) = call(
            app,
            "POST",
            "/api/db/doctor/add",
            Some(&token),
            Some(json!({
                "first_name": "Sam",
                "last_name": "House",
                "email": email,
                "location": "Springfield Clinic",
                "specialization": "Neurology"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        token
    }

    async fn link(app: &Router, patient_token: &str, doctor_id: &str) {
        let (status, _) = call(
            app,
            "POST",
            "/api/db/management/patient-doctor-management/add",
            Some(patient_token),
            Some(json!({"doctor_id": doctor_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn health_is_public_and_uncached() {
        let app = portal_router(test_core_state(None));
        let response = app
            .oneshot(make_request("GET", "/api/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn protected_route_requires_session() {
        let app = portal_router(test_core_state(None));

        let (status, json) = call(&app, "GET", "/api/db/patient/get", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");

        let (status, _) =
            call(&app, "GET", "/api/db/patient/get", Some("invalid-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_is_chosen_once() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = login(&core, "ada@example.com");

        let (status, json) =
            call(&app, "GET", "/api/db/management/user-role/has", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], false);

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/management/user-role/add",
            Some(&token),
            Some(json!({"role": "patient"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["created"], true);

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/management/user-role/add",
            Some(&token),
            Some(json!({"role": "doctor"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["created"], false);
        assert_eq!(json["response"], Value::Null);

        let (_, json) =
            call(&app, "GET", "/api/db/management/user-role/get", Some(&token), None).await;
        assert_eq!(json["response"]["role"], "patient");
    }

    #[tokio::test]
    async fn malformed_body_is_uniform_bad_request() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = login(&core, "ada@example.com");

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/management/user-role/add",
            Some(&token),
            Some(json!({"role": "nurse"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn patient_profile_round_trip() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/patient/set",
            Some(&token),
            Some(json!({"city": "Chicago"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["city"], "Chicago");

        let (_, json) = call(&app, "GET", "/api/db/patient/get", Some(&token), None).await;
        assert_eq!(json["response"]["first_name"], "Ada");
        assert_eq!(json["response"]["gender"], "female");
    }

    #[tokio::test]
    async fn doctor_cannot_file_patient_intake() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_doctor(&app, &core, "house@example.com").await;

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/patient/add",
            Some(&token),
            Some(patient_body("house@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn credentials_must_match_doctor_specialization() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_doctor(&app, &core, "house@example.com").await;
        let mut credentials = json!({
            "degree": "MD",
            "medical_school": "Johns Hopkins",
            "residency": "Mayo Clinic",
            "approach": "Collaborative",
            "specialization": "Cardiology"
        });

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/doctor/credentials/add",
            Some(&token),
            Some(credentials.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        credentials["specialization"] = json!("Neurology");
        let (status, _) = call(
            &app,
            "POST",
            "/api/db/doctor/credentials/add",
            Some(&token),
            Some(credentials),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, json) = call(&app, "GET", "/api/db/doctor/all", Some(&token), None).await;
        assert_eq!(json["response"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn allergy_records_add_set_and_bulk_set() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;
        let base = "/api/db/patient/health-info/allergies";

        let (status, json) = call(
            &app,
            "POST",
            &format!("{base}/add"),
            Some(&token),
            Some(json!({"allergen": "Peanuts"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let peanuts = json["response"]["id"].as_str().unwrap().to_string();
        call(
            &app,
            "POST",
            &format!("{base}/add"),
            Some(&token),
            Some(json!({"allergen": "Penicillin"})),
        )
        .await;

        let (status, json) = call(
            &app,
            "POST",
            &format!("{base}/set"),
            Some(&token),
            Some(json!({"id": peanuts, "reaction_description": "Anaphylaxis"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["allergen"], "Peanuts");
        assert_eq!(json["response"]["reaction_description"], "Anaphylaxis");

        let (status, _) = call(
            &app,
            "POST",
            &format!("{base}/set"),
            Some(&token),
            Some(json!({"id": uuid::Uuid::new_v4(), "allergen": "Latex"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            "POST",
            &format!("{base}/set-all"),
            Some(&token),
            Some(json!({"severity_level": "severe"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"].as_array().unwrap().len(), 2);

        let (_, json) = call(&app, "GET", &format!("{base}/get"), Some(&token), None).await;
        let rows = json["response"].as_array().unwrap();
        assert!(rows.iter().all(|r| r["severity_level"] == "severe"));
    }

    #[tokio::test]
    async fn blank_record_field_rejected() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/patient/health-info/medications/add",
            Some(&token),
            Some(json!({"medication_name": " ", "dosage": "5mg", "frequency": "daily"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_patient_aggregate_has_five_empty_lists() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, json) = call(
            &app,
            "GET",
            "/api/db/patient/health-info/get",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        for kind in [
            "allergies",
            "cognitive_symptoms",
            "diagnoses",
            "emergency_contacts",
            "medications",
        ] {
            assert_eq!(json["response"][kind], json!([]), "{kind}");
        }
    }

    #[tokio::test]
    async fn doctor_reads_only_managed_patients() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let patient_id = user_id(&core, "ada@example.com");
        let doctor_id = user_id(&core, "house@example.com");
        let uri = format!("/api/db/patient/health-info/get?patient_id={patient_id}");

        let (status, _) = call(&app, "GET", &uri, Some(&doctor_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        link(&app, &patient_token, &doctor_id).await;
        let (status, _) = call(&app, "GET", &uri, Some(&doctor_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn management_visible_from_both_sides() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let doctor_id = user_id(&core, "house@example.com");
        link(&app, &patient_token, &doctor_id).await;

        let (_, json) = call(
            &app,
            "GET",
            "/api/db/management/patient-doctor-management/get",
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(json["response"][0]["doctor_id"], doctor_id.as_str());
        assert_eq!(json["response"][0]["status"], "ongoing");

        let (_, json) = call(
            &app,
            "GET",
            "/api/db/management/patient-doctor-management/patients",
            Some(&doctor_token),
            None,
        )
        .await;
        assert_eq!(json["response"][0]["patient"]["first_name"], "Ada");

        let (status, _) = call(
            &app,
            "GET",
            "/api/db/management/patient-doctor-management/patients",
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn meeting_cancel_is_idempotent_and_party_only() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let stranger_token = onboard_patient(&app, &core, "eve@example.com").await;
        let patient_id = user_id(&core, "ada@example.com");
        let doctor_id = user_id(&core, "house@example.com");
        link(&app, &patient_token, &doctor_id).await;

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/management/appointments/add",
            Some(&doctor_token),
            Some(json!({
                "patient_id": patient_id,
                "doctor_id": doctor_id,
                "scheduled_at": "2030-05-01T14:30:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let meeting_id = json["response"]["id"].clone();

        let cancel = json!({"meeting_id": meeting_id});
        let (status, _) = call(
            &app,
            "POST",
            "/api/db/management/appointments/cancel",
            Some(&stranger_token),
            Some(cancel.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        for _ in 0..2 {
            let (status, json) = call(
                &app,
                "POST",
                "/api/db/management/appointments/cancel",
                Some(&patient_token),
                Some(cancel.clone()),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["response"]["status"], "canceled");
        }

        let (_, json) = call(
            &app,
            "GET",
            "/api/db/management/appointments/get",
            Some(&doctor_token),
            None,
        )
        .await;
        assert_eq!(json["response"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn meeting_requires_linked_pair() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        onboard_doctor(&app, &core, "house@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/management/appointments/add",
            Some(&patient_token),
            Some(json!({
                "patient_id": user_id(&core, "ada@example.com"),
                "doctor_id": user_id(&core, "house@example.com"),
                "scheduled_at": "2030-05-01T14:30:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn patient_cannot_read_another_patients_records() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        onboard_patient(&app, &core, "ada@example.com").await;
        let eve_token = onboard_patient(&app, &core, "eve@example.com").await;
        let ada_id = user_id(&core, "ada@example.com");

        let uri = format!("/api/db/patient/health-info/get?patient_id={ada_id}");
        let (status, json) = call(&app, "GET", &uri, Some(&eve_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn doctor_cannot_book_for_another_doctor() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        onboard_doctor(&app, &core, "house@example.com").await;
        let wilson_token = onboard_doctor(&app, &core, "wilson@example.com").await;
        let house_id = user_id(&core, "house@example.com");
        link(&app, &patient_token, &house_id).await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/management/appointments/add",
            Some(&wilson_token),
            Some(json!({
                "patient_id": user_id(&core, "ada@example.com"),
                "doctor_id": house_id,
                "scheduled_at": "2030-05-01T14:30:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, json) = call(
            &app,
            "GET",
            "/api/db/management/appointments/get",
            Some(&patient_token),
            None,
        )
        .await;
        assert_eq!(json["response"], json!([]));
    }

    #[tokio::test]
    async fn messaging_between_linked_parties() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let stranger_token = onboard_patient(&app, &core, "eve@example.com").await;
        let doctor_id = user_id(&core, "house@example.com");
        link(&app, &patient_token, &doctor_id).await;

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/messages/conversations/add",
            Some(&patient_token),
            Some(json!({"counterpart_id": doctor_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let conversation_id = json["response"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/messages/send",
            Some(&doctor_token),
            Some(json!({"conversation_id": conversation_id, "body": "How are you feeling?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/messages/send",
            Some(&patient_token),
            Some(json!({"conversation_id": conversation_id, "body": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/db/messages/get?conversation_id={conversation_id}");
        let (_, json) = call(&app, "GET", &uri, Some(&patient_token), None).await;
        assert_eq!(json["response"][0]["body"], "How are you feeling?");

        let (status, _) = call(&app, "GET", &uri, Some(&stranger_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn billing_disabled_returns_503() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, json) = call(
            &app,
            "POST",
            "/api/stripe/create-checkout-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "BILLING_DISABLED");
    }

    #[tokio::test]
    async fn checkout_then_portal() {
        let core = test_core_state(Some(mock_billing()));
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/stripe/create-portal-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = call(
            &app,
            "POST",
            "/api/stripe/create-checkout-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["id"], "cs_test_1");

        let (status, json) = call(
            &app,
            "POST",
            "/api/check-session",
            Some(&token),
            Some(json!({"session_id": "cs_test_1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["status"], "complete");
        assert_eq!(json["response"]["customer_email"], "ada@example.com");

        let (_, json) = call(&app, "GET", "/api/db/patient/get", Some(&token), None).await;
        assert_eq!(json["response"]["billing_customer_id"], "cus_test_9");

        let (status, json) = call(
            &app,
            "POST",
            "/api/stripe/create-portal-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["response"]["url"].as_str().unwrap().contains("cus_test_9"));
    }

    #[tokio::test]
    async fn unknown_checkout_is_bad_gateway() {
        let core = test_core_state(Some(mock_billing()));
        let app = portal_router(core.clone());
        let token = onboard_patient(&app, &core, "ada@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/check-session",
            Some(&token),
            Some(json!({"session_id": "cs_missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn foreign_checkout_session_is_rejected() {
        let core = test_core_state(Some(mock_billing()));
        let app = portal_router(core.clone());
        let ada_token = onboard_patient(&app, &core, "ada@example.com").await;
        let mallory_token = onboard_patient(&app, &core, "mallory@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/stripe/create-checkout-session",
            Some(&ada_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            "POST",
            "/api/check-session",
            Some(&mallory_token),
            Some(json!({"session_id": "cs_test_1"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, json) = call(&app, "GET", "/api/db/patient/get", Some(&mallory_token), None).await;
        assert!(json["response"]["billing_customer_id"].is_null());
        let (status, _) = call(
            &app,
            "POST",
            "/api/stripe/create-portal-session",
            Some(&mallory_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn doctor_checkout_then_portal() {
        let core = test_core_state(Some(mock_billing()));
        let app = portal_router(core.clone());
        let token = onboard_doctor(&app, &core, "house@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/stripe/create-checkout-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(
            &app,
            "POST",
            "/api/check-session",
            Some(&token),
            Some(json!({"session_id": "cs_test_1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["customer_email"], "house@example.com");

        let (_, json) = call(&app, "GET", "/api/db/doctor/get", Some(&token), None).await;
        assert_eq!(json["response"]["billing_customer_id"], "cus_test_9");

        let (status, json) = call(
            &app,
            "POST",
            "/api/stripe/create-portal-session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["response"]["url"].as_str().unwrap().contains("cus_test_9"));
    }

    #[tokio::test]
    async fn billing_ids_hidden_from_other_users() {
        let core = test_core_state(Some(mock_billing()));
        let app = portal_router(core.clone());
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_id = user_id(&core, "house@example.com");
        {
            let conn = core.open_db().unwrap();
            db::set_doctor_billing_customer(&conn, &doctor_id, "cus_doc").unwrap();
        }

        let (_, json) = call(&app, "GET", "/api/db/doctor/all", Some(&patient_token), None).await;
        assert_eq!(json["response"][0]["doctor_id"], doctor_id.as_str());
        assert!(json["response"][0]["billing_customer_id"].is_null());

        let uri = format!("/api/db/doctor/get?doctor_id={doctor_id}");
        let (_, json) = call(&app, "GET", &uri, Some(&patient_token), None).await;
        assert!(json["response"]["billing_customer_id"].is_null());

        let (_, json) = call(&app, "GET", "/api/db/doctor/get", Some(&doctor_token), None).await;
        assert_eq!(json["response"]["billing_customer_id"], "cus_doc");
    }

    #[tokio::test]
    async fn doctor_invoices_managed_patient() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let patient_token = onboard_patient(&app, &core, "ada@example.com").await;
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let other_token = onboard_doctor(&app, &core, "wilson@example.com").await;
        let patient_id = user_id(&core, "ada@example.com");
        let invoice = json!({
            "patient_id": patient_id,
            "description": "Memory assessment",
            "amount_cents": 18_000,
            "due_date": "2030-07-01"
        });

        let (status, _) = call(
            &app,
            "POST",
            "/api/db/invoices/add",
            Some(&doctor_token),
            Some(invoice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        link(&app, &patient_token, &user_id(&core, "house@example.com")).await;
        let (status, _) = call(
            &app,
            "POST",
            "/api/db/invoices/add",
            Some(&patient_token),
            Some(invoice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/invoices/add",
            Some(&doctor_token),
            Some(invoice),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["response"]["status"], "open");
        assert_eq!(json["response"]["currency"], "usd");
        let invoice_id = json["response"]["id"].as_str().unwrap().to_string();

        let (_, json) = call(&app, "GET", "/api/db/invoices/get", Some(&patient_token), None).await;
        assert_eq!(json["response"][0]["id"], invoice_id.as_str());
        assert_eq!(json["response"][0]["amount_cents"], 18_000);

        let set_paid = json!({"invoice_id": invoice_id, "status": "paid"});
        let (status, _) = call(
            &app,
            "POST",
            "/api/db/invoices/set-status",
            Some(&other_token),
            Some(set_paid.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            "POST",
            "/api/db/invoices/set-status",
            Some(&doctor_token),
            Some(set_paid),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"]["status"], "paid");
    }

    #[tokio::test]
    async fn zero_amount_invoice_rejected() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let doctor_token = onboard_doctor(&app, &core, "house@example.com").await;
        let (status, json) = call(
            &app,
            "POST",
            "/api/db/invoices/add",
            Some(&doctor_token),
            Some(json!({"patient_id": "p", "description": "Visit", "amount_cents": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn requests_are_audited() {
        let core = test_core_state(None);
        let app = portal_router(core.clone());
        let token = login(&core, "ada@example.com");
        call(&app, "GET", "/api/db/management/user-role/has", Some(&token), None).await;

        let conn = core.open_db().unwrap();
        let id = db::get_user_by_email(&conn, "ada@example.com").unwrap().unwrap().id;
        assert_eq!(db::count_access_entries(&conn, &id).unwrap(), 1);
    }
}
