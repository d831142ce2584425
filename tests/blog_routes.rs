use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use blogicum::{router, AppState, Database, Services, Settings};

const PASSWORD: &str = "long-enough-secret";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";
const BOUNDARY: &str = "blogicum-boundary";

struct TestApp {
    _dir: TempDir,
    app: Router,
    services: Services,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings {
            database_path: dir.path().join("blog.db"),
            posts_per_page: 2,
            static_dir: dir.path().join("static"),
            media_dir: dir.path().join("media"),
            ..Settings::default()
        };
        let database = Database::new(&settings.database_path).expect("open database");
        let services = Services::new(&database, &settings).expect("services");
        let app = router(AppState::new(services.clone()), &settings);
        Self {
            _dir: dir,
            app,
            services,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.expect("router is infallible")
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request")).await
    }

    async fn post_multipart(&self, uri: &str, cookie: &str, body: Vec<u8>) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(COOKIE, cookie)
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    /// Creates `username` and returns the `sessionid=...` pair of a fresh login
    async fn login_as(&self, username: &str) -> String {
        self.services
            .auth
            .create_user(username, PASSWORD)
            .expect("create user");
        let response = self
            .post_form(
                "/auth/login/",
                None,
                &format!("username={}&password={}", username, PASSWORD),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("session cookie");
        cookie.split(';').next().unwrap_or_default().to_string()
    }

    fn category(&self, slug: &str, published: bool) -> i64 {
        self.services
            .catalog
            .create_category(&format!("About {}", slug), slug, "", published)
            .expect("create category")
            .0
    }

    /// Creates a published post through the form and returns its id
    async fn create_post(&self, cookie: &str, username: &str, title: &str, category: i64) -> i64 {
        let response = self
            .post_form(
                "/posts/create/",
                Some(cookie),
                &format!(
                    "title={}&text=Body&pub_date=2024-01-01T00%3A00&category={}&is_published=on",
                    title, category
                ),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), format!("/profile/{}/", username));

        let profile = json(self.get(&format!("/profile/{}/", username), Some(cookie)).await).await;
        profile["page_obj"]["items"][0]["id"].as_i64().expect("post id")
    }
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Multipart body with text fields and an optional `image` file part
fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"trip.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

async fn json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn index_starts_empty() {
    let app = TestApp::new();

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["page_obj"]["count"], 0);
    assert_eq!(body["page_obj"]["num_pages"], 1);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = TestApp::new();

    assert_eq!(app.get("/posts/42/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/posts/abc/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/profile/ghost/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/category/none/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/no/such/page/", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_users_are_sent_to_login() {
    let app = TestApp::new();

    let response = app.get("/posts/create/", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/?next=%2Fposts%2Fcreate%2F");

    let response = app.post_form("/posts/1/comment/", None, "text=hi").await;
    assert_eq!(location(&response), "/auth/login/?next=%2Fposts%2F1%2Fcomment%2F");

    let response = app.get("/posts/7/edit/?from=profile", None).await;
    assert_eq!(
        location(&response),
        "/auth/login/?next=%2Fposts%2F7%2Fedit%2F%3Ffrom%3Dprofile"
    );
}

#[tokio::test]
async fn registration_validates_and_redirects_to_login() {
    let app = TestApp::new();

    let response = app
        .post_form("/auth/registration/", None, "username=leo&password1=short&password2=short")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(response).await;
    assert!(body["errors"]["password1"].is_array());

    let form = format!("username=leo&password1={0}&password2={0}", PASSWORD);
    let response = app.post_form("/auth/registration/", None, &form).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/");

    let response = app.post_form("/auth/registration/", None, &form).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_rejects_bad_password_and_follows_next() {
    let app = TestApp::new();
    app.services.auth.create_user("leo", PASSWORD).expect("create user");

    let response = app
        .post_form("/auth/login/", None, "username=leo&password=wrong-password")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &format!("username=leo&password={}&next=%2Fposts%2Fcreate%2F", PASSWORD),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/posts/create/");
}

#[tokio::test]
async fn author_publishes_and_edits_post() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;
    let travel = app.category("travel", true);

    let form = json(app.get("/posts/create/", Some(&cookie)).await).await;
    assert_eq!(form["choices"]["categories"].as_array().map(Vec::len), Some(1));

    let id = app.create_post(&cookie, "leo", "Trip", travel).await;

    let detail = json(app.get(&format!("/posts/{}/", id), None).await).await;
    assert_eq!(detail["post"]["title"], "Trip");
    assert_eq!(detail["post"]["author"]["username"], "leo");

    let index = json(app.get("/", None).await).await;
    assert_eq!(index["page_obj"]["count"], 1);
    let category = json(app.get("/category/travel/", None).await).await;
    assert_eq!(category["page_obj"]["items"][0]["id"], id);

    let response = app
        .post_form(
            &format!("/posts/{}/edit/", id),
            Some(&cookie),
            &format!("title=Trip+again&text=Body&pub_date=2024-01-01T00%3A00&category={}", travel),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", id));

    // Unpublished now: hidden from others, still readable by the author
    assert_eq!(app.get(&format!("/posts/{}/", id), None).await.status(), StatusCode::NOT_FOUND);
    let detail = json(app.get(&format!("/posts/{}/", id), Some(&cookie)).await).await;
    assert_eq!(detail["post"]["title"], "Trip again");
}

#[tokio::test]
async fn invalid_post_form_is_rejected() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;

    let response = app
        .post_form("/posts/create/", Some(&cookie), "title=&text=&pub_date=yesterday&category=99")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(response).await;
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["pub_date"].is_array());
}

#[tokio::test]
async fn other_users_cannot_change_post() {
    let app = TestApp::new();
    let author = app.login_as("leo").await;
    let intruder = app.login_as("anna").await;
    let travel = app.category("travel", true);
    let id = app.create_post(&author, "leo", "Trip", travel).await;
    let detail_path = format!("/posts/{}/", id);

    let response = app.get(&format!("/posts/{}/edit/", id), Some(&intruder)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), detail_path);

    let edit = json(app.get(&format!("/posts/{}/edit/", id), Some(&author)).await).await;
    assert_eq!(edit["is_edit"], true);
    assert_eq!(edit["form"]["title"], "Trip");

    let confirm = json(app.get(&format!("/posts/{}/delete/", id), Some(&author)).await).await;
    assert_eq!(confirm["post"]["id"], id);
    assert_eq!(confirm["form"]["title"], "Trip");
    assert!(confirm.get("is_edit").is_none());

    let response = app
        .post_form(&format!("/posts/{}/delete/", id), Some(&intruder), "")
        .await;
    assert_eq!(location(&response), detail_path);
    assert_eq!(app.get(&detail_path, None).await.status(), StatusCode::OK);

    let response = app
        .post_form(&format!("/posts/{}/delete/", id), Some(&author), "")
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert_eq!(app.get(&detail_path, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_lifecycle() {
    let app = TestApp::new();
    let author = app.login_as("leo").await;
    let reader = app.login_as("anna").await;
    let travel = app.category("travel", true);
    let id = app.create_post(&author, "leo", "Trip", travel).await;
    let detail_path = format!("/posts/{}/", id);

    let response = app
        .post_form(&format!("/posts/{}/comment/", id), Some(&reader), "text=Nice+trip")
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), detail_path);

    let detail = json(app.get(&detail_path, None).await).await;
    assert_eq!(detail["post"]["comment_count"], 1);
    assert_eq!(detail["comments"][0]["text"], "Nice trip");
    let comment = detail["comments"][0]["id"].as_i64().expect("comment id");

    let edit_path = format!("/posts/{}/edit_comment/{}/", id, comment);
    let response = app.post_form(&edit_path, Some(&author), "text=Hijacked").await;
    assert_eq!(location(&response), detail_path);

    let wrong_post = format!("/posts/{}/edit_comment/{}/", id + 100, comment);
    assert_eq!(app.get(&wrong_post, Some(&reader)).await.status(), StatusCode::NOT_FOUND);

    let form = json(app.get(&edit_path, Some(&reader)).await).await;
    assert_eq!(form["form"]["text"], "Nice trip");
    app.post_form(&edit_path, Some(&reader), "text=Great+trip").await;
    let detail = json(app.get(&detail_path, None).await).await;
    assert_eq!(detail["comments"][0]["text"], "Great trip");

    let delete_path = format!("/posts/{}/delete_comment/{}/", id, comment);
    let confirm = json(app.get(&delete_path, Some(&reader)).await).await;
    assert_eq!(confirm["comment"]["id"], comment);
    assert_eq!(confirm["comment"]["text"], "Great trip");
    let response = app.get(&delete_path, Some(&author)).await;
    assert_eq!(location(&response), detail_path);

    let response = app.post_form(&delete_path, Some(&reader), "").await;
    assert_eq!(location(&response), detail_path);
    let detail = json(app.get(&detail_path, None).await).await;
    assert_eq!(detail["post"]["comment_count"], 0);
}

#[tokio::test]
async fn hidden_category_hides_its_posts() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;
    let secret = app.category("secret", false);
    let id = app.create_post(&cookie, "leo", "Hidden", secret).await;

    assert_eq!(app.get("/category/secret/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get(&format!("/posts/{}/", id), None).await.status(), StatusCode::NOT_FOUND);

    let public = json(app.get("/profile/leo/", None).await).await;
    assert_eq!(public["page_obj"]["count"], 0);
    let own = json(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert_eq!(own["page_obj"]["count"], 1);
}

#[tokio::test]
async fn listings_are_paginated() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;
    let travel = app.category("travel", true);
    for title in ["one", "two", "three"] {
        app.create_post(&cookie, "leo", title, travel).await;
    }

    let last = json(app.get("/?page=2", None).await).await;
    assert_eq!(last["page_obj"]["num_pages"], 2);
    assert_eq!(last["page_obj"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(last["page_obj"]["has_previous"], true);

    let clamped = json(app.get("/?page=99", None).await).await;
    assert_eq!(clamped["page_obj"]["number"], 2);
    let first = json(app.get("/?page=first", None).await).await;
    assert_eq!(first["page_obj"]["number"], 1);
}

#[tokio::test]
async fn profile_edit_and_logout() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;

    let form = json(app.get("/profile/edit/", Some(&cookie)).await).await;
    assert_eq!(form["form"]["username"], "leo");

    let response = app
        .post_form(
            "/profile/edit/",
            Some(&cookie),
            "username=leo&first_name=Leo&last_name=Tolstoy&email=leo%40example.com",
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");
    let profile = json(app.get("/profile/leo/", None).await).await;
    assert_eq!(profile["profile"]["first_name"], "Leo");
    assert!(profile["profile"].get("email").is_none());
    let own = json(app.get("/profile/leo/", Some(&cookie)).await).await;
    assert_eq!(own["profile"]["email"], "leo@example.com");

    let response = app.post_form("/auth/logout/", Some(&cookie), "").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cleared.contains("Max-Age=0"));

    let response = app.get("/profile/edit/", Some(&cookie)).await;
    assert_eq!(location(&response), "/auth/login/?next=%2Fprofile%2Fedit%2F");
}

#[tokio::test]
async fn bearer_token_authenticates() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;
    let token = cookie.trim_start_matches("sessionid=");

    let request = Request::builder()
        .uri("/profile/edit/")
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["form"]["username"], "leo");

    let request = Request::builder()
        .uri("/profile/edit/")
        .header(AUTHORIZATION, "Bearer not-a-session")
        .body(Body::empty())
        .expect("request");
    assert_eq!(app.send(request).await.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn post_image_upload_is_served() {
    let app = TestApp::new();
    let cookie = app.login_as("leo").await;
    let travel = app.category("travel", true).to_string();
    let fields = [
        ("title", "Photos"),
        ("text", "Body"),
        ("pub_date", "2024-01-01T00:00"),
        ("category", travel.as_str()),
        ("is_published", "on"),
    ];

    let response = app
        .post_multipart("/posts/create/", &cookie, multipart_body(&fields, Some(b"plain text")))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json(response).await["errors"]["image"].is_array());

    let response = app
        .post_multipart("/posts/create/", &cookie, multipart_body(&fields, Some(PNG)))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");

    let profile = json(app.get("/profile/leo/", None).await).await;
    let post = &profile["page_obj"]["items"][0];
    let id = post["id"].as_i64().expect("post id");
    let url = post["image"].as_str().expect("image url").to_string();
    assert!(url.starts_with("/media/posts_images/"));
    assert!(url.ends_with(".png"));

    let response = app.get(&url, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(bytes(response).await, PNG);

    // An edit without a file keeps the image, the clear checkbox drops it
    let response = app
        .post_multipart(&format!("/posts/{}/edit/", id), &cookie, multipart_body(&fields, None))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let detail = json(app.get(&format!("/posts/{}/", id), None).await).await;
    assert_eq!(detail["post"]["image"], url.as_str());

    let mut clearing = fields.to_vec();
    clearing.push(("image-clear", "on"));
    app.post_multipart(&format!("/posts/{}/edit/", id), &cookie, multipart_body(&clearing, None))
        .await;
    let detail = json(app.get(&format!("/posts/{}/", id), None).await).await;
    assert!(detail["post"]["image"].is_null());
    assert_eq!(app.get(&url, None).await.status(), StatusCode::NOT_FOUND);
}
