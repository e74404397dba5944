// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile, channel page and watch history route tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use vidtube_accounts::models::Video;
use vidtube_accounts::time_utils::now_rfc3339;

mod common;

use common::{body_json, json_request, register_and_login, TestSession};

fn authed(mut request: Request<Body>, session: &TestSession) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", session.access_token).parse().unwrap(),
    );
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn video(id: &str, owner_id: &str) -> Video {
    Video {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        title: format!("Video {id}"),
        description: "a clip".to_string(),
        video_file: format!("https://cdn.example.com/{id}.mp4"),
        thumbnail: format!("https://cdn.example.com/{id}.jpg"),
        duration: 42.0,
        views: 7,
        is_published: true,
        created_at: now_rfc3339(),
    }
}

#[tokio::test]
async fn test_update_account_details() {
    let (app, _, _) = common::create_test_app();
    let alice = register_and_login(&app, "alice").await;
    register_and_login(&app, "bob").await;

    let response = app
        .clone()
        .oneshot(authed(
            json_request(
                "PATCH",
                "/api/v1/users/update-account",
                json!({ "fullName": "Alice Liddell", "email": "Alice@Wonder.Land" }),
            ),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["fullName"], "Alice Liddell");
    assert_eq!(body["data"]["email"], "alice@wonder.land");

    let response = app
        .clone()
        .oneshot(authed(
            json_request(
                "PATCH",
                "/api/v1/users/update-account",
                json!({ "fullName": "Alice", "email": "bob@example.com" }),
            ),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(authed(
            json_request(
                "PATCH",
                "/api/v1/users/update-account",
                json!({ "fullName": "Alice" }),
            ),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_avatar_and_cover_image() {
    let (app, _, _) = common::create_test_app();
    let alice = register_and_login(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(authed(
            json_request(
                "PATCH",
                "/api/v1/users/avatar",
                json!({ "avatar": "https://cdn.example.com/new-avatar.png" }),
            ),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["avatar"], "https://cdn.example.com/new-avatar.png");

    let response = app
        .clone()
        .oneshot(authed(
            json_request(
                "PATCH",
                "/api/v1/users/cover-image",
                json!({ "coverImage": "https://cdn.example.com/banner.png" }),
            ),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["coverImage"], "https://cdn.example.com/banner.png");

    let response = app
        .oneshot(authed(
            json_request("PATCH", "/api/v1/users/avatar", json!({})),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_routes_require_auth() {
    let (app, _, _) = common::create_test_app();

    for (method, uri) in [
        ("PATCH", "/api/v1/users/update-account"),
        ("PATCH", "/api/v1/users/avatar"),
        ("PATCH", "/api/v1/users/cover-image"),
        ("GET", "/api/v1/users/history"),
        ("POST", "/api/v1/users/logout"),
        ("POST", "/api/v1/users/change-password"),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(method, uri, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_channel_profile_anonymous_and_signed_in() {
    let (app, _, store) = common::create_test_app();
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;
    store.subscribe(&bob.user_id, &alice.user_id).await;

    let response = app.clone().oneshot(get("/api/v1/users/c/alice")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let channel = &body["data"];
    assert_eq!(channel["username"], "alice");
    assert_eq!(channel["subscribersCount"], 1);
    assert_eq!(channel["channelsSubscribedToCount"], 0);
    assert_eq!(channel["isSubscribed"], false);
    assert!(channel.get("password").is_none());

    let response = app
        .clone()
        .oneshot(authed(get("/api/v1/users/c/alice"), &bob))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["isSubscribed"], true);

    // A bad token on a public route is treated as anonymous
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/users/c/alice")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["isSubscribed"], false);

    let response = app.oneshot(get("/api/v1/users/c/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_watch_history_in_order() {
    let (app, _, store) = common::create_test_app();
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;

    store.insert_video(video("v1", &bob.user_id)).await;
    store.insert_video(video("v2", &alice.user_id)).await;
    for id in ["v2", "deleted", "v1"] {
        store.push_watch_history(&alice.user_id, id).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(authed(get("/api/v1/users/history"), &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], "v2");
    assert_eq!(history[0]["owner"]["username"], "alice");
    assert_eq!(history[1]["id"], "v1");
    assert_eq!(history[1]["owner"]["username"], "bob");
    assert!(history[1]["owner"].get("email").is_none());

    let response = app
        .oneshot(authed(get("/api/v1/users/history"), &bob))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_offline_database_returns_500() {
    let app = common::create_offline_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "alice", "password": "hunter2!" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "something went wrong");
    assert_eq!(body["success"], false);
}
