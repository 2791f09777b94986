//! Router-level tests for the Git smart HTTP endpoints.
//!
//! The real router and store are used; `git http-backend` is replaced by a
//! recording fake so the HTTP <-> CGI translation can be inspected.

mod common;

use axum::body::Body;
use axum::http::{StatusCode, header};

use common::*;
use hypercommit::store::Store;
use hypercommit::types::{Owner, Role, Visibility};

#[tokio::test]
async fn health_check() {
    let h = Harness::new();
    let response = h.send(get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn public_clone_strips_git_suffix() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    let repo = h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);

    let response = h
        .send(
            info_refs("alice", "myrepo.git", "git-upload-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-git-upload-pack-advertisement"
    );
    assert_eq!(
        body_bytes(response).await,
        b"001e# service=git-upload-pack\n0000"
    );

    let call = h.cgi.last_call();
    assert_eq!(call.env("PATH_INFO"), Some("/info/refs"));
    assert_eq!(call.env("REQUEST_METHOD"), Some("GET"));
    assert_eq!(call.env("QUERY_STRING"), Some("service=git-upload-pack"));
    assert_eq!(call.env("GIT_HTTP_EXPORT_ALL"), Some("1"));
    assert_eq!(call.env("REMOTE_USER"), None);

    let expected = h
        .config
        .repos_path()
        .join(alice.id.to_string())
        .join(repo.id.to_string());
    assert_eq!(call.repository_path, expected);

    let expected_root = expected.to_string_lossy().to_string();
    assert_eq!(call.env("GIT_PROJECT_ROOT"), Some(expected_root.as_str()));
}

#[tokio::test]
async fn public_upload_pack_without_credentials() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::from("0000")).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cgi.last_call().env("PATH_INFO"), Some("/git-upload-pack"));
}

#[tokio::test]
async fn private_clone_requires_credentials() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(
            info_refs("alice", "myrepo", "git-upload-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_challenge(&response);
    assert!(h.cgi.calls().is_empty());
}

#[tokio::test]
async fn push_without_authorization_is_challenged() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(receive_pack("alice", "myrepo").body(Body::empty()).unwrap())
        .await;

    assert_challenge(&response);
    assert!(h.cgi.calls().is_empty());
}

#[tokio::test]
async fn anonymous_push_to_public_repo_is_challenged() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);

    let response = h
        .send(
            info_refs("alice", "myrepo", "git-receive-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_challenge(&response);
}

#[tokio::test]
async fn unknown_owner_and_repository_are_404() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);

    let response = h
        .send(
            info_refs("nobody", "myrepo", "git-upload-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h
        .send(
            info_refs("alice", "missing", "git-upload-pack")
                .header(header::AUTHORIZATION, basic_auth("alice", "pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    assert!(h.cgi.calls().is_empty());
}

#[tokio::test]
async fn push_requires_write_role() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("alice-pw"));
    let reader = h.create_user("reader", Some("reader-pw"));
    let writer = h.create_user("writer", Some("writer-pw"));
    let admin = h.create_user("admin", Some("admin-pw"));
    h.create_user("stranger", Some("stranger-pw"));

    let repo = h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);
    h.store.upsert_contributor(repo.id, reader.id, Role::Read).unwrap();
    h.store.upsert_contributor(repo.id, writer.id, Role::Write).unwrap();
    h.store.upsert_contributor(repo.id, admin.id, Role::Admin).unwrap();

    let cases = [
        ("reader", "reader-pw", StatusCode::FORBIDDEN),
        ("stranger", "stranger-pw", StatusCode::FORBIDDEN),
        ("writer", "writer-pw", StatusCode::OK),
        ("admin", "admin-pw", StatusCode::OK),
        ("alice", "alice-pw", StatusCode::OK),
    ];

    for (username, password, expected) in cases {
        let response = h
            .send(
                receive_pack("alice", "myrepo")
                    .header(header::AUTHORIZATION, basic_auth(username, password))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), expected, "push as {username}");
    }

    assert_eq!(h.cgi.calls().len(), 3);
}

#[tokio::test]
async fn read_role_can_clone_private_repo() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    let reader = h.create_user("reader", Some("reader-pw"));
    let repo = h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);
    h.store.upsert_contributor(repo.id, reader.id, Role::Read).unwrap();

    let response = h
        .send(
            upload_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("reader", "reader-pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cgi.last_call().env("REMOTE_USER"), Some("reader"));
}

#[tokio::test]
async fn token_is_accepted_in_password_slot() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("correct-password"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);
    let (token_id, raw_token) = h.create_token(&alice);

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("alice", &raw_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = h.store.get_access_token(token_id).unwrap().unwrap();
    assert!(token.last_used_at.is_some());

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("alice", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_challenge(&response);
}

#[tokio::test]
async fn token_of_other_user_is_rejected() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    let mallory = h.create_user("mallory", Some("pw2"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);
    let (_, mallory_token) = h.create_token(&mallory);

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("alice", &mallory_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_challenge(&response);
}

#[tokio::test]
async fn unknown_user_is_challenged() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(
            upload_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("ghost", "pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_challenge(&response);
}

#[tokio::test]
async fn session_cookie_identifies_actor() {
    let h = Harness::new();
    let alice = h.create_user("alice", None);
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::COOKIE, h.session_cookie(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cgi.last_call().env("REMOTE_USER"), Some("alice"));

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::COOKIE, "hypercommit_user_id=1|1700000000|forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_challenge(&response);
}

#[tokio::test]
async fn organization_members_own_org_repositories() {
    let h = Harness::new();
    let member = h.create_user("member", Some("member-pw"));
    h.create_user("outsider", Some("outsider-pw"));
    let org = h.create_org("acme", &[&member]);
    let repo = h.create_repo(Owner::Organization(org.id), "tools", Visibility::Private);

    let response = h
        .send(
            receive_pack("acme", "tools")
                .header(header::AUTHORIZATION, basic_auth("member", "member-pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let expected = h
        .config
        .repos_path()
        .join(format!("org_{}", org.id))
        .join(repo.id.to_string());
    assert_eq!(h.cgi.last_call().repository_path, expected);

    let response = h
        .send(
            upload_pack("acme", "tools")
                .header(header::AUTHORIZATION, basic_auth("outsider", "outsider-pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cgi_status_is_answered_with_200() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);
    h.cgi.set_output(b"Status: 404 Not Found\r\n\r\nnot here");

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"not here");
}

#[tokio::test]
async fn cgi_status_forwarded_when_enabled() {
    let h = Harness::with_config(|config| config.forward_cgi_status = true);
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);
    h.cgi.set_output(b"Status: 404 Not Found\n\nnot here");

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"not here");
}

#[tokio::test]
async fn request_body_and_headers_reach_backend() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);
    h.cgi.set_output(
        b"Content-Type: application/x-git-receive-pack-result\r\n\r\n0000",
    );

    let pack: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("alice", "pw"))
                .header(header::CONTENT_LENGTH, pack.len())
                .header("Git-Protocol", "version=2")
                .body(Body::from(pack.clone()))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-git-receive-pack-result"
    );

    let call = h.cgi.last_call();
    assert_eq!(call.stdin, pack);
    assert_eq!(call.env("REQUEST_METHOD"), Some("POST"));
    assert_eq!(call.env("PATH_INFO"), Some("/git-receive-pack"));
    assert_eq!(
        call.env("CONTENT_TYPE"),
        Some("application/x-git-receive-pack-request")
    );
    assert_eq!(call.env("CONTENT_LENGTH"), Some("4096"));
    assert_eq!(call.env("HTTP_GIT_PROTOCOL"), Some("version=2"));
    assert_eq!(call.env("REMOTE_USER"), Some("alice"));
}

#[tokio::test]
async fn backend_failure_is_500() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);
    h.cgi.fail_with("fatal: not a git repository");

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"Failed to execute git command");
}

#[tokio::test]
async fn backend_timeout_is_500() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Public);
    h.cgi.time_out();

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::from("0000")).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"Failed to execute git command");
}

#[tokio::test]
async fn failed_basic_auth_is_logged_without_secret() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(
            receive_pack("alice", "myrepo")
                .header(header::AUTHORIZATION, basic_auth("alice", "hunter2-wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_challenge(&response);

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains("Git authentication failed"))
        .expect("authentication failure not logged");
    assert!(line.contains("WARN"));
    assert!(line.contains("username=alice"));
    assert!(line.contains("repo=myrepo"));
    assert!(line.contains("operation=write"));
    assert!(!output.contains("hunter2-wrong"));
}

#[tokio::test]
async fn missing_credentials_are_logged() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "myrepo", Visibility::Private);

    let response = h
        .send(upload_pack("alice", "myrepo").body(Body::empty()).unwrap())
        .await;
    assert_challenge(&response);

    let output = logs.contents();
    assert!(
        output
            .lines()
            .any(|line| line.contains("Git authentication failed") && line.contains("username=-"))
    );
}

#[tokio::test]
async fn percent_encoded_repository_name_gets_endpoint_path_info() {
    let h = Harness::new();
    let alice = h.create_user("alice", Some("pw"));
    h.create_repo(Owner::User(alice.id), "my-repo", Visibility::Public);

    let response = h
        .send(
            info_refs("alice", "my%2Drepo.git", "git-upload-pack")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cgi.last_call().env("PATH_INFO"), Some("/info/refs"));

    let response = h
        .send(
            upload_pack("alice", "my%2Drepo")
                .body(Body::from("0000"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cgi.last_call().env("PATH_INFO"), Some("/git-upload-pack"));
}
