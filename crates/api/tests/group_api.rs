//! Integration tests for group fan-out, last-execution status, and group
//! connectivity checks.

mod common;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{
    body_json, build_app, create_group, create_script, create_server, get, post_json,
    test_engine_config, test_state, wait_for_terminal, Behavior, FakeProber, FakeRunner,
};
use fleet_core::task::TaskStatus;
use fleet_db::models::group::CreateServerGroup;
use fleet_db::models::script::CreateScript;
use fleet_db::models::server::CreateServer;
use fleet_db::repositories::{GroupRepo, ScriptRepo, ServerRepo, TaskRepo};
use serde_json::json;

async fn execute(app: &axum::Router, group_id: i64, script_id: i64) -> Vec<serde_json::Value> {
    let response = post_json(
        app.clone(),
        &format!("/api/v1/groups/{group_id}/execute"),
        json!({ "script_id": script_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn execute_creates_one_task_per_member() {
    let app = common::build_test_app();
    let a = create_server(&app, "web-01").await;
    let b = create_server(&app, "web-02").await;
    let c = create_server(&app, "web-03").await;
    let group_id = create_group(&app, "web", &[c, a, b]).await;
    let script_id = create_script(&app, "uptime").await;

    let tasks = execute(&app, group_id, script_id).await;

    assert_eq!(tasks.len(), 3);
    let servers: Vec<i64> = tasks.iter().map(|t| t["server_id"].as_i64().unwrap()).collect();
    assert_eq!(servers, vec![a, b, c], "member-id order");
    assert!(tasks.iter().all(|t| t["source_group_id"] == group_id));
    assert!(tasks.iter().all(|t| t["script_id"] == script_id));

    for task in &tasks {
        let finished = wait_for_terminal(&app, task["id"].as_i64().unwrap()).await;
        assert_eq!(finished["status"], "succeeded");
    }
}

#[tokio::test]
async fn hosts_are_independent() {
    let app = build_app(test_state(
        test_engine_config(),
        FakeRunner::new(Behavior::Succeed)
            .with_host("down-01", Behavior::Refuse)
            .with_host("bad-01", Behavior::Exit(3)),
        FakeProber::default(),
    ));
    let ok = create_server(&app, "ok-01").await;
    let down = create_server(&app, "down-01").await;
    let bad = create_server(&app, "bad-01").await;
    let group_id = create_group(&app, "mixed", &[ok, down, bad]).await;
    let script_id = create_script(&app, "uptime").await;

    let tasks = execute(&app, group_id, script_id).await;

    let mut by_server = std::collections::HashMap::new();
    for task in &tasks {
        let finished = wait_for_terminal(&app, task["id"].as_i64().unwrap()).await;
        by_server.insert(
            finished["server_id"].as_i64().unwrap(),
            finished["status"].as_str().unwrap().to_string(),
        );
    }
    assert_eq!(by_server[&ok], "succeeded");
    assert_eq!(by_server[&down], "failed");
    assert_eq!(by_server[&bad], "failed");
}

#[tokio::test]
async fn empty_group_dispatches_nothing() {
    let app = common::build_test_app();
    let group_id = create_group(&app, "empty", &[]).await;
    let script_id = create_script(&app, "uptime").await;

    let tasks = execute(&app, group_id, script_id).await;
    assert!(tasks.is_empty());

    let list = body_json(get(app, "/api/v1/tasks").await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn execute_rejects_bad_input() {
    let app = common::build_test_app();
    let server_id = create_server(&app, "web-01").await;
    let group_id = create_group(&app, "web", &[server_id]).await;
    let script_id = create_script(&app, "uptime").await;

    let missing = post_json(
        app.clone(),
        &format!("/api/v1/groups/{group_id}/execute"),
        json!({}),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["code"], "VALIDATION_ERROR");

    let unknown_group = post_json(
        app.clone(),
        "/api/v1/groups/999/execute",
        json!({ "script_id": script_id }),
    )
    .await;
    assert_eq!(unknown_group.status(), StatusCode::NOT_FOUND);

    let unknown_script = post_json(
        app.clone(),
        &format!("/api/v1/groups/{group_id}/execute"),
        json!({ "script_id": 999 }),
    )
    .await;
    assert_eq!(unknown_script.status(), StatusCode::NOT_FOUND);

    let list = body_json(get(app, "/api/v1/tasks").await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dropped_group_dispatch_still_drives_created_tasks() {
    let state = test_state(
        test_engine_config(),
        FakeRunner::new(Behavior::Succeed),
        FakeProber::default(),
    );
    let pool = &state.pool;
    let group = GroupRepo::create(pool, &CreateServerGroup { name: "large".to_string() })
        .await
        .unwrap();
    for i in 0..400 {
        let server = ServerRepo::create(
            pool,
            &CreateServer {
                hostname: format!("node-{i}"),
                ip_address: format!("10.9.{}.{}", i / 250, i % 250 + 1),
                port: None,
                username: None,
            },
        )
        .await
        .unwrap();
        GroupRepo::add_server(pool, group.id, server.id).await.unwrap();
    }
    let script = ScriptRepo::create(
        pool,
        &CreateScript {
            name: "uptime".to_string(),
            content: "uptime\n".to_string(),
        },
    )
    .await;

    // Poll the dispatch by hand and abandon it as soon as records exist,
    // the way a disconnected client drops its request future.
    let mut dispatch = Box::pin(state.dispatcher.execute_group(group.id, script.id));
    loop {
        if futures::poll!(dispatch.as_mut()).is_ready() {
            break;
        }
        if !TaskRepo::list(pool).await.is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    drop(dispatch);

    let deadline = Instant::now() + Duration::from_secs(10);
    let tasks = loop {
        let tasks = TaskRepo::list(pool).await;
        if tasks.iter().all(|t| !t.status.is_active()) {
            break tasks;
        }
        assert!(Instant::now() < deadline, "tasks left queued or running");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(tasks.len(), 400);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Succeeded));
    assert_eq!(state.dispatcher.in_flight_count(), 0);
}

// ---------------------------------------------------------------------------
// Last execution status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_tasks_lists_group_tasks_newest_first() {
    let app = common::build_test_app();
    let a = create_server(&app, "web-01").await;
    let b = create_server(&app, "web-02").await;
    let group_id = create_group(&app, "web", &[a, b]).await;
    let other_group = create_group(&app, "solo", &[a]).await;
    let script_id = create_script(&app, "uptime").await;

    let first = execute(&app, group_id, script_id).await;
    execute(&app, other_group, script_id).await;
    let second = execute(&app, group_id, script_id).await;

    let response = get(app.clone(), &format!("/api/v1/groups/{group_id}/status/last")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();

    let mut expected: Vec<i64> = first
        .iter()
        .chain(second.iter())
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    expected.sort_unstable_by(|x, y| y.cmp(x));
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn last_tasks_of_unknown_group_is_404() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/groups/77/status/last").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_group_reports_every_member_within_one_timeout() {
    let app = build_app(test_state(
        test_engine_config(),
        FakeRunner::new(Behavior::Succeed),
        FakeProber::default()
            .hanging("slow-01")
            .hanging("slow-02")
            .unreachable("off-01")
            .failing("err-01"),
    ));
    let up = create_server(&app, "up-01").await;
    let slow_a = create_server(&app, "slow-01").await;
    let slow_b = create_server(&app, "slow-02").await;
    let off = create_server(&app, "off-01").await;
    let err = create_server(&app, "err-01").await;
    let group_id = create_group(&app, "mixed", &[up, slow_a, slow_b, off, err]).await;

    let started = Instant::now();
    let response = get(app, &format!("/api/v1/groups/{group_id}/ping")).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!({
            up.to_string(): true,
            slow_a.to_string(): false,
            slow_b.to_string(): false,
            off.to_string(): false,
            err.to_string(): false,
        })
    );
    // Two hanging probes with a 200ms timeout each run in parallel.
    assert!(elapsed < Duration::from_millis(390), "took {elapsed:?}");
}

#[tokio::test]
async fn ping_empty_group_is_empty_map() {
    let app = common::build_test_app();
    let group_id = create_group(&app, "empty", &[]).await;

    let json = body_json(get(app, &format!("/api/v1/groups/{group_id}/ping")).await).await;
    assert_eq!(json["data"], json!({}));
}

#[tokio::test]
async fn ping_unknown_group_is_404() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/groups/5/ping").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ping_server_reports_alive_flag() {
    let app = build_app(test_state(
        test_engine_config(),
        FakeRunner::new(Behavior::Succeed),
        FakeProber::default().unreachable("off-01"),
    ));
    let up = create_server(&app, "up-01").await;
    let off = create_server(&app, "off-01").await;

    let json = body_json(get(app.clone(), &format!("/api/v1/servers/{up}/ping")).await).await;
    assert_eq!(json["data"]["server_id"], up);
    assert_eq!(json["data"]["alive"], true);
    assert!(json["data"]["checked_at"].is_string());

    let json = body_json(get(app.clone(), &format!("/api/v1/servers/{off}/ping")).await).await;
    assert_eq!(json["data"]["alive"], false);

    let response = get(app, "/api/v1/servers/999/ping").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_fan_out_targets_distinct_hosts() {
    let app = common::build_test_app();
    let mut members = Vec::new();
    for i in 0..8 {
        members.push(create_server(&app, &format!("node-{i}")).await);
    }
    let group_id = create_group(&app, "fleet", &members).await;
    let script_id = create_script(&app, "uptime").await;

    let tasks = execute(&app, group_id, script_id).await;
    let servers: HashSet<i64> = tasks.iter().map(|t| t["server_id"].as_i64().unwrap()).collect();
    assert_eq!(servers, members.into_iter().collect());
}
