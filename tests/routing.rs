//! Endpoint routing behavior: round-robin order, JSON annotation, local
//! endpoints, and broadcast-until-found batch lookup.

use serde_json::Value;

mod common;

#[tokio::test]
async fn round_robin_cycles_through_backends_in_order() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let b2 = common::spawn_backend("Backend Server 2", vec![]).await;
    let b3 = common::spawn_backend("Backend Server 3", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1, &b2, &b3], false, 10).await;

    let client = common::client();
    let mut handled = Vec::new();
    for _ in 0..4 {
        let res = client
            .get(format!("http://{}/history", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        handled.push(body["load_balancer_info"]["handled_by"].as_str().unwrap().to_string());
    }

    assert_eq!(
        handled,
        [
            "Backend Server 1",
            "Backend Server 2",
            "Backend Server 3",
            "Backend Server 1"
        ]
    );

    shutdown.trigger();
}

#[tokio::test]
async fn predict_merges_routing_metadata() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1], false, 10).await;

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(b"fake image bytes".to_vec())
            .file_name("test.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    );

    let res = common::client()
        .post(format!("http://{}/predict", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["food"], "pizza");
    assert_eq!(body["load_balancer_info"]["handled_by"], "Backend Server 1");
    assert_eq!(body["load_balancer_info"]["attempt"], 1);
    assert_eq!(
        body["load_balancer_info"]["backend_port"],
        b1.addr.port() as u64
    );

    shutdown.trigger();
}

#[tokio::test]
async fn health_endpoint_answers_locally() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let b2 = common::spawn_backend("Backend Server 2", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1, &b2], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["total_servers"], 2);
    assert_eq!(body["healthy_servers"], 2);
    assert_eq!(body["servers"].as_array().unwrap().len(), 2);
    assert_eq!(body["servers"][0]["name"], "Backend Server 1");
    assert_eq!(body["servers"][0]["healthy"], true);

    shutdown.trigger();
}

#[tokio::test]
async fn stats_counts_one_attempt_per_forward() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1], false, 10).await;
    let client = common::client();

    let stats: Value = client
        .get(format!("http://{}/stats", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_requests_forwarded"], 0);
    assert_eq!(stats["algorithm"], "round-robin");

    client
        .get(format!("http://{}/history", addr))
        .send()
        .await
        .unwrap();

    let stats: Value = client
        .get(format!("http://{}/stats", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_requests_forwarded"], 1);

    let backend_url = format!("http://{}/", b1.addr);
    assert_eq!(stats["server_stats"][&backend_url]["requests"], 1);
    assert_eq!(stats["server_stats"][&backend_url]["errors"], 0);

    shutdown.trigger();
}

#[tokio::test]
async fn batch_status_found_on_second_backend() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let b2 = common::spawn_backend("Backend Server 2", vec!["batch-42"]).await;
    let b3 = common::spawn_backend("Backend Server 3", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1, &b2, &b3], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/batch/status/batch-42", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["found_on"], "Backend Server 2");
    let checked = body["load_balancer_info"]["checked_servers"].as_array().unwrap();
    assert_eq!(checked.len(), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn batch_status_not_found_lists_checked_backends() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let b2 = common::spawn_backend("Backend Server 2", vec![]).await;
    let b3 = common::spawn_backend("Backend Server 3", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1, &b2, &b3], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/batch/status/batch-missing", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Batch not found");
    assert_eq!(body["batch_id"], "batch-missing");
    let checked = body["checked_servers"].as_array().unwrap();
    assert_eq!(checked.len(), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn dashboard_relays_raw_upstream_body() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/dashboard?range=7d", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(res.text().await.unwrap(), "<html>Backend Server 1</html>");

    shutdown.trigger();
}

#[tokio::test]
async fn uploads_relay_file_bytes() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/uploads/food.jpg", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.text().await.unwrap(),
        "file food.jpg from Backend Server 1"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_endpoint_returns_json_404() {
    let b1 = common::spawn_backend("Backend Server 1", vec![]).await;
    let (addr, shutdown) = common::spawn_balancer(&[&b1], false, 10).await;

    let res = common::client()
        .get(format!("http://{}/nope", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let body: Value = res.json().await.unwrap();
    assert!(body.get("error").is_some());

    shutdown.trigger();
}
