mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::json;

use common::{SERVICE_KEY, WEBHOOK_SECRET};

#[tokio::test]
async fn api_requires_a_bearer_token() {
    let app = common::spawn_app(common::test_config()).await;

    let resp = app.call("GET", "/api/obras", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["error"], "UNAUTHORIZED");

    let resp = app.call("GET", "/api/obras", Some("rdo_bogus"), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_issuance_requires_service_key() {
    let app = common::spawn_app(common::test_config()).await;

    let resp = app
        .call(
            "POST",
            "/auth/tokens",
            None,
            Some(json!({ "email": "eng@obra.com.br" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .call(
            "POST",
            "/auth/tokens",
            Some(SERVICE_KEY),
            Some(json!({ "email": "  Eng@Obra.com.br " })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    let token = resp.json()["token"].as_str().unwrap().to_string();

    let profile = app.call("GET", "/api/profile", Some(&token), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    let profile = profile.json();
    assert_eq!(profile["email"], "eng@obra.com.br");
    assert_eq!(profile["plano"], "free");
}

#[tokio::test]
async fn free_plan_is_limited_to_one_obra() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("free@obra.com.br", "user").await;

    app.create_obra(&token, "Residencial Aurora").await;
    let resp = app
        .call(
            "POST",
            "/api/obras",
            Some(&token),
            Some(json!({ "nome": "Segunda obra", "orcamento": 500.0 })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.json()["error"], "PLAN_LIMIT");
}

#[tokio::test]
async fn obras_are_scoped_to_their_owner() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, alice) = app.login("alice@obra.com.br", "user").await;
    let (_, bruno) = app.login("bruno@obra.com.br", "user").await;
    let obra_id = app.create_obra(&alice, "Galpão Norte").await;

    let resp = app
        .call("GET", &format!("/api/obras/{obra_id}"), Some(&bruno), None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let listed = app.call("GET", "/api/obras", Some(&bruno), None).await;
    assert_eq!(listed.json().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn csv_import_reports_counts_and_invalidations() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("import@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Edifício Horizonte").await;

    let content = "01/01/2024;Cimento;1500,00\n02/01/2024;Areia;\n03/01/2024;;\n;;\n";
    let resp = app
        .call(
            "POST",
            "/api/lancamentos/import",
            Some(&token),
            Some(json!({ "obra_id": obra_id, "content": content })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let summary = resp.json();
    assert_eq!(summary["total_rows"], 3);
    assert_eq!(summary["success_count"], 2);
    assert_eq!(summary["skipped_count"], 1);
    assert_eq!(summary["error_count"], 0);
    assert_eq!(summary["invalidate"], json!(["dashboard-metrics", "lancamentos"]));

    let listed = app
        .call(
            "GET",
            &format!("/api/lancamentos?obra_id={obra_id}"),
            Some(&token),
            None,
        )
        .await;
    let entries = listed.json();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let total: f64 = entries.iter().map(|e| e["valor"].as_f64().unwrap()).sum();
    assert!((total - 1500.0).abs() < 1e-9);

    let empty = app
        .call(
            "POST",
            "/api/lancamentos/import",
            Some(&token),
            Some(json!({ "obra_id": obra_id, "content": "   " })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_category_moves_entries_to_the_default() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("cat@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Casa Verde").await;

    let cat = app
        .call(
            "POST",
            "/api/categorias",
            Some(&token),
            Some(json!({ "nome": "Elétrica" })),
        )
        .await;
    assert_eq!(cat.status, StatusCode::CREATED);
    let cat_id = cat.json()["id"].as_str().unwrap().to_string();

    let entry = app
        .call(
            "POST",
            "/api/lancamentos",
            Some(&token),
            Some(json!({
                "obra_id": obra_id,
                "descricao": "Fios 2,5mm",
                "valor": 320.0,
                "data_gasto": "2024-03-10",
                "categoria_id": cat_id,
            })),
        )
        .await;
    assert_eq!(entry.status, StatusCode::CREATED, "{}", entry.text());
    let entry_id = entry.json()["id"].as_str().unwrap().to_string();

    let report = app
        .call(
            "POST",
            &format!("/api/categorias/{cat_id}/delete-with-migration"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(report.status, StatusCode::OK, "{}", report.text());
    let report = report.json();
    assert_eq!(report["moved"], 1);
    assert_eq!(report["remaining"], 0);
    let default_id = report["to"].as_str().unwrap().to_string();

    let cats = app.call("GET", "/api/categorias", Some(&token), None).await;
    let cats = cats.json();
    let names: Vec<&str> = cats
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["nome"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sem Categoria"]);

    let moved = app
        .call(
            "GET",
            &format!("/api/lancamentos/{entry_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(moved.json()["categoria_id"], default_id.as_str());
}

#[tokio::test]
async fn financial_export_is_an_attachment() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("export@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Ponte Rio").await;
    app.call(
        "POST",
        "/api/lancamentos",
        Some(&token),
        Some(json!({
            "obra_id": obra_id,
            "descricao": "Brita",
            "valor": 1234.5,
            "data_gasto": "2024-02-01",
        })),
    )
    .await;

    let resp = app
        .call(
            "GET",
            "/functions/export-financial-csv",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(
        resp.headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        resp.headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"lancamentos-")
    );
    let text = resp.text();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Data;Obra;Descrição;Categoria;Valor;Fornecedor;Forma de Pagamento;Observações"
    );
    assert_eq!(lines.next().unwrap(), "01/02/2024;Ponte Rio;Brita;;1234,50;;;");
}

#[tokio::test]
async fn signed_checkout_webhook_upgrades_the_profile() {
    let app = common::spawn_app(common::test_config()).await;
    let (user_id, token) = app.login("assinante@obra.com.br", "user").await;

    let payload = json!({
        "id": "evt_test_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "client_reference_id": user_id,
            "customer": "cus_test_1",
            "subscription": "sub_test_1",
        }}
    })
    .to_string();

    let unsigned = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/functions/stripe-webhook")
                .header("content-type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
    assert_eq!(unsigned.status, StatusCode::UNAUTHORIZED);

    let ts = Utc::now().timestamp();
    let sig = meu_rdo::service::billing::sign(WEBHOOK_SECRET, ts, payload.as_bytes()).unwrap();
    let resp = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/functions/stripe-webhook")
                .header("content-type", "application/json")
                .header("stripe-signature", format!("t={ts},v1={sig}"))
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    assert_eq!(resp.json()["outcome"], "activated");

    let profile = app.call("GET", "/api/profile", Some(&token), None).await.json();
    assert_eq!(profile["plano"], "pro");
    assert_eq!(profile["subscription_status"], "active");
    assert_eq!(profile["stripe_customer_id"], "cus_test_1");

    // pro accounts are no longer capped
    app.create_obra(&token, "Primeira").await;
    app.create_obra(&token, "Segunda").await;
}

#[tokio::test]
async fn cleanup_hook_removes_obra_blobs() {
    let app = common::spawn_app(common::test_config()).await;
    let (user_id, token) = app.login("docs@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Escola Municipal").await;

    let upload = app
        .call(
            "POST",
            "/api/documentos",
            Some(&token),
            Some(json!({
                "bucket": "documentos_obra",
                "obra_id": obra_id,
                "folder": "plantas",
                "filename": "térreo.pdf",
                "content_base64": "JVBERi0xLjQK",
            })),
        )
        .await;
    assert_eq!(upload.status, StatusCode::CREATED, "{}", upload.text());
    let doc = upload.json();
    assert_eq!(doc["content_type"], "application/pdf");
    let blob_path = app
        .storage_root
        .join("documentos_obra")
        .join(doc["path"].as_str().unwrap());
    assert!(blob_path.exists());

    let download = app
        .call(
            "GET",
            &format!("/api/documentos/{}/download", doc["id"].as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.body, b"%PDF-1.4\n");

    let hook = json!({
        "type": "DELETE",
        "table": "obras",
        "old_record": { "id": obra_id, "user_id": user_id },
    });
    let denied = app
        .call("POST", "/functions/cleanup-obra-storage", None, Some(hook.clone()))
        .await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .call(
            "POST",
            "/functions/cleanup-obra-storage",
            Some(SERVICE_KEY),
            Some(hook),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let report = resp.json();
    assert_eq!(report["buckets_cleared"], json!(["documentos_obra"]));
    assert_eq!(report["rows_deleted"], 1);
    assert!(!blob_path.exists());

    let listed = app.call("GET", "/api/documentos", Some(&token), None).await;
    assert_eq!(listed.json().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn support_thread_tracks_unread_on_both_sides() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, user) = app.login("cliente@obra.com.br", "user").await;
    let (_, admin) = app.login("suporte@meurdo.com.br", "admin").await;
    let (_, other) = app.login("curioso@obra.com.br", "user").await;

    let opened = app
        .call(
            "POST",
            "/api/support/tickets",
            Some(&user),
            Some(json!({ "assunto": "Erro no RDO", "mensagem": "Não consigo salvar o diário" })),
        )
        .await;
    assert_eq!(opened.status, StatusCode::CREATED, "{}", opened.text());
    let ticket_id = opened.json()["id"].as_str().unwrap().to_string();

    let hidden = app
        .call(
            "GET",
            &format!("/api/support/tickets/{ticket_id}"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let forbidden = app
        .call("GET", "/api/admin/support/tickets", Some(&user), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let unread = app.call("GET", "/api/support/unread", Some(&admin), None).await;
    assert_eq!(unread.json()["unread"], 1);

    let reply = app
        .call(
            "POST",
            &format!("/api/admin/support/tickets/{ticket_id}/messages"),
            Some(&admin),
            Some(json!({ "conteudo": "Pode tentar novamente?" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
    assert_eq!(reply.json()["from_admin"], true);

    let unread = app.call("GET", "/api/support/unread", Some(&user), None).await;
    assert_eq!(unread.json()["unread"], 1);

    let marked = app
        .call(
            "POST",
            &format!("/api/support/tickets/{ticket_id}/read"),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(marked.json()["marked"], 1);
    let unread = app.call("GET", "/api/support/unread", Some(&user), None).await;
    assert_eq!(unread.json()["unread"], 0);

    let closed = app
        .call(
            "POST",
            &format!("/api/support/tickets/{ticket_id}/close"),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(closed.json()["status"], "fechado");
    let rejected = app
        .call(
            "POST",
            &format!("/api/support/tickets/{ticket_id}/messages"),
            Some(&user),
            Some(json!({ "conteudo": "mais uma coisa" })),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_config_rejects_token_issuance() {
    let app = common::spawn_app(meu_rdo::config::Config::default()).await;

    for key in ["", "change-me"] {
        let resp = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/auth/tokens")
                    .header("content-type", "application/json")
                    .header("x-service-key", key)
                    .body(Body::from(
                        json!({ "email": "intruso@obra.com.br", "role": "admin" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "key {key:?}");
    }
}

async fn create_entry(
    app: &common::TestApp,
    token: &str,
    obra_id: &str,
    descricao: &str,
) -> String {
    let resp = app
        .call(
            "POST",
            "/api/lancamentos",
            Some(token),
            Some(json!({
                "obra_id": obra_id,
                "descricao": descricao,
                "valor": 10.0,
                "data_gasto": "2024-04-01",
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    resp.json()["id"].as_str().unwrap().to_string()
}

async fn create_categoria(app: &common::TestApp, token: &str, nome: &str) -> String {
    let resp = app
        .call(
            "POST",
            "/api/categorias",
            Some(token),
            Some(json!({ "nome": nome })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    resp.json()["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn bulk_category_update_counts_only_own_entries() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, alice) = app.login("alice@obra.com.br", "user").await;
    let (_, bruno) = app.login("bruno@obra.com.br", "user").await;
    let obra_a = app.create_obra(&alice, "Loja Centro").await;
    let obra_b = app.create_obra(&bruno, "Sobrado").await;
    let a1 = create_entry(&app, &alice, &obra_a, "Tijolo").await;
    let a2 = create_entry(&app, &alice, &obra_a, "Cal").await;
    let b1 = create_entry(&app, &bruno, &obra_b, "Telha").await;
    let cat_a = create_categoria(&app, &alice, "Alvenaria").await;
    let cat_b = create_categoria(&app, &bruno, "Cobertura").await;

    let resp = app
        .call(
            "POST",
            "/api/lancamentos/bulk-categoria",
            Some(&alice),
            Some(json!({ "ids": [a1, a2, b1], "categoria_id": cat_a })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let report = resp.json();
    assert_eq!(report["requested"], 3);
    assert_eq!(report["updated"], 2);

    let untouched = app
        .call("GET", &format!("/api/lancamentos/{b1}"), Some(&bruno), None)
        .await;
    assert!(untouched.json()["categoria_id"].is_null());

    let empty = app
        .call(
            "POST",
            "/api/lancamentos/bulk-categoria",
            Some(&alice),
            Some(json!({ "ids": [], "categoria_id": cat_a })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let foreign = app
        .call(
            "POST",
            "/api/lancamentos/bulk-categoria",
            Some(&alice),
            Some(json!({ "ids": [a1], "categoria_id": cat_b })),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_category_update_handles_large_selections() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("grande@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Condomínio Vale").await;
    let entry = create_entry(&app, &token, &obra_id, "Areia").await;
    let cat = create_categoria(&app, &token, "Agregados").await;

    let mut ids: Vec<String> = (0..40_000)
        .map(|_| uuid::Uuid::new_v4().to_string())
        .collect();
    ids.push(entry.clone());
    let resp = app
        .call(
            "POST",
            "/api/lancamentos/bulk-categoria",
            Some(&token),
            Some(json!({ "ids": ids, "categoria_id": cat })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let report = resp.json();
    assert_eq!(report["requested"], 40_001);
    assert_eq!(report["updated"], 1);

    let moved = app
        .call("GET", &format!("/api/lancamentos/{entry}"), Some(&token), None)
        .await;
    assert_eq!(moved.json()["categoria_id"], cat.as_str());
}

#[tokio::test]
async fn import_reuses_category_regardless_of_accented_case() {
    let app = common::spawn_app(common::test_config()).await;
    let (_, token) = app.login("eletrica@obra.com.br", "user").await;
    let obra_id = app.create_obra(&token, "Clínica").await;
    let cat_id = create_categoria(&app, &token, "Elétrica").await;

    let resp = app
        .call(
            "POST",
            "/api/lancamentos/import",
            Some(&token),
            Some(json!({
                "obra_id": obra_id,
                "content": "Data;Descrição;Valor;Categoria\n01/01/2024;Fio;10,00;ELÉTRICA\n",
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    assert_eq!(resp.json()["success_count"], 1);

    let cats = app.call("GET", "/api/categorias", Some(&token), None).await.json();
    let cats = cats.as_array().unwrap();
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0]["id"], cat_id.as_str());

    let duplicate = app
        .call(
            "POST",
            "/api/categorias",
            Some(&token),
            Some(json!({ "nome": "ELÉTRICA" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}
