//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState, Error,
    auth::{auth_guard, get_log_out, post_log_in},
    budget::{delete_override_endpoint, get_budgets_endpoint, update_budget_endpoint},
    category::{create_category_endpoint, get_categories_endpoint},
    endpoints,
    summary::get_summary_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transactions_endpoint,
    },
    user::{get_current_user_endpoint, get_users_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(endpoints::USERS, get(get_users_endpoint))
        .route(endpoints::CURRENT_USER, get(get_current_user_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(get_budgets_endpoint).put(update_budget_endpoint),
        )
        .route(
            endpoints::BUDGET_OVERRIDE,
            delete(delete_override_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        auth::COOKIE_TOKEN,
        endpoints::{self, format_endpoint},
    };

    use super::build_router;

    const CODE: &str = "open sesame";

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "42",
            CODE,
            "Etc/UTC",
        )
        .unwrap();

        TestServer::new(build_router(state)).expect("Could not create test server.")
    }

    async fn log_in(server: &TestServer, user_id: &str) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "code": CODE, "user_id": user_id }))
            .await;
        response.assert_status_ok();

        response.cookie(COOKIE_TOKEN)
    }

    async fn create_category(server: &TestServer, cookie: &Cookie<'static>, name: &str) -> i64 {
        let response = server
            .post(endpoints::CATEGORIES)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["id"].as_i64().unwrap()
    }

    async fn create_transaction(
        server: &TestServer,
        cookie: &Cookie<'static>,
        body: Value,
    ) -> i64 {
        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn protected_routes_require_session() {
        let server = get_test_server();

        for path in [
            endpoints::USERS,
            endpoints::CATEGORIES,
            endpoints::BUDGETS,
            endpoints::TRANSACTIONS,
            endpoints::SUMMARY,
        ] {
            server.get(path).await.assert_status_unauthorized();
        }
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let server = get_test_server();

        let response = server.get("/api/coffee").await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "error": "the requested resource could not be found" }));
    }

    #[tokio::test]
    async fn current_user_matches_session() {
        let server = get_test_server();
        let cookie = log_in(&server, "partner").await;

        let response = server
            .get(endpoints::CURRENT_USER)
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "id": "partner",
            "display_name": "Partner",
            "is_owner": false,
        }));
    }

    #[tokio::test]
    async fn overspent_budget_has_negative_left() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;
        let category_id = create_category(&server, &cookie, "Groceries").await;
        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id, "amount": "1000" }))
            .await
            .assert_status_ok();
        create_transaction(
            &server,
            &cookie,
            json!({
                "amount": "1200",
                "category_id": category_id,
                "occurred_at": "2024-05-10T12:00:00Z",
            }),
        )
        .await;

        let response = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "2024-05")
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["month"], "2024-05");
        assert_eq!(body["budgets"][0]["effective_budget"], "1000");
        assert_eq!(body["budgets"][0]["spent"], "1200");
        assert_eq!(body["budgets"][0]["left"], "-200");
    }

    #[tokio::test]
    async fn override_applies_to_its_month_only() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;
        let category_id = create_category(&server, &cookie, "Rent").await;
        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id, "amount": "1000" }))
            .await
            .assert_status_ok();
        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "type": "override",
                "category_id": category_id,
                "month": "2024-05",
                "amount": "1500",
            }))
            .await
            .assert_status_ok();

        let may = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "2024-05")
            .add_cookie(cookie.clone())
            .await
            .json::<Value>();
        let june = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "2024-06")
            .add_cookie(cookie.clone())
            .await
            .json::<Value>();
        assert_eq!(may["budgets"][0]["effective_budget"], "1500");
        assert_eq!(may["budgets"][0]["has_override"], true);
        assert_eq!(june["budgets"][0]["effective_budget"], "1000");

        let override_path = format_endpoint(
            &format_endpoint(endpoints::BUDGET_OVERRIDE, category_id),
            "2024-05",
        );
        server
            .delete(&override_path)
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&override_path)
            .add_cookie(cookie)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn partner_cannot_delete_owner_transaction() {
        let server = get_test_server();
        let owner = log_in(&server, "owner").await;
        let partner = log_in(&server, "partner").await;
        let owner_transaction = create_transaction(
            &server,
            &owner,
            json!({ "amount": "25", "category_name": "Fuel" }),
        )
        .await;
        let partner_transaction = create_transaction(
            &server,
            &partner,
            json!({ "amount": "12.50", "category_name": "fuel" }),
        )
        .await;

        server
            .delete(&format_endpoint(endpoints::TRANSACTION, owner_transaction))
            .add_cookie(partner)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format_endpoint(endpoints::TRANSACTION, partner_transaction))
            .add_cookie(owner.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let transactions = server
            .get(endpoints::TRANSACTIONS)
            .add_cookie(owner)
            .await
            .json::<Value>();
        let ids: Vec<_> = transactions
            .as_array()
            .unwrap()
            .iter()
            .map(|transaction| transaction["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, [owner_transaction]);
    }

    #[tokio::test]
    async fn summary_filters_by_payer() {
        let server = get_test_server();
        let owner = log_in(&server, "owner").await;
        let partner = log_in(&server, "partner").await;
        for (cookie, amount) in [(&owner, "40"), (&partner, "12.50"), (&partner, "7.25")] {
            create_transaction(
                &server,
                cookie,
                json!({
                    "amount": amount,
                    "category_name": "Groceries",
                    "occurred_at": "2024-05-10T12:00:00Z",
                }),
            )
            .await;
        }

        let response = server
            .get(endpoints::SUMMARY)
            .add_query_param("period", "custom")
            .add_query_param("from", "2024-05-01")
            .add_query_param("to", "2024-05-31")
            .add_query_param("payer", "partner")
            .add_cookie(owner)
            .await;

        response.assert_status_ok();
        let summary = response.json::<Value>();
        assert_eq!(summary["period"], "custom");
        assert_eq!(summary["total_spending"], "19.75");
        assert_eq!(summary["spending_by_payer"].as_array().unwrap().len(), 1);
        assert_eq!(summary["transactions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_amount_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .json(&json!({ "amount": "0", "category_name": "Snacks" }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn amount_above_maximum_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .json(&json!({ "amount": "1000000000000000000000000000", "category_name": "Yacht" }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn default_budget_without_amount_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;
        let category_id = create_category(&server, &cookie, "Groceries").await;
        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id, "amount": "1000" }))
            .await
            .assert_status_ok();

        let response = server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id }))
            .await;

        response.assert_status_bad_request();
        let budgets = server
            .get(endpoints::BUDGETS)
            .add_cookie(cookie)
            .await
            .json::<Value>();
        assert_eq!(budgets["budgets"][0]["default_budget"], "1000");
    }

    #[tokio::test]
    async fn null_default_budget_clears_it() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;
        let category_id = create_category(&server, &cookie, "Groceries").await;
        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id, "amount": "1000" }))
            .await
            .assert_status_ok();

        server
            .put(endpoints::BUDGETS)
            .add_cookie(cookie.clone())
            .json(&json!({ "type": "default", "category_id": category_id, "amount": null }))
            .await
            .assert_status_ok();

        let budgets = server
            .get(endpoints::BUDGETS)
            .add_cookie(cookie)
            .await
            .json::<Value>();
        assert_eq!(budgets["budgets"][0]["default_budget"], Value::Null);
    }

    #[tokio::test]
    async fn non_numeric_budget_amount_is_bad_request() {
        let server = get_test_server();
        let cookie = log_in(&server, "owner").await;
        let category_id = create_category(&server, &cookie, "Rent").await;

        for body in [
            json!({ "type": "default", "category_id": category_id, "amount": "abc" }),
            json!({
                "type": "override",
                "category_id": category_id,
                "month": "2024-05",
                "amount": "abc",
            }),
        ] {
            server
                .put(endpoints::BUDGETS)
                .add_cookie(cookie.clone())
                .json(&body)
                .await
                .assert_status_bad_request();
        }

        let may = server
            .get(endpoints::BUDGETS)
            .add_query_param("month", "2024-05")
            .add_cookie(cookie)
            .await
            .json::<Value>();
        assert_eq!(may["budgets"][0]["has_override"], false);
        assert_eq!(may["budgets"][0]["override_budget"], Value::Null);
        assert_eq!(may["budgets"][0]["default_budget"], Value::Null);
    }

    #[tokio::test]
    async fn log_out_clears_session_cookie() {
        let server = get_test_server();
        log_in(&server, "owner").await;

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert_eq!(
            response.cookie(COOKIE_TOKEN).expires_datetime(),
            Some(time::OffsetDateTime::UNIX_EPOCH)
        );
    }
}
