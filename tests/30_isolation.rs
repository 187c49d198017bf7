mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

async fn two_restaurants() -> Result<common::TestApp> {
    let app = common::TestApp::new();
    app.provision("sourabh-upadhyay", "Sourabh Upadhyay").await?;
    app.provision("vivek-singh-bhadoriya", "Vivek Singh Bhadoriya").await?;
    Ok(app)
}

#[tokio::test]
async fn menu_items_stay_in_their_restaurant() -> Result<()> {
    let app = two_restaurants().await?;

    let (status, _) = app
        .post(
            "/api/t/sourabh-upadhyay/menu",
            json!({ "name": "Paneer Tikka", "price_paise": 25000, "category": "starters" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, sourabh) = app.get("/api/t/sourabh-upadhyay/menu").await?;
    let (_, vivek) = app.get("/api/t/vivek-singh-bhadoriya/menu").await?;
    assert_eq!(sourabh["data"].as_array().unwrap().len(), 1);
    assert_eq!(vivek["data"].as_array().unwrap().len(), 0);

    // Row ids are per restaurant, so the same id is a miss next door
    let (status, _) = app.get("/api/t/vivek-singh-bhadoriya/menu/1").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn orders_cannot_reference_another_restaurants_menu() -> Result<()> {
    let app = two_restaurants().await?;
    for name in ["Dal Makhani", "Butter Naan"] {
        app.post(
            "/api/t/sourabh-upadhyay/menu",
            json!({ "name": name, "price_paise": 18000 }),
        )
        .await?;
    }
    app.post(
        "/api/t/vivek-singh-bhadoriya/menu",
        json!({ "name": "Poha", "price_paise": 6000 }),
    )
    .await?;

    // Item 2 only exists in sourabh-upadhyay
    let (status, body) = app
        .post(
            "/api/t/vivek-singh-bhadoriya/orders",
            json!({ "items": [{ "menu_item_id": 2, "quantity": 1 }] }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");

    let (_, orders) = app.get("/api/t/vivek-singh-bhadoriya/orders").await?;
    assert_eq!(orders["data"].as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn order_lifecycle_within_one_restaurant() -> Result<()> {
    let app = two_restaurants().await?;
    let base = "/api/t/sourabh-upadhyay";

    app.post(&format!("{}/menu", base), json!({ "name": "Chole Bhature", "price_paise": 15000 }))
        .await?;
    let (status, table) = app
        .post(&format!("{}/tables", base), json!({ "label": "T1" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(table["data"]["seats"], 4);
    let table_id = table["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post(&format!("{}/tables", base), json!({ "label": "T1" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    // Labels are unique per restaurant only
    let (status, _) = app
        .post("/api/t/vivek-singh-bhadoriya/tables", json!({ "label": "T1" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = app
        .post(
            &format!("{}/orders", base),
            json!({
                "table_id": table_id,
                "customer_name": "Asha",
                "items": [{ "menu_item_id": 1, "quantity": 3 }]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["data"]["total_paise"], 45000);
    assert_eq!(order["data"]["status"], "placed");
    assert_eq!(order["data"]["items"].as_array().unwrap().len(), 1);
    let order_id = order["data"]["id"].as_i64().unwrap();

    let (status, served) = app
        .send(
            Method::PATCH,
            &format!("{}/orders/{}/status", base, order_id),
            Some(json!({ "status": "served" })),
            &[],
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served["data"]["status"], "served");

    let (status, rating) = app
        .post(
            &format!("{}/ratings", base),
            json!({ "order_id": order_id, "score": 5, "comment": "Great" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rating["data"]["score"], 5);

    let (status, _) = app
        .post(&format!("{}/ratings", base), json!({ "order_id": order_id, "score": 9 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The order is invisible from the other restaurant
    let (status, _) = app
        .post(
            "/api/t/vivek-singh-bhadoriya/ratings",
            json!({ "order_id": order_id, "score": 4 }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}
