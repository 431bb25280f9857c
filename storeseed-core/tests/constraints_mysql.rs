//! Schema constraint tests against a disposable MySQL container.
//!
//! Verifies the invariants the bootstrapped schema must enforce on its own:
//! rating score bounds, one rating per (user, store), and cascade deletion.

#![allow(clippy::unwrap_used)]

use sqlx::MySqlPool;
use std::time::Duration;
use storeseed_core::{Bootstrapper, DatabaseConfig, SeedPlan, SqlScript};
use testcontainers_modules::{mysql::Mysql, testcontainers::runners::AsyncRunner};

async fn bootstrap_container() -> (
    testcontainers_modules::testcontainers::ContainerAsync<Mysql>,
    MySqlPool,
) {
    let mysql = Mysql::default().start().await.unwrap();
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{port}/test");

    let mut attempts = 0;
    loop {
        if let Ok(pool) = MySqlPool::connect(&database_url).await {
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                pool.close().await;
                break;
            }
            pool.close().await;
        }
        attempts += 1;
        assert!(attempts < 30, "MySQL container never became ready");
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let config = DatabaseConfig::from_url(&database_url).unwrap();
    let mut bootstrapper = Bootstrapper::connect(&config).await.unwrap();
    bootstrapper
        .run(&SqlScript::embedded(), &SeedPlan::baseline(), false)
        .await
        .unwrap();
    bootstrapper.close().await;

    let pool = MySqlPool::connect(&database_url).await.unwrap();
    (mysql, pool)
}

async fn seeded_ids(pool: &MySqlPool) -> (i32, i32) {
    let user_id: i32 = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind("rahul@example.com")
        .fetch_one(pool)
        .await
        .unwrap();
    let store_id: i32 = sqlx::query_scalar("SELECT id FROM stores WHERE email = ?")
        .bind("info@techmart.com")
        .fetch_one(pool)
        .await
        .unwrap();
    (user_id, store_id)
}

async fn insert_rating(pool: &MySqlPool, user_id: i32, store_id: i32, score: i32) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO ratings (user_id, store_id, rating, comment) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(store_id)
        .bind(score)
        .bind("integration test rating")
        .execute(pool)
        .await
        .map(|_| ())
}

#[tokio::test]
async fn test_mysql_rating_score_bounds_are_enforced() {
    let (_mysql, pool) = bootstrap_container().await;
    let (user_id, store_id) = seeded_ids(&pool).await;

    assert!(insert_rating(&pool, user_id, store_id, 0).await.is_err());
    assert!(insert_rating(&pool, user_id, store_id, 6).await.is_err());
    assert!(insert_rating(&pool, user_id, store_id, 5).await.is_ok());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "only the in-range rating lands");
    pool.close().await;
}

#[tokio::test]
async fn test_mysql_duplicate_rating_per_user_store_is_rejected() {
    let (_mysql, pool) = bootstrap_container().await;
    let (user_id, store_id) = seeded_ids(&pool).await;

    insert_rating(&pool, user_id, store_id, 4).await.unwrap();
    let second = insert_rating(&pool, user_id, store_id, 2).await;
    assert!(second.is_err(), "one rating per (user, store) pair");

    let score: i32 = sqlx::query_scalar("SELECT rating FROM ratings WHERE user_id = ? AND store_id = ?")
        .bind(user_id)
        .bind(store_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(score, 4, "original rating is untouched");
    pool.close().await;
}

#[tokio::test]
async fn test_mysql_deleting_owner_cascades_to_store_and_ratings() {
    let (_mysql, pool) = bootstrap_container().await;
    let (user_id, store_id) = seeded_ids(&pool).await;

    insert_rating(&pool, user_id, store_id, 3).await.unwrap();

    // Sarah owns the seeded store; deleting her must take the store with it,
    // and the store's ratings with the store.
    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("sarah@example.com")
        .execute(&pool)
        .await
        .unwrap();

    let stores: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stores, 0);

    let ratings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ratings, 0);

    // The rating user is untouched.
    let rahul: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind("rahul@example.com")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rahul, 1);
    pool.close().await;
}

#[tokio::test]
async fn test_mysql_deleting_store_cascades_to_ratings_only() {
    let (_mysql, pool) = bootstrap_container().await;
    let (user_id, store_id) = seeded_ids(&pool).await;

    insert_rating(&pool, user_id, store_id, 5).await.unwrap();

    sqlx::query("DELETE FROM stores WHERE id = ?")
        .bind(store_id)
        .execute(&pool)
        .await
        .unwrap();

    let ratings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ratings, 0);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 3, "users survive a store deletion");
    pool.close().await;
}
