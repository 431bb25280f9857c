//! Baseline seed rows and credential hashing.
//!
//! Seeds are inserted with `INSERT IGNORE`, keyed by each row's unique email:
//! a re-run never duplicates nor alters an existing row. Passwords are hashed
//! with bcrypt before they are bound; plaintext never reaches the database.

use crate::error::{BootstrapError, Result};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, info};

/// Email address of the administrator seed account.
pub const ADMIN_EMAIL: &str = "admin@store-rating.com";

/// bcrypt work factor for seed credentials.
///
/// Matches the application's login path, which verifies with a
/// bcryptjs-compatible implementation.
pub const SEED_HASH_COST: u32 = 10;

/// Account role stored in the `users.role` enum column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator
    Admin,
    /// Regular rating user
    NormalUser,
    /// Owner of one or more stores
    StoreOwner,
}

impl Role {
    /// The enum literal as stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::NormalUser => "normal_user",
            Self::StoreOwner => "store_owner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account to seed.
#[derive(Debug, Clone)]
pub struct SeedUser {
    /// Display name
    pub name: String,
    /// Unique email, the idempotency key
    pub email: String,
    /// Plaintext credential, hashed before insertion
    pub password: String,
    /// Postal address
    pub address: String,
    /// Account role
    pub role: Role,
}

/// A store to seed, owned by a previously seeded user.
#[derive(Debug, Clone)]
pub struct SeedStore {
    /// Store name
    pub name: String,
    /// Unique contact email, the idempotency key
    pub email: String,
    /// Store address
    pub address: String,
    /// Email of the owning seed user, resolved to an id at insert time
    pub owner_email: String,
}

/// Row counts from a seed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Users inserted this run (existing emails are skipped)
    pub users_seeded: u64,
    /// Stores inserted this run (existing emails are skipped)
    pub stores_seeded: u64,
}

/// The ordered set of baseline rows inserted at initialization time.
#[derive(Debug, Clone, Default)]
pub struct SeedPlan {
    /// Users, inserted first so stores can resolve their owners
    pub users: Vec<SeedUser>,
    /// Stores, inserted after users
    pub stores: Vec<SeedStore>,
}

impl SeedPlan {
    /// The baseline plan: the administrator account plus demo rows.
    pub fn baseline() -> Self {
        Self {
            users: vec![
                SeedUser {
                    name: "System Administrator".to_string(),
                    email: ADMIN_EMAIL.to_string(),
                    password: "Admin@123".to_string(),
                    address: "System Administration Office".to_string(),
                    role: Role::Admin,
                },
                SeedUser {
                    name: "Sarah Wilson".to_string(),
                    email: "sarah@example.com".to_string(),
                    password: "Password@123".to_string(),
                    address: "456 Business Street, Commerce City".to_string(),
                    role: Role::StoreOwner,
                },
                SeedUser {
                    name: "Rahul Gupta".to_string(),
                    email: "rahul@example.com".to_string(),
                    password: "Password@123".to_string(),
                    address: "123 User Lane, Customer City".to_string(),
                    role: Role::NormalUser,
                },
            ],
            stores: vec![SeedStore {
                name: "TechMart Electronics".to_string(),
                email: "info@techmart.com".to_string(),
                address: "789 Tech Boulevard, Digital District".to_string(),
                owner_email: "sarah@example.com".to_string(),
            }],
        }
    }

    /// Inserts the plan's rows, skipping those whose emails already exist.
    ///
    /// # Errors
    /// Returns a seed error on any driver failure, or a configuration error
    /// if a store references an owner email absent from the database.
    pub(crate) async fn apply(&self, pool: &MySqlPool) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for user in &self.users {
            let hashed = hash_password(&user.password)?;
            let result = sqlx::query(
                "INSERT IGNORE INTO users (name, email, password, address, role) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(&hashed)
            .bind(&user.address)
            .bind(user.role.as_str())
            .execute(pool)
            .await
            .map_err(|e| BootstrapError::seed_failed(format!("inserting user {}", user.email), e))?;

            if result.rows_affected() > 0 {
                report.users_seeded += result.rows_affected();
                info!(email = %user.email, role = %user.role, "seeded user");
            } else {
                debug!(email = %user.email, "user already present, skipping");
            }
        }

        for store in &self.stores {
            let owner_id: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
                .bind(&store.owner_email)
                .fetch_optional(pool)
                .await
                .map_err(|e| {
                    BootstrapError::seed_failed(
                        format!("resolving owner {} for store {}", store.owner_email, store.email),
                        e,
                    )
                })?;

            let Some(owner_id) = owner_id else {
                return Err(BootstrapError::configuration(format!(
                    "seed store {} references unknown owner {}",
                    store.email, store.owner_email
                )));
            };

            let result = sqlx::query(
                "INSERT IGNORE INTO stores (name, email, address, owner_id) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&store.name)
            .bind(&store.email)
            .bind(&store.address)
            .bind(owner_id)
            .execute(pool)
            .await
            .map_err(|e| {
                BootstrapError::seed_failed(format!("inserting store {}", store.email), e)
            })?;

            if result.rows_affected() > 0 {
                report.stores_seeded += result.rows_affected();
                info!(email = %store.email, "seeded store");
            } else {
                debug!(email = %store.email, "store already present, skipping");
            }
        }

        Ok(report)
    }
}

/// Hashes a seed credential with bcrypt at [`SEED_HASH_COST`].
///
/// # Errors
/// Returns a hashing error if bcrypt rejects the input.
pub fn hash_password(plain: &str) -> Result<String> {
    bcrypt::hash(plain, SEED_HASH_COST)
        .map_err(|e| BootstrapError::hashing_failed("hashing seed credential", e))
}
