use chrono::{Local, NaiveDateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use targetledger_core::db;
use targetledger_core::db::DbPool;
use targetledger_core::records::{CheckIn, Client, Lead, Quotation};
use targetledger_core::schema::{check_ins, clients, leads, quotations};
use targetledger_core::users::{NewUser, User, UserRepository, UserRepositoryTrait};

pub fn get_test_db_path(test_id: &str) -> String {
    let now = Local::now();

    now.format(&format!("./tests/output/%Y%m%d/%H%M%S-{}/", test_id))
        .to_string()
}

/// Creates a fresh on-disk database for one test and runs the migrations
pub fn setup_pool(test_id: &str) -> Arc<DbPool> {
    let dir = get_test_db_path(test_id);

    let db_path = db::init(&dir).expect("Failed to initialize database");
    let pool = db::create_pool(&db_path).expect("Failed to create database pool");
    db::run_migrations(&pool).expect("Failed to run migrations");

    pool
}

pub fn seed_user(pool: &Arc<DbPool>, user_id: &str, company_id: &str) -> User {
    let now = Utc::now().naive_utc();
    let repo = UserRepository::new(pool.clone());
    repo.create(NewUser {
        id: Some(user_id.to_string()),
        name: format!("User {}", user_id),
        email: format!("{}@example.com", user_id),
        company_id: company_id.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    })
    .expect("Failed to seed user")
}

pub fn seed_quotation(
    pool: &Arc<DbPool>,
    user_id: &str,
    company_id: &str,
    status: &str,
    total_amount: f64,
    created_at: NaiveDateTime,
) -> Quotation {
    let mut conn = pool.get().expect("Failed to get connection");
    let quotation = Quotation {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        company_id: company_id.to_string(),
        status: status.to_string(),
        total_amount,
        currency: "EUR".to_string(),
        created_at,
        updated_at: created_at,
    };

    diesel::insert_into(quotations::table)
        .values(&quotation)
        .execute(&mut conn)
        .expect("Failed to seed quotation");

    quotation
}

pub fn seed_lead(
    pool: &Arc<DbPool>,
    user_id: &str,
    company_id: &str,
    created_at: NaiveDateTime,
) -> Lead {
    let mut conn = pool.get().expect("Failed to get connection");
    let lead = Lead {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        company_id: company_id.to_string(),
        name: "Prospect".to_string(),
        created_at,
    };

    diesel::insert_into(leads::table)
        .values(&lead)
        .execute(&mut conn)
        .expect("Failed to seed lead");

    lead
}

#[allow(dead_code)]
pub fn seed_client(
    pool: &Arc<DbPool>,
    user_id: &str,
    company_id: &str,
    created_at: NaiveDateTime,
) -> Client {
    let mut conn = pool.get().expect("Failed to get connection");
    let client = Client {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        company_id: company_id.to_string(),
        name: "Customer".to_string(),
        created_at,
    };

    diesel::insert_into(clients::table)
        .values(&client)
        .execute(&mut conn)
        .expect("Failed to seed client");

    client
}

#[allow(dead_code)]
pub fn seed_check_in(
    pool: &Arc<DbPool>,
    user_id: &str,
    company_id: &str,
    created_at: NaiveDateTime,
) -> CheckIn {
    let mut conn = pool.get().expect("Failed to get connection");
    let check_in = CheckIn {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        company_id: company_id.to_string(),
        location: None,
        created_at,
    };

    diesel::insert_into(check_ins::table)
        .values(&check_in)
        .execute(&mut conn)
        .expect("Failed to seed check-in");

    check_in
}
