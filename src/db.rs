use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::models::{EmploymentType, NewPlacement, PlacementStatus, YearlyPlacementRecord};
use crate::placements;
use crate::service::StatsService;
use crate::store::{Document, DocumentStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// How an equality filter is compared. String values go through `->>` so the
/// expression indexes on `data ->> '<field>'` apply; anything else compares JSONB.
#[derive(Debug, PartialEq)]
enum FieldMatch<'a> {
    Text(&'a str),
    Json(&'a Value),
}

impl<'a> FieldMatch<'a> {
    const TEXT_SQL: &'static str = r#"
        SELECT id, data FROM placement_portal.documents
        WHERE collection = $1 AND data ->> $2 = $3
        ORDER BY id
        "#;

    const JSON_SQL: &'static str = r#"
        SELECT id, data FROM placement_portal.documents
        WHERE collection = $1 AND data -> $2 = $3
        ORDER BY id
        "#;

    fn for_value(value: &'a Value) -> Self {
        match value.as_str() {
            Some(text) => FieldMatch::Text(text),
            None => FieldMatch::Json(value),
        }
    }
}

/// Postgres-backed document store: one JSONB row per `(collection, id)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query(
            "SELECT data FROM placement_portal.documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<Json<Value>, _>("data").0))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO placement_portal.documents (collection, id, data, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (collection, id) DO UPDATE
            SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, data FROM placement_portal.documents WHERE collection = $1 ORDER BY id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get::<Json<Value>, _>("data").0,
            })
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let query = match FieldMatch::for_value(value) {
            FieldMatch::Text(text) => sqlx::query(FieldMatch::TEXT_SQL)
                .bind(collection)
                .bind(field)
                .bind(text.to_string()),
            FieldMatch::Json(value) => sqlx::query(FieldMatch::JSON_SQL)
                .bind(collection)
                .bind(field)
                .bind(Json(value.clone())),
        };

        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                data: row.get::<Json<Value>, _>("data").0,
            })
            .collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM placement_portal.documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Loads a few years of outcomes and off-campus offers for local dashboards.
pub async fn seed(service: &StatsService, store: &dyn DocumentStore) -> anyhow::Result<()> {
    let years = vec![
        YearlyPlacementRecord::new("2021-22", 90, 61, 12),
        YearlyPlacementRecord::new("2022-23", 100, 80, 10),
        YearlyPlacementRecord::new("2023-24", 50, 45, 5),
    ];

    for record in years {
        service.upsert(record).await?;
    }

    let offers = vec![
        (
            "Avery Lee",
            "avery.lee@dept.example.edu",
            "Globex",
            "Backend Engineer",
            Some(12.0),
            EmploymentType::FullTime,
            "Software",
            NaiveDate::from_ymd_opt(2024, 1, 15).context("invalid date")?,
            PlacementStatus::Approved,
        ),
        (
            "Jules Moreno",
            "jules.moreno@dept.example.edu",
            "Initech",
            "Data Analyst Intern",
            None,
            EmploymentType::Internship,
            "Analytics",
            NaiveDate::from_ymd_opt(2024, 2, 3).context("invalid date")?,
            PlacementStatus::Pending,
        ),
        (
            "Kiara Patel",
            "kiara.patel@dept.example.edu",
            "Globex",
            "Quant Developer",
            Some(22.5),
            EmploymentType::InternshipWithPpo,
            "Finance",
            NaiveDate::from_ymd_opt(2023, 11, 20).context("invalid date")?,
            PlacementStatus::Approved,
        ),
    ];

    for (name, email, company, role, package, employment_type, domain, offer_date, status) in
        offers
    {
        placements::create(
            store,
            NewPlacement {
                student_name: name.to_string(),
                student_email: email.to_string(),
                company: company.to_string(),
                role: role.to_string(),
                package,
                employment_type,
                domain: domain.to_string(),
                offer_date,
                status,
                document_url: None,
            },
        )
        .await?;
    }

    Ok(())
}
