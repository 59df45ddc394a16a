use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate;
use crate::error::{PortalError, StoreError, ValidationError};
use crate::models::{
    NewPlacement, OffCampusPlacement, PlacementInsights, PlacementStatus, PLACEMENTS_COLLECTION,
};
use crate::store::{Document, DocumentStore};

pub fn validate(new: &NewPlacement) -> Result<(), ValidationError> {
    if new.student_name.trim().is_empty() {
        return Err(ValidationError::MissingField("student name"));
    }
    if new.company.trim().is_empty() {
        return Err(ValidationError::MissingField("company"));
    }
    if new.role.trim().is_empty() {
        return Err(ValidationError::MissingField("role"));
    }
    if let Some(package) = new.package {
        if !package.is_finite() || package < 0.0 {
            return Err(ValidationError::InvalidPackage);
        }
    }
    if let Some(url) = &new.document_url {
        let url = url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ValidationError::InvalidDocumentUrl);
        }
    }
    Ok(())
}

fn decode(document: Document) -> Result<OffCampusPlacement, StoreError> {
    serde_json::from_value(document.data).map_err(|e| StoreError::Decode {
        collection: PLACEMENTS_COLLECTION.to_string(),
        id: document.id,
        message: e.to_string(),
    })
}

/// Decodes what it can; malformed documents are logged and left out.
fn decode_all(documents: Vec<Document>) -> Vec<OffCampusPlacement> {
    let mut placements: Vec<OffCampusPlacement> = documents
        .into_iter()
        .filter_map(|doc| match decode(doc) {
            Ok(placement) => Some(placement),
            Err(e) => {
                warn!(error = %e, "skipping malformed placement");
                None
            }
        })
        .collect();

    placements.sort_by(|a, b| {
        b.offer_date
            .cmp(&a.offer_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    placements
}

pub async fn create(
    store: &dyn DocumentStore,
    new: NewPlacement,
) -> Result<OffCampusPlacement, PortalError> {
    validate(&new)?;

    let placement = OffCampusPlacement {
        id: Uuid::new_v4(),
        student_name: new.student_name.trim().to_string(),
        student_email: new.student_email.trim().to_string(),
        company: new.company.trim().to_string(),
        role: new.role.trim().to_string(),
        package: new.package,
        employment_type: new.employment_type,
        domain: new.domain.trim().to_string(),
        offer_date: new.offer_date,
        status: new.status,
        document_url: new.document_url.map(|url| url.trim().to_string()),
        created_at: Utc::now(),
    };

    let id = placement.id.to_string();
    let data = serde_json::to_value(&placement).map_err(|e| StoreError::Decode {
        collection: PLACEMENTS_COLLECTION.to_string(),
        id: id.clone(),
        message: e.to_string(),
    })?;
    store.set(PLACEMENTS_COLLECTION, &id, data).await?;

    info!(id = %placement.id, company = %placement.company, "off-campus placement recorded");
    Ok(placement)
}

pub async fn get(
    store: &dyn DocumentStore,
    id: Uuid,
) -> Result<Option<OffCampusPlacement>, StoreError> {
    let id = id.to_string();
    match store.get(PLACEMENTS_COLLECTION, &id).await? {
        Some(data) => decode(Document { id, data }).map(Some),
        None => Ok(None),
    }
}

/// Newest offer first.
pub async fn list(store: &dyn DocumentStore) -> Result<Vec<OffCampusPlacement>, StoreError> {
    Ok(decode_all(store.list(PLACEMENTS_COLLECTION).await?))
}

pub async fn list_by_status(
    store: &dyn DocumentStore,
    status: PlacementStatus,
) -> Result<Vec<OffCampusPlacement>, StoreError> {
    let documents = store
        .query(
            PLACEMENTS_COLLECTION,
            "status",
            &Value::String(status.as_str().to_string()),
        )
        .await?;
    Ok(decode_all(documents))
}

pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> Result<bool, StoreError> {
    let removed = store
        .delete(PLACEMENTS_COLLECTION, &id.to_string())
        .await?;
    if removed {
        info!(%id, "off-campus placement deleted");
    }
    Ok(removed)
}

pub async fn insights(store: &dyn DocumentStore) -> Result<PlacementInsights, StoreError> {
    let placements = list(store).await?;
    Ok(aggregate::placement_insights(&placements))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::models::EmploymentType;
    use crate::store::MemoryStore;

    fn offer(company: &str, package: Option<f64>, day: u32) -> NewPlacement {
        NewPlacement {
            student_name: "Avery Lee".to_string(),
            student_email: "avery@example.edu".to_string(),
            company: company.to_string(),
            role: "Engineer".to_string(),
            package,
            employment_type: EmploymentType::FullTime,
            domain: "Software".to_string(),
            offer_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            status: PlacementStatus::Pending,
            document_url: Some("https://files.example.edu/offer.pdf".to_string()),
        }
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let mut new = offer("Acme", Some(8.0), 1);
        new.company = "  ".to_string();
        assert_eq!(validate(&new), Err(ValidationError::MissingField("company")));

        let mut new = offer("Acme", Some(-1.0), 1);
        assert_eq!(validate(&new), Err(ValidationError::InvalidPackage));

        new.package = None;
        new.document_url = Some("ftp://files/offer.pdf".to_string());
        assert_eq!(validate(&new), Err(ValidationError::InvalidDocumentUrl));
    }

    #[tokio::test]
    async fn create_get_delete_round() {
        let store = MemoryStore::new();
        let created = create(&store, offer(" Acme ", Some(8.0), 1)).await.unwrap();
        assert_eq!(created.company, "Acme");

        let fetched = get(&store, created.id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        assert!(delete(&store, created.id).await.unwrap());
        assert_eq!(get(&store, created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_orders_newest_offer_first_and_filters_status() {
        let store = MemoryStore::new();
        create(&store, offer("Acme", Some(8.0), 1)).await.unwrap();
        let mut approved = offer("Globex", None, 9);
        approved.status = PlacementStatus::Approved;
        create(&store, approved).await.unwrap();

        let all = list(&store).await.unwrap();
        assert_eq!(all[0].company, "Globex");
        assert_eq!(all[1].company, "Acme");

        let only_approved = list_by_status(&store, PlacementStatus::Approved)
            .await
            .unwrap();
        assert_eq!(only_approved.len(), 1);
        assert_eq!(only_approved[0].company, "Globex");
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped() {
        let store = MemoryStore::new();
        create(&store, offer("Acme", Some(8.0), 1)).await.unwrap();
        store
            .set(PLACEMENTS_COLLECTION, "broken", json!({"company": 42}))
            .await
            .unwrap();

        assert_eq!(list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insights_bucket_packages_and_rank_companies() {
        let store = MemoryStore::new();
        create(&store, offer("Acme", Some(8.0), 1)).await.unwrap();
        create(&store, offer("Acme", None, 2)).await.unwrap();
        create(&store, offer("Globex", Some(21.0), 3)).await.unwrap();

        let insights = insights(&store).await.unwrap();
        assert_eq!(insights.top_companies[0].company, "Acme");
        assert_eq!(insights.top_companies[0].count, 2);
        assert_eq!(
            insights
                .package_ranges
                .iter()
                .map(|r| r.count)
                .sum::<usize>(),
            3
        );
        assert_eq!(insights.employment_types[0].name, "Full-time");
        assert_eq!(insights.top_domains[0].count, 3);
    }
}
