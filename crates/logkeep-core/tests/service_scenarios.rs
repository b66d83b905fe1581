//! End-to-end scenarios for the log service over the in-memory store.

use std::sync::Arc;

use logkeep_core::{
    DeleteOutcome, DeleteRequest, IngestOutcome, LogError, LogFilter, LogRecordStore, LogRow,
    LogService, MemoryLogStore, INGESTION_ERROR_CATEGORY, INITIAL_ID,
};
use serde_json::{json, Value};

fn new_service() -> LogService<Arc<MemoryLogStore>> {
    LogService::new(Arc::new(MemoryLogStore::new())).with_service_name("logging-service")
}

fn test_logs() -> Vec<Value> {
    vec![
        json!({
            "logLevel": "INFO",
            "logCategory": "system",
            "createdTimestamp": "2024-06-17T08:15:23Z",
            "loggedAtTimestamp": "2024-06-17T08:16:10Z",
            "messageId": "a1e1b2c3-1111-4d5e-8f9a-1b2c3d4e5f01",
            "publishingServiceName": "wfh-minio",
            "consumingServiceName": "rabbitmq",
            "message": "File uploaded successfully."
        }),
        json!({
            "logLevel": "ERROR",
            "logCategory": "api",
            "createdTimestamp": "2024-06-18T10:22:45Z",
            "messageId": "a1e1b2c3-2222-4d5e-8f9a-1b2c3d4e5f02",
            "publishingServiceName": "workhorse-api",
            "consumingServiceName": "wfh-verdaccio",
            "message": "Failed to fetch user data."
        }),
        json!({
            "logLevel": "ERROR",
            "logCategory": "api",
            "publishingServiceName": "workhorse-api",
            "consumingServiceName": "rabbitmq",
            "message": "API request timed out."
        }),
        json!({
            "logLevel": "INFO",
            "logCategory": "api",
            "publishingServiceName": "workhorse-api",
            "message": "API request completed."
        }),
    ]
}

async fn seeded_service() -> LogService<Arc<MemoryLogStore>> {
    let service = new_service();
    for payload in test_logs() {
        service.create(&payload).await.expect("seed record");
    }
    service
}

#[tokio::test]
async fn create_then_fetch() {
    let service = new_service();
    let payload = json!({"logLevel": "INFO", "logCategory": "system", "message": "File uploaded."});

    let created = service.create(&payload).await.expect("create");
    let id = created.id.expect("store assigns an id");

    let fetched = service.get_by_id(id).await.expect("fetch");
    assert_eq!(fetched, created);
    assert_eq!(fetched.log_level, "INFO");
    assert_eq!(fetched.log_category, "system");
    assert_eq!(fetched.message, "File uploaded.");
}

#[tokio::test]
async fn created_record_keeps_every_supplied_field() {
    let service = new_service();
    let payload = test_logs().remove(0);

    let created = service.create(&payload).await.expect("create");
    let mut echoed = serde_json::to_value(&created).expect("serialize");
    if let Some(map) = echoed.as_object_mut() {
        map.remove("id");
    }

    for (key, value) in payload.as_object().expect("object") {
        let expected = value.as_str().expect("string field");
        let actual = echoed[key].as_str().expect("string field");
        if key.ends_with("Timestamp") {
            let expected = chrono::DateTime::parse_from_rfc3339(expected).expect("timestamp");
            let actual = chrono::DateTime::parse_from_rfc3339(actual).expect("timestamp");
            assert_eq!(expected, actual, "field {key}");
        } else {
            assert_eq!(expected, actual, "field {key}");
        }
    }
}

#[tokio::test]
async fn filtered_list_by_level() {
    let service = seeded_service().await;

    let errors = service
        .list(&LogFilter::from_pairs([("log_level", "ERROR")]).expect("filter"))
        .await
        .expect("list");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|r| r.log_level == "ERROR"));
}

#[tokio::test]
async fn filtered_list_by_several_fields() {
    let service = seeded_service().await;

    let by_publisher = service
        .list(&LogFilter::new().with_publishing_service("workhorse-api"))
        .await
        .expect("list");
    assert_eq!(by_publisher.len(), 3);

    let by_consumer = service
        .list(&LogFilter::new().with_consuming_service("rabbitmq"))
        .await
        .expect("list");
    assert_eq!(by_consumer.len(), 2);

    let substring = service
        .list(&LogFilter::new().with_message_containing("API request"))
        .await
        .expect("list");
    assert_eq!(substring.len(), 2);

    let combined = service
        .list(
            &LogFilter::new()
                .with_level("ERROR")
                .with_message_containing("API request"),
        )
        .await
        .expect("list");
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].message, "API request timed out.");

    let nothing = service
        .list(&LogFilter::new().with_category("billing"))
        .await
        .expect("list");
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn unfiltered_list_returns_everything() {
    let service = seeded_service().await;
    let all = service.list(&LogFilter::new()).await.expect("list");
    assert_eq!(all.len(), test_logs().len());
}

#[tokio::test]
async fn not_found_for_well_formed_and_malformed_ids() {
    let service = seeded_service().await;

    for id in ["999999", "-1", "crap-id", "1.5"] {
        match service.get_by_id(id).await {
            Err(LogError::NotFound(key)) => assert_eq!(key, id),
            other => panic!("expected NotFound for {id}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn delete_modes() {
    let service = seeded_service().await;

    assert!(matches!(
        service.delete(DeleteRequest::default()).await,
        Err(LogError::InvalidRequest(_))
    ));
    assert!(matches!(
        service.delete(DeleteRequest::range(3, 3)).await,
        Err(LogError::InvalidRequest(_))
    ));

    assert_eq!(
        service.delete(DeleteRequest::single(1)).await.expect("delete"),
        DeleteOutcome::Deleted(1)
    );
    assert_eq!(
        service.delete(DeleteRequest::range(2, 3)).await.expect("delete"),
        DeleteOutcome::Deleted(2)
    );

    let remaining = service.list(&LogFilter::new()).await.expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, Some(4));
}

#[tokio::test]
async fn truncate_then_create_restarts_identity() {
    let service = seeded_service().await;

    let outcome = service
        .delete(DeleteRequest::truncate_all())
        .await
        .expect("truncate");
    assert_eq!(outcome, DeleteOutcome::Truncated);
    assert!(service.list(&LogFilter::new()).await.expect("list").is_empty());

    let next = service
        .create(&json!({"logLevel": "INFO", "logCategory": "system", "message": "again"}))
        .await
        .expect("create");
    assert_eq!(next.id, Some(INITIAL_ID));
}

#[tokio::test]
async fn ingestion_never_loses_a_message() {
    let service = new_service();

    let outcomes = [
        service
            .ingest(br#"{"logLevel":"INFO","logCategory":"queue","message":"hello"}"#)
            .await,
        service.ingest(b"not even json").await,
        service.ingest(br#"{"logLevel":"INFO","messageId":"bad-uuid"}"#).await,
    ];
    assert!(outcomes[0].is_stored());
    assert!(matches!(outcomes[1], IngestOutcome::FailureLogged { .. }));
    assert!(matches!(outcomes[2], IngestOutcome::FailureLogged { .. }));

    let diagnostics = service
        .list(&LogFilter::new().with_category(INGESTION_ERROR_CATEGORY))
        .await
        .expect("list");
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|r| r.log_level == "ERROR"));
    assert!(diagnostics[1].message.contains("Context: {\"logLevel\""));
}

/// A store whose every call fails, for checking error propagation.
struct UnavailableStore;

impl LogRecordStore for UnavailableStore {
    async fn insert(&self, _row: LogRow) -> logkeep_core::Result<LogRow> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn select(&self, _filter: &LogFilter) -> logkeep_core::Result<Vec<LogRow>> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn find(&self, _id: i64) -> logkeep_core::Result<Option<LogRow>> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn delete_id(&self, _id: i64) -> logkeep_core::Result<u64> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn delete_range(&self, _start: i64, _end: i64) -> logkeep_core::Result<u64> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn truncate(&self) -> logkeep_core::Result<()> {
        Err(sqlx::Error::PoolClosed.into())
    }
}

#[tokio::test]
async fn store_errors_propagate_unchanged() {
    let service = LogService::new(UnavailableStore);

    assert!(matches!(
        service.list(&LogFilter::new()).await,
        Err(LogError::Database(sqlx::Error::PoolClosed))
    ));
    assert!(matches!(
        service.get_by_id(1).await,
        Err(LogError::Database(sqlx::Error::PoolClosed))
    ));
    assert!(matches!(
        service.delete(DeleteRequest::single(1)).await,
        Err(LogError::Database(sqlx::Error::PoolClosed))
    ));

    // Argument and validation errors are raised before the store is touched.
    assert!(matches!(
        service.delete(DeleteRequest::range(2, 1)).await,
        Err(LogError::InvalidRequest(_))
    ));
    assert!(matches!(
        service.create(&json!({})).await,
        Err(LogError::Validation(_))
    ));
    // A malformed id never reaches the store either.
    assert!(matches!(
        service.get_by_id("abc").await,
        Err(LogError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_diagnostic_write_is_not_propagated() {
    let service = LogService::new(UnavailableStore);
    let outcome = service
        .ingest(br#"{"logLevel":"INFO","logCategory":"queue","message":"hello"}"#)
        .await;
    match outcome {
        IngestOutcome::Dropped {
            error,
            diagnostic_error,
        } => {
            assert!(matches!(error, LogError::Database(_)));
            assert!(matches!(diagnostic_error, LogError::Database(_)));
        }
        other => panic!("expected Dropped, got {other:?}"),
    }
}
