mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{catalog, deadline, message, FakeOrigin};
use flighthours_api::error::DomainError;
use flighthours_api::messages::status::CODE_STATUS;
use flighthours_api::messages::{codes, MessageCache, MessageType};
use flighthours_api::middleware::ResponseHandler;

#[tokio::test]
async fn concurrent_misses_agree_on_one_entry() {
    let mut rows = catalog();
    let mut hidden = message("MOD_X_LATE_00001", MessageType::Warning, "late ${0}");
    hidden.active = false;
    rows.push(hidden);

    let origin = FakeOrigin::new(rows);
    *origin.lookup_delay.lock().unwrap() = Some(Duration::from_millis(20));
    let cache = Arc::new(MessageCache::new(origin.clone()));
    cache.reload(deadline()).await.unwrap();

    let lookups: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(deadline(), "MOD_X_LATE_00001").await })
        })
        .collect();

    let mut found = Vec::new();
    for lookup in lookups {
        found.push(lookup.await.unwrap().expect("hydrated on miss"));
    }

    let first = &found[0];
    assert!(found.iter().all(|m| Arc::ptr_eq(m, first)));
    assert_eq!(first.content, "late ${0}");

    // Later reads are served from the map.
    let calls = origin.by_code_calls.load(Ordering::SeqCst);
    cache.get(deadline(), "MOD_X_LATE_00001").await.unwrap();
    assert_eq!(origin.by_code_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_lose_entries_during_reload() {
    let v1 = catalog();
    let v2: Vec<_> = catalog()
        .into_iter()
        .map(|mut m| {
            m.content = format!("{} (v2)", m.content);
            m
        })
        .collect();

    let origin = FakeOrigin::new(v1.clone());
    let cache = Arc::new(MessageCache::new(origin.clone()));
    cache.reload(deadline()).await.unwrap();

    let reloader = {
        let cache = Arc::clone(&cache);
        let origin = origin.clone();
        tokio::spawn(async move {
            for round in 0..50 {
                origin.replace(if round % 2 == 0 { v2.clone() } else { v1.clone() });
                cache.reload(deadline()).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for _ in 0..200 {
                    for code in [codes::USER_REGISTERED, codes::USER_DUPLICATE, codes::GEN_TIMEOUT] {
                        let message = cache.get(deadline(), code).await.expect("code present in every version");
                        assert_eq!(message.code, code);
                    }
                }
            })
        })
        .collect();

    reloader.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(origin.by_code_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_mapped_code_keeps_its_status_without_catalog_rows() {
    let cache = MessageCache::new(FakeOrigin::new(Vec::new()));

    for (code, status) in CODE_STATUS.iter() {
        assert_eq!(cache.http_status(deadline(), code).await, *status, "{}", code);
    }
}

#[tokio::test]
async fn unmapped_codes_fall_back_to_message_type() {
    let origin = FakeOrigin::new(vec![
        message("MOD_X_WARN_00001", MessageType::Warning, "careful"),
        message("MOD_X_ERR_00002", MessageType::Error, "broken"),
    ]);
    let cache = MessageCache::new(origin);
    cache.reload(deadline()).await.unwrap();

    assert_eq!(cache.http_status(deadline(), "MOD_X_WARN_00001").await, 200);
    assert_eq!(cache.http_status(deadline(), "MOD_X_ERR_00002").await, 500);
    assert_eq!(cache.http_status(deadline(), "MOD_X_NOWHERE_00003").await, 500);
}

#[tokio::test]
async fn missing_catalog_row_still_yields_mapped_status() {
    let handler = ResponseHandler::new(Arc::new(MessageCache::new(FakeOrigin::new(Vec::new()))));

    let (status, envelope) = handler.error(deadline(), &DomainError::DuplicateUser).await;

    assert_eq!(status.as_u16(), 409);
    assert!(!envelope.success);
    assert_eq!(envelope.code.as_deref(), Some(codes::USER_DUPLICATE));
    assert_eq!(envelope.message.as_deref(), Some("Unknown error"));
}

#[tokio::test]
async fn rendered_error_carries_parameters() {
    let cache = Arc::new(MessageCache::new(FakeOrigin::new(catalog())));
    cache.reload(deadline()).await.unwrap();
    let handler = ResponseHandler::new(cache);

    let err = DomainError::InvalidFields(vec!["name".into(), "bp".into()]);
    let (status, envelope) = handler.error(deadline(), &err).await;

    assert_eq!(status.as_u16(), 400);
    assert_eq!(envelope.message.as_deref(), Some("Invalid fields: name, bp"));
}
