mod common;

use common::{MemoryStore, Product};
use crowdin_sync_core::config::ContentSyncSettings;
use crowdin_sync_core::content::{ContentPipeline, ContentResource, Field};
use crowdin_sync_core::contract::{
    Approval, MockTranslationService, SourceString, Translation,
};
use crowdin_sync_core::error::SyncError;

fn settings(approved_only: bool) -> ContentSyncSettings {
    ContentSyncSettings {
        project_id: 9,
        branch_id: Some(3),
        approved_only,
        chunk_size: 2,
    }
}

fn expect_languages(service: &mut MockTranslationService, targets: &[&'static str]) {
    let targets: Vec<&'static str> = targets.to_vec();
    service
        .expect_project_languages()
        .withf(|project_id| *project_id == 9)
        .times(1)
        .returning(move |_| Ok(common::languages("en", &targets)));
}

fn source_string(id: i64, identifier: &str, text: &str) -> SourceString {
    SourceString {
        id,
        identifier: identifier.to_string(),
        text: text.to_string(),
        context: None,
    }
}

fn translation(id: i64, text: &str, rating: i64) -> Translation {
    Translation {
        id,
        text: text.to_string(),
        rating,
    }
}

#[tokio::test]
async fn test_upload_creates_missing_strings_across_pages() {
    let store = MemoryStore::new(vec![
        Product::new(1, "Chair"),
        Product::new(2, "Table"),
        Product::new(3, "Lamp"),
        Product::new(4, ""),
    ]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .times(3)
        .returning(|_, _| Ok(vec![]));
    service
        .expect_create_string()
        .withf(|project_id, req| {
            *project_id == 9
                && req.branch_id == Some(3)
                && req.context.is_none()
                && matches!(
                    (req.identifier.as_str(), req.text.as_str()),
                    ("products.title[1]", "Chair")
                        | ("products.title[2]", "Table")
                        | ("products.title[3]", "Lamp")
                )
        })
        .times(3)
        .returning(|_, req| Ok(source_string(1, &req.identifier, &req.text)));

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    assert_eq!(report.created, 3, "empty source values are skipped");
}

#[tokio::test]
async fn test_upload_unchanged_text_issues_no_update() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .withf(|_, identifier| identifier == "products.title[1]")
        .times(1)
        .returning(|_, id| Ok(vec![source_string(11, id, "Chair")]));
    service.expect_update_string().never();
    service.expect_create_string().never();

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    assert_eq!(report.unchanged, 1);
    assert_eq!(report.updated, 0);
}

#[tokio::test]
async fn test_upload_updates_changed_text_and_context() {
    let mut chair = Product::new(1, "Armchair");
    chair.note = Some("furniture".into());
    let store = MemoryStore::new(vec![chair]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .returning(|_, id| Ok(vec![source_string(11, id, "Armchair")]));
    service
        .expect_update_string()
        .withf(|_, req| {
            req.string_id == 11
                && req.text == "Armchair"
                && req.context.as_deref() == Some("furniture")
        })
        .times(1)
        .returning(|_, req| {
            Ok(SourceString {
                id: req.string_id,
                identifier: "products.title[1]".into(),
                text: req.text,
                context: req.context,
            })
        });

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    assert_eq!(report.updated, 1, "a context change alone triggers an update");
}

#[tokio::test]
async fn test_upload_leaves_ambiguous_identifiers_untouched() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service.expect_find_strings().returning(|_, id| {
        Ok(vec![
            source_string(11, id, "Old chair"),
            source_string(12, id, "Older chair"),
        ])
    });
    service.expect_update_string().never();
    service.expect_create_string().never();

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    assert_eq!(report.ambiguous, 1);
}

#[tokio::test]
async fn test_download_selects_highest_rated_translation() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .returning(|_, id| Ok(vec![source_string(11, id, "Chair")]));
    service
        .expect_list_translations()
        .withf(|_, string_id, language| *string_id == 11 && language == "de")
        .times(1)
        .returning(|_, _, _| {
            Ok(vec![
                translation(1, "Sessel", 3),
                translation(2, "Stuhl", 7),
                translation(3, "Hocker", 5),
            ])
        });

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .download_content(&store, &resource)
        .await
        .expect("download succeeds");

    assert_eq!(report.applied, 1);
    assert_eq!(store.get(1).title.get("de").map(String::as_str), Some("Stuhl"));
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn test_download_rating_ties_keep_service_order() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .returning(|_, id| Ok(vec![source_string(11, id, "Chair")]));
    service.expect_list_translations().returning(|_, _, _| {
        Ok(vec![translation(1, "Stuhl", 4), translation(2, "Sessel", 4)])
    });

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    pipeline
        .download_content(&store, &resource)
        .await
        .expect("download succeeds");

    assert_eq!(store.get(1).title.get("de").map(String::as_str), Some("Stuhl"));
}

#[tokio::test]
async fn test_download_approved_only_without_approval_leaves_field_untouched() {
    let mut chair = Product::new(1, "Chair");
    chair.title.insert("de".into(), "Stuhl (alt)".into());
    let store = MemoryStore::new(vec![chair]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de", "fr"]);
    service
        .expect_find_strings()
        .returning(|_, id| Ok(vec![source_string(11, id, "Chair")]));
    service
        .expect_list_approvals()
        .times(2)
        .returning(|_, _, language| {
            if language == "fr" {
                Ok(vec![Approval {
                    id: 1,
                    translation_id: 501,
                }])
            } else {
                Ok(vec![])
            }
        });
    service
        .expect_get_translation()
        .withf(|_, translation_id| *translation_id == 501)
        .times(1)
        .returning(|_, id| Ok(translation(id, "Chaise", 0)));
    service.expect_list_translations().never();

    let pipeline = ContentPipeline::open(&service, settings(true))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields("products", vec![Field::direct("title")]);
    let report = pipeline
        .download_content(&store, &resource)
        .await
        .expect("download succeeds");

    let chair = store.get(1);
    assert_eq!(chair.title.get("de").map(String::as_str), Some("Stuhl (alt)"));
    assert_eq!(chair.title.get("fr").map(String::as_str), Some("Chaise"));
    assert_eq!(report.applied, 1);
}

#[tokio::test]
async fn test_download_skips_unresolved_identifiers_but_still_saves() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service.expect_find_strings().returning(|_, id| {
        if id.starts_with("products.title") {
            Ok(vec![])
        } else {
            Ok(vec![source_string(1, id, "a"), source_string(2, id, "b")])
        }
    });
    service.expect_list_translations().never();
    service.expect_list_approvals().never();

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields(
        "products",
        vec![Field::direct("title"), Field::direct("body")],
    );
    let report = pipeline
        .download_content(&store, &resource)
        .await
        .expect("download succeeds");

    assert_eq!(report.unresolved, 2);
    assert_eq!(report.saved, 1);
    assert_eq!(store.get(1), Product::new(1, "Chair"));
}

#[tokio::test]
async fn test_transformed_fields_route_through_their_hooks() {
    let mut chair = Product::new(1, "Chair");
    chair.body.insert("en".into(), "  padded  ".into());
    let store = MemoryStore::new(vec![chair]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service.expect_find_strings().returning(|_, _| Ok(vec![]));
    service
        .expect_create_string()
        .withf(|_, req| req.identifier == "products.body[1]" && req.text == "padded")
        .times(1)
        .returning(|_, req| Ok(source_string(21, &req.identifier, &req.text)));

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::with_fields(
        "products",
        vec![Field::transformed(
            "body",
            |row: &Product, language: &str| row.body.get(language).map(|s| s.trim().to_string()),
            |row: &mut Product, language: &str, text: String| {
                row.body.insert(language.to_string(), format!("[{text}]"));
            },
        )],
    );
    pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    let mut download = MockTranslationService::new();
    expect_languages(&mut download, &["de"]);
    download
        .expect_find_strings()
        .returning(|_, id| Ok(vec![source_string(21, id, "padded")]));
    download
        .expect_list_translations()
        .returning(|_, _, _| Ok(vec![translation(1, "gepolstert", 1)]));

    let pipeline = ContentPipeline::open(&download, settings(false))
        .await
        .expect("pipeline opens");
    pipeline
        .download_content(&store, &resource)
        .await
        .expect("download succeeds");

    assert_eq!(
        store.get(1).body.get("de").map(String::as_str),
        Some("[gepolstert]")
    );
}

#[tokio::test]
async fn test_auto_fields_require_translatable_records() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service.expect_find_strings().never();

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::<Product>::auto("products");
    let result = pipeline.upload_content(&store, &resource).await;

    match result {
        Err(SyncError::NotTranslatable(record_type)) => assert_eq!(record_type, "Product"),
        other => panic!("expected NotTranslatable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auto_fields_use_declared_translatable_fields() {
    let store = MemoryStore::new(vec![Product::new(1, "Chair")]).translatable(&["title"]);

    let mut service = MockTranslationService::new();
    expect_languages(&mut service, &["de"]);
    service
        .expect_find_strings()
        .withf(|_, id| id == "products.title[1]")
        .times(1)
        .returning(|_, _| Ok(vec![]));
    service
        .expect_create_string()
        .times(1)
        .returning(|_, req| Ok(source_string(1, &req.identifier, &req.text)));

    let pipeline = ContentPipeline::open(&service, settings(false))
        .await
        .expect("pipeline opens");
    let resource = ContentResource::<Product>::auto("products")
        .with_context(|row: &Product| Some(format!("Product #{}", row.id)));
    let report = pipeline
        .upload_content(&store, &resource)
        .await
        .expect("upload succeeds");

    assert_eq!(report.created, 1);
}
