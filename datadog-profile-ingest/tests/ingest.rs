// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{raw_profile, CapturingTable, SplitNormalizer, UnavailableTable};
use datadog_metastore::{InMemoryMetastore, MetadataStore};
use datadog_profile_ingest::{Ingester, IngestError, Label, ValidationError};
use std::sync::Arc;

fn setup() -> (Arc<InMemoryMetastore>, Arc<CapturingTable>, Ingester) {
    let metastore = Arc::new(InMemoryMetastore::new());
    let table = Arc::new(CapturingTable::default());
    let ingester = Ingester::new(
        metastore.clone(),
        Arc::new(SplitNormalizer),
        table.clone(),
    );
    (metastore, table, ingester)
}

fn series_labels() -> Vec<Label> {
    vec![
        Label::new("__name__", "process_cpu"),
        Label::new("instance", "10.0.0.1:9090"),
    ]
}

#[tokio::test]
async fn ingest_commits_rows_and_creates_metadata() {
    let (metastore, table, ingester) = setup();

    ingester.ingest(&series_labels(), &raw_profile()).await.unwrap();

    // One buffer per non-empty sample type.
    let inserted = table.inserted();
    assert_eq!(inserted.len(), 2);
    for buffer in &inserted {
        assert_eq!(buffer.len(), 2);
        let rows = buffer.rows();
        assert!(rows.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(rows[0].name, "process_cpu");
        assert_eq!(rows[0].labels.len(), 1);
        assert_eq!(rows[0].labels[0].name, "instance");
        assert_eq!(rows[0].stacktrace.len(), 2);
    }
    assert_eq!(inserted[0].rows()[0].sample_type, "samples");
    assert_eq!(inserted[1].rows()[0].sample_type, "cpu");

    // One mapping, three locations; only the two address-only ones are
    // eligible for symbolization.
    let locations = metastore.locations().unwrap();
    assert_eq!(locations.len(), 3);
    assert!(locations.iter().all(|l| l.mapping.is_some()));
    assert_eq!(metastore.unsymbolized_locations().unwrap().len(), 2);
    assert_eq!(metastore.functions().unwrap().len(), 1);
}

#[tokio::test]
async fn repeated_ingest_deduplicates_metadata() {
    let (metastore, table, ingester) = setup();

    ingester.ingest(&series_labels(), &raw_profile()).await.unwrap();
    ingester.ingest(&series_labels(), &raw_profile()).await.unwrap();

    // Rows are appended again, metadata is not.
    assert_eq!(table.inserted().len(), 4);
    assert_eq!(metastore.locations().unwrap().len(), 3);
    assert_eq!(metastore.functions().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_sample_types_are_skipped() {
    let (_, table, ingester) = setup();

    let mut profile = raw_profile();
    // Zero out the second sample type; its normalized profile comes back
    // with no samples and must be dropped without error.
    for sample in &mut profile.samples {
        sample.values[1] = 0;
    }

    ingester.ingest(&series_labels(), &profile).await.unwrap();
    let inserted = table.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].rows()[0].sample_type, "samples");
}

#[tokio::test]
async fn missing_name_label_is_rejected() {
    let (metastore, table, ingester) = setup();

    let labels = [Label::new("instance", "10.0.0.1:9090")];
    let err = ingester.ingest(&labels, &raw_profile()).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingNameLabel));
    assert!(table.inserted().is_empty());
    assert!(metastore.locations().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_label_names_are_rejected() {
    let (metastore, table, ingester) = setup();

    let labels = [
        Label::new("__name__", "process_cpu"),
        Label::new("n0", "v0"),
        Label::new("n0", "v0"),
    ];
    let err = ingester.ingest(&labels, &raw_profile()).await.unwrap_err();
    assert!(matches!(err, IngestError::DuplicateLabel(name) if name == "n0"));
    assert!(table.inserted().is_empty());
    assert!(metastore.locations().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_label_name_is_rejected() {
    let (_, table, ingester) = setup();

    let labels = [
        Label::new("__name__", "process_cpu"),
        Label::new("n0:n", "v0"),
    ];
    let err = ingester.ingest(&labels, &raw_profile()).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidLabelName(name) if name == "n0:n"));
    assert!(table.inserted().is_empty());
}

#[tokio::test]
async fn structural_errors_abort_before_any_store_write() {
    let (metastore, table, ingester) = setup();

    let mut profile = raw_profile();
    profile.string_table[0] = "oops".into();
    let err = ingester
        .ingest(&series_labels(), &profile)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Validation(ValidationError::StringTable { actual }) if actual == "oops"
    ));

    let mut profile = raw_profile();
    profile.locations[0].mapping_id = 5;
    let err = ingester
        .ingest(&series_labels(), &profile)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Validation(ValidationError::LocationMappingId {
            id: 1,
            mapping_id: 5
        })
    ));

    assert!(table.inserted().is_empty());
    assert!(metastore.locations().unwrap().is_empty());
    assert!(metastore.functions().unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_is_surfaced() {
    let metastore = Arc::new(InMemoryMetastore::new());
    let ingester = Ingester::new(
        metastore,
        Arc::new(SplitNormalizer),
        Arc::new(UnavailableTable),
    );

    let err = ingester
        .ingest(&series_labels(), &raw_profile())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Storage(_)));
    assert!(!err.is_invalid_argument());
}
