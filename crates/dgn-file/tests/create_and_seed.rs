use dgn_core::{Coord, Dimension, Feature, Geometry};
use dgn_file::{
    CreateOptions, DgnDriver, DgnError, LayerOptions, MetadataKey, OpenMode, METADATA_DOMAIN,
};
use std::path::Path;
use tempfile::TempDir;

const ALL_METADATA: [&str; 12] = [
    "APPLICATION=application",
    "TITLE=title",
    "SUBJECT=subject",
    "AUTHOR=author",
    "KEYWORDS=keywords",
    "TEMPLATE=template",
    "COMMENTS=comments",
    "LAST_SAVED_BY=last_saved_by",
    "REVISION_NUMBER=revision_number",
    "CATEGORY=category",
    "MANAGER=manager",
    "COMPANY=company",
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 带全部元数据和一个 2D 图层的种子文件
fn make_seed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("seed.dgn");
    let mut container = DgnDriver::new().create(&path, &ALL_METADATA).unwrap();
    let mut layer = container
        .create_layer("my_layer", &["DESCRIPTION=my_layer", "DIM=2"])
        .unwrap();
    let mut feature = Feature::new(Geometry::Point(Coord::xy(0.0, 1.0)));
    layer.create_feature(&mut feature).unwrap();
    container
        .create_layer("solid_layer", &["DESCRIPTION=solid", "DIM=3"])
        .unwrap();
    container.close().unwrap();
    path
}

fn open_read(path: &Path) -> dgn_file::Container {
    DgnDriver::new().open(path, OpenMode::ReadOnly).unwrap()
}

#[test]
fn metadata_list_matches_creation_options() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.dgn");

    DgnDriver::new()
        .create(&path, &ALL_METADATA)
        .unwrap()
        .close()
        .unwrap();

    let container = open_read(&path);
    assert_eq!(container.metadata_list(METADATA_DOMAIN), ALL_METADATA.to_vec());
    assert_eq!(container.metadata_domains(), vec![METADATA_DOMAIN]);
    assert_eq!(
        container.metadata_item("REVISION_NUMBER", METADATA_DOMAIN),
        Some("revision_number")
    );
}

#[test]
fn metadata_list_for_subset_keeps_fixed_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subset.dgn");

    // 乱序给出，读回时按固定顺序
    DgnDriver::new()
        .create(&path, &["company=acme", "Author=me", "TITLE="])
        .unwrap()
        .close()
        .unwrap();

    let container = open_read(&path);
    assert_eq!(
        container.metadata_list(METADATA_DOMAIN),
        vec!["AUTHOR=me", "COMPANY=acme"]
    );
    assert_eq!(container.metadata_item("TITLE", METADATA_DOMAIN), None);
}

#[test]
fn invalid_options_leave_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.dgn");

    for options in [&["COLOR=red"][..], &["TITLE"][..], &["TITLE=a", "TITLE=b"][..]] {
        let result = DgnDriver::new().create(&path, options);
        assert!(matches!(result, Err(DgnError::InvalidOption(_))));
        assert!(!path.exists());
    }
}

#[test]
fn create_refuses_existing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exists.dgn");
    DgnDriver::new()
        .create(&path, &["TITLE=original"])
        .unwrap()
        .close()
        .unwrap();

    let result = DgnDriver::new().create(&path, &["TITLE=replacement"]);
    assert!(matches!(result, Err(DgnError::AlreadyExists(_))));

    let container = open_read(&path);
    assert_eq!(container.metadata_item("TITLE", METADATA_DOMAIN), Some("original"));
}

#[test]
fn create_into_missing_directory_fails_with_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("x.dgn");

    let result = DgnDriver::new().create_with(&path, CreateOptions::new());
    assert!(matches!(result, Err(DgnError::WriteError { .. })));
    assert!(!path.exists());
}

#[test]
fn seed_reproduces_structure_without_features() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let seed = make_seed(&dir);
    let path = dir.path().join("from_seed.dgn");

    let options = format!("SEED={}", seed.display());
    DgnDriver::new()
        .create(&path, &[options])
        .unwrap()
        .close()
        .unwrap();

    let seed = open_read(&seed);
    let copy = open_read(&path);

    assert_eq!(copy.layer_count(), seed.layer_count());
    for (a, b) in seed.layers().zip(copy.layers()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.description(), b.description());
        assert_eq!(a.dimension(), b.dimension());
        assert_eq!(b.feature_count(), 0);
    }
    assert_eq!(copy.layer(0).unwrap().name(), "my_layer");
    assert_eq!(copy.layer(1).unwrap().dimension(), Dimension::Three);

    assert_eq!(
        copy.metadata_list(METADATA_DOMAIN),
        seed.metadata_list(METADATA_DOMAIN)
    );
    assert_eq!(copy.units(), seed.units());
    assert_eq!(copy.color_table(), seed.color_table());
    assert_ne!(copy.guid(), seed.guid());
}

#[test]
fn seed_with_title_override() {
    let dir = tempfile::tempdir().unwrap();
    let seed = make_seed(&dir);
    let path = dir.path().join("override.dgn");

    let options = CreateOptions::new()
        .with_seed(&seed)
        .with_metadata(MetadataKey::Title, "another_title");
    DgnDriver::new()
        .create_with(&path, options)
        .unwrap()
        .close()
        .unwrap();

    let container = open_read(&path);
    for key in MetadataKey::ALL {
        let expected = match key {
            MetadataKey::Title => "another_title".to_string(),
            other => other.as_str().to_ascii_lowercase(),
        };
        assert_eq!(
            container.metadata_item(key.as_str(), METADATA_DOMAIN),
            Some(expected.as_str()),
            "metadata key {}",
            key
        );
    }
}

#[test]
fn seed_then_new_layer_survives_reopen_in_update_mode() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let seed = make_seed(&dir);
    let path = dir.path().join("seeded_layer.dgn");

    let options = format!("SEED={}", seed.display());
    let mut container = DgnDriver::new().create(&path, &[options]).unwrap();
    let mut layer = container
        .create_layer_with("a_layer", LayerOptions::default())
        .unwrap();
    let mut feature = Feature::new(Geometry::from_wkt("POINT(2 3)").unwrap());
    layer.create_feature(&mut feature).unwrap();
    container.close().unwrap();

    let container = DgnDriver::new().open(&path, OpenMode::Update).unwrap();
    assert_eq!(container.layer(0).unwrap().name(), "a_layer");

    let layer = container.layer_by_name("a_layer").unwrap();
    assert_eq!(layer.feature_count(), 1);
    let features: Vec<_> = layer.features().collect();
    assert_eq!(features.len(), 1);
    assert_eq!(
        features[0].geometry.as_ref().map(Geometry::to_wkt).as_deref(),
        Some("POINT (2 3)")
    );
}

#[test]
fn missing_seed_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orphan.dgn");
    let seed = dir.path().join("does_not_exist.dgn");

    let options = CreateOptions::new().with_seed(&seed);
    let result = DgnDriver::new().create_with(&path, options);
    match result {
        Err(DgnError::SeedUnavailable { path: p, source }) => {
            assert_eq!(p, seed);
            assert!(matches!(*source, DgnError::NotFound(_)));
        }
        other => panic!("expected SeedUnavailable, got {:?}", other.map(|_| ())),
    }
    assert!(!path.exists());
}

#[test]
fn corrupt_seed_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from_corrupt.dgn");

    let garbage = dir.path().join("garbage_seed.dgn");
    std::fs::write(&garbage, b"not a design file").unwrap();
    let truncated = dir.path().join("truncated_seed.dgn");
    let full = std::fs::read(make_seed(&dir)).unwrap();
    std::fs::write(&truncated, &full[..full.len() / 2]).unwrap();

    for seed in [garbage, truncated] {
        let options = CreateOptions::new().with_seed(&seed);
        match DgnDriver::new().create_with(&path, options) {
            Err(DgnError::SeedUnavailable { path: p, source }) => {
                assert_eq!(p, seed);
                assert!(matches!(*source, DgnError::InvalidFormat(_)));
            }
            other => panic!("expected SeedUnavailable, got {:?}", other.map(|_| ())),
        }
        assert!(!path.exists());
    }
}

#[test]
fn close_reports_write_error_when_directory_vanishes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let path = sub.join("vanishing.dgn");

    let mut container = DgnDriver::new().create_with(&path, CreateOptions::new()).unwrap();
    let mut layer = container.layer_mut(0).unwrap();
    let mut feature = Feature::new(Geometry::Point(Coord::xy(1.0, 2.0)));
    layer.create_feature(&mut feature).unwrap();

    std::fs::remove_dir_all(&sub).unwrap();

    match container.close() {
        Err(DgnError::WriteError { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected WriteError, got {:?}", other),
    }
}
