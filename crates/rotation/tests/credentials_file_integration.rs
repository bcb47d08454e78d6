//! Integration tests for the credentials file store
//!
//! Real files in a temp directory: preservation of unrelated content,
//! atomic replacement, permissions and concurrent writers.

use std::sync::Arc;

use keyrot_rotation::core::{CredentialPair, PairId, StoreError};
use keyrot_rotation::store::CredentialsFile;
use keyrot_rotation::traits::PairSink;
use keyrot_rotation::SecretString;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::task::JoinSet;

const ORIGINAL: &str = "\
# work laptop
[default]
aws_access_key_id = AKIAOLDDEFAULT
aws_secret_access_key = old-default-secret
region = eu-central-1

; ci user
[ci]
aws_access_key_id = AKIACI
aws_secret_access_key = ci-secret

[sso]
sso_start_url = https://example.awsapps.com/start
";

fn setup(content: &str) -> (TempDir, CredentialsFile) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(&path, content).unwrap();
    let file = CredentialsFile::new(path);
    (dir, file)
}

fn created(id: &str, secret: &str) -> CredentialPair {
    CredentialPair::created(PairId::new(id).unwrap(), SecretString::new(secret))
}

#[tokio::test]
async fn test_replace_preserves_everything_else() {
    let (_dir, file) = setup(ORIGINAL);

    file.persist("default", &created("AKIANEWDEFAULT", "new-default-secret"))
        .await
        .unwrap();

    let expected = ORIGINAL
        .replace("AKIAOLDDEFAULT", "AKIANEWDEFAULT")
        .replace("old-default-secret", "new-default-secret");
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), expected);
}

#[tokio::test]
async fn test_reload_sees_new_record() {
    let (_dir, file) = setup(ORIGINAL);

    file.persist("ci", &created("AKIACINEW", "ci-new")).await.unwrap();

    let record = file.load().await.unwrap().local_record("ci").unwrap();
    assert_eq!(record.pair_id.as_str(), "AKIACINEW");
    record.secret.expose_secret(|s| assert_eq!(s, "ci-new"));
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let (dir, file) = setup(ORIGINAL);

    file.persist("default", &created("AKIANEW", "secret")).await.unwrap();

    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        assert!(!name.contains(".tmp."), "found temp file: {name}");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_rewritten_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, file) = setup(ORIGINAL);
    file.persist("default", &created("AKIANEW", "secret")).await.unwrap();

    let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_unknown_profile_leaves_file_untouched() {
    let (_dir, file) = setup(ORIGINAL);

    let err = file
        .persist("missing", &created("AKIANEW", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::ProfileNotFound { .. }));
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), ORIGINAL);
}

#[tokio::test]
async fn test_malformed_file_is_reported_with_line() {
    let (_dir, file) = setup("[default]\naws_access_key_id = AKIA\n[broken\n");

    match file.load().await {
        Err(StoreError::Parse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_file_fails_write() {
    let dir = TempDir::new().unwrap();
    let file = CredentialsFile::new(dir.path().join("absent"));

    let err = file
        .persist("default", &created("AKIANEW", "secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Read { .. }));
}

#[tokio::test]
async fn test_concurrent_writers_do_not_lose_updates() {
    let (_dir, file) = setup(ORIGINAL);
    let file = Arc::new(file);

    let mut set = JoinSet::new();
    for (profile, id) in [("default", "AKIADEFAULT2"), ("ci", "AKIACI2")] {
        let file = Arc::clone(&file);
        set.spawn(async move {
            file.persist(profile, &created(id, &format!("{profile}-secret")))
                .await
        });
    }
    while let Some(result) = set.join_next().await {
        result.unwrap().unwrap();
    }

    let document = file.load().await.unwrap();
    assert_eq!(
        document.local_record("default").unwrap().pair_id.as_str(),
        "AKIADEFAULT2"
    );
    assert_eq!(
        document.local_record("ci").unwrap().pair_id.as_str(),
        "AKIACI2"
    );
}
