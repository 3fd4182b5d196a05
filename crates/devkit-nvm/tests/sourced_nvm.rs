#![cfg(unix)]

use std::sync::Arc;

use devkit_backend::{DisabledIndex, VersionRecord};
use devkit_exec::SystemRunner;
use devkit_nvm::{NvmBackend, NvmClient};

const FAKE_NVM_SH: &str = r#"
nvm() {
  case "$1" in
    ls)
      printf '%s\n' '->     v18.17.0 *' '       v16.20.2 *' 'default -> 18 (-> v18.17.0 *)'
      ;;
    ls-remote)
      printf '%s\n' '        v16.20.2   (LTS: Gallium)' '        v18.17.0   (LTS: Hydrogen)' '        v20.5.1'
      ;;
    current)
      echo v18.17.0
      ;;
    use)
      echo "Now using node $2"
      ;;
    *)
      echo "unknown command: $1" >&2
      return 1
      ;;
  esac
}
"#;

fn backend_with_fake_nvm(dir: &tempfile::TempDir) -> NvmBackend {
    std::fs::write(dir.path().join("nvm.sh"), FAKE_NVM_SH).unwrap();
    NvmBackend::new(
        NvmClient::unix(dir.path()),
        Arc::new(SystemRunner::default()),
        Arc::new(DisabledIndex),
    )
}

#[tokio::test]
async fn lists_installed_versions_through_sourced_script() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend_with_fake_nvm(&dir);

    let records = backend.list_installed().await.unwrap();

    assert_eq!(
        records,
        vec![
            VersionRecord::new("v18.17.0", true),
            VersionRecord::new("v16.20.2", false),
        ]
    );
}

#[tokio::test]
async fn repeated_listing_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend_with_fake_nvm(&dir);

    let first = backend.list_installed().await.unwrap();
    let second = backend.list_installed().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn lists_available_versions_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend_with_fake_nvm(&dir);

    let versions = backend.list_available().await.unwrap();

    assert_eq!(versions, ["v20.5.1", "v18.17.0", "v16.20.2"]);
}

#[tokio::test]
async fn switch_returns_tool_output() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend_with_fake_nvm(&dir);

    let output = backend.switch("16").await.unwrap();

    assert_eq!(output.stdout.trim(), "Now using node 16");
}

#[tokio::test]
async fn current_version_comes_from_nvm() {
    let dir = tempfile::tempdir().unwrap();
    let backend = backend_with_fake_nvm(&dir);

    assert_eq!(
        backend.current_version().await.unwrap().as_deref(),
        Some("v18.17.0")
    );
}

#[tokio::test]
async fn empty_nvm_dir_means_nvm_is_not_installed() {
    let dir = tempfile::tempdir().unwrap();
    let backend = NvmBackend::new(
        NvmClient::unix(dir.path()),
        Arc::new(SystemRunner::default()),
        Arc::new(DisabledIndex),
    );

    let listing = backend.list_available().await.unwrap_err();
    let install = backend.install("18").await.unwrap_err();

    assert!(listing.is_not_found(), "unexpected listing error: {listing}");
    assert_eq!(install.kind(), "tool-not-found", "unexpected install error: {install}");
}
