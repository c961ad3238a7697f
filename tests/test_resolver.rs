use std::path::{Path, PathBuf};

use lantern::config::ServerConfig;
use lantern::files::{ResolveError, normalize_target, resolve};
use tempfile::TempDir;

fn site() -> (TempDir, ServerConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
    std::fs::write(root.join("style.css"), "p {}").unwrap();
    std::fs::write(root.join("about"), "about page").unwrap();
    std::fs::write(root.join("my page.html"), "spaces").unwrap();
    std::fs::create_dir_all(root.join("docs/img")).unwrap();
    std::fs::write(root.join("docs/index.html"), "docs").unwrap();
    std::fs::write(root.join("docs/img/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::create_dir(root.join("empty")).unwrap();

    let cfg = ServerConfig::new(root).validate().unwrap();
    (dir, cfg)
}

#[test]
fn test_normalize_plain_paths() {
    assert_eq!(normalize_target("/").unwrap(), PathBuf::new());
    assert_eq!(normalize_target("/style.css").unwrap(), PathBuf::from("style.css"));
    assert_eq!(
        normalize_target("/docs/img/logo.png").unwrap(),
        Path::new("docs").join("img").join("logo.png")
    );
}

#[test]
fn test_normalize_collapses_dot_segments() {
    assert_eq!(normalize_target("/docs/../style.css").unwrap(), PathBuf::from("style.css"));
    assert_eq!(normalize_target("/./docs//./img/..").unwrap(), PathBuf::from("docs"));
}

#[test]
fn test_normalize_decodes_percent_escapes() {
    assert_eq!(normalize_target("/my%20page.html").unwrap(), PathBuf::from("my page.html"));
}

#[test]
fn test_normalize_strips_query_and_fragment() {
    assert_eq!(normalize_target("/style.css?v=3").unwrap(), PathBuf::from("style.css"));
    assert_eq!(normalize_target("/index.html#top").unwrap(), PathBuf::from("index.html"));
}

#[test]
fn test_normalize_rejects_escape_from_root() {
    assert_eq!(normalize_target("/.."), Err(ResolveError::Forbidden));
    assert_eq!(normalize_target("/../../etc/passwd"), Err(ResolveError::Forbidden));
    assert_eq!(normalize_target("/docs/../../secret"), Err(ResolveError::Forbidden));
}

#[test]
fn test_normalize_rejects_encoded_traversal() {
    assert_eq!(normalize_target("/%2e%2e/secret"), Err(ResolveError::Forbidden));
    assert_eq!(normalize_target("/docs%2F..%2F..%2Fsecret"), Err(ResolveError::Forbidden));
}

#[test]
fn test_normalize_rejects_backslashes_and_nul() {
    assert_eq!(normalize_target("/..\\secret"), Err(ResolveError::Forbidden));
    assert_eq!(normalize_target("/a%5C..%5C..%5Csecret"), Err(ResolveError::Forbidden));
    assert_eq!(normalize_target("/index.html%00.png"), Err(ResolveError::Forbidden));
}

#[tokio::test]
async fn test_resolve_root_to_index() {
    let (_dir, cfg) = site();
    let resolved = resolve("/", &cfg).await.unwrap();

    assert_eq!(resolved.filesystem_path, cfg.document_root.join("index.html"));
    assert!(resolved.exists);
    assert!(!resolved.is_directory);
    assert!(resolved.is_servable());
    assert_eq!(resolved.content_type, "text/html");
    assert_eq!(resolved.size, 11);
}

#[tokio::test]
async fn test_resolve_directory_without_trailing_slash() {
    let (_dir, cfg) = site();
    let resolved = resolve("/docs", &cfg).await.unwrap();

    assert_eq!(resolved.filesystem_path, cfg.document_root.join("docs").join("index.html"));
    assert!(resolved.is_servable());
}

#[tokio::test]
async fn test_resolve_directory_without_index() {
    let (_dir, cfg) = site();
    let resolved = resolve("/empty/", &cfg).await.unwrap();

    assert!(!resolved.exists);
    assert!(!resolved.is_servable());
}

#[tokio::test]
async fn test_resolve_trailing_slash_on_file() {
    let (_dir, cfg) = site();
    let resolved = resolve("/style.css/", &cfg).await.unwrap();

    assert!(!resolved.exists);
}

#[tokio::test]
async fn test_resolve_asset_and_page_the_same_way() {
    let (_dir, cfg) = site();

    let asset = resolve("/docs/img/logo.png", &cfg).await.unwrap();
    assert!(asset.is_servable());
    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.size, 4);

    let page = resolve("/about", &cfg).await.unwrap();
    assert!(page.is_servable());
    assert_eq!(page.content_type, "text/html");
}

#[tokio::test]
async fn test_resolve_missing_file() {
    let (_dir, cfg) = site();
    let resolved = resolve("/missing.html", &cfg).await.unwrap();

    assert!(!resolved.exists);
    assert_eq!(resolved.size, 0);
    assert_eq!(resolved.content_type, "text/html");
}

#[tokio::test]
async fn test_resolve_stays_under_root() {
    let (_dir, cfg) = site();

    for target in ["/", "/docs/./img/../index.html", "/my%20page.html", "/a/b/c/../../.."] {
        let resolved = resolve(target, &cfg).await.unwrap();
        assert!(resolved.filesystem_path.starts_with(&cfg.document_root), "{}", target);
    }
}

#[tokio::test]
async fn test_resolve_traversal_is_forbidden() {
    let (_dir, cfg) = site();

    assert_eq!(resolve("/../secret", &cfg).await, Err(ResolveError::Forbidden));
}

#[tokio::test]
async fn test_resolve_file_used_as_directory_is_missing() {
    let (_dir, cfg) = site();
    let resolved = resolve("/style.css/extra.css", &cfg).await.unwrap();

    assert!(!resolved.exists);
}

#[cfg(unix)]
#[tokio::test]
async fn test_resolve_unreadable_directory_is_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let (dir, cfg) = site();
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::write(locked.join("page.html"), "hidden").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users see through the mode bits.
    let privileged = std::fs::metadata(locked.join("page.html")).is_ok();
    let result = resolve("/locked/page.html", &cfg).await;
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    if privileged {
        return;
    }

    assert_eq!(result, Err(ResolveError::PermissionDenied));
}
