//! Integration tests for hot-reloading a Rhai delegate script from disk

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hookscript_kernel::config::{AppConfig, ConfigFormat};
use hookscript_kernel::{Delegate, HostPlugin, RequestContext};
use hookscript_plugins::{RhaiCodeLoader, RhaiDelegate};
use hookscript_rhai::RhaiBackend;
use serde_json::json;
use tempfile::TempDir;

fn script(source: &str) -> String {
    format!(
        r#"
        fn CustomDelegate() {{ #{{ context: #{{}} }} }}
        fn set_context(context) {{ this.context = context; }}
        fn source() {{ "{source}" }}
        "#
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn loader_for(script_path: &Path) -> anyhow::Result<Arc<RhaiCodeLoader>> {
    let toml = format!(
        "[delegate.rhai]\nscript_pathname = \"{}\"\n",
        script_path.display().to_string().replace('\\', "\\\\")
    );
    let config = AppConfig::from_content(&toml, ConfigFormat::Toml)?;
    Ok(Arc::new(RhaiCodeLoader::new(RhaiBackend::default(), Arc::new(config))))
}

async fn wait_for_generation(loader: &RhaiCodeLoader, generation: u64) -> bool {
    for _ in 0..50 {
        if loader.generation() >= generation {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_script_change_is_picked_up() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("delegates.rhai");
    std::fs::write(&path, script("FilesystemSource"))?;

    let loader = loader_for(&path)?;
    let mut delegate = RhaiDelegate::new(Arc::clone(&loader));
    delegate.on_application_start().await?;
    delegate.initialize_plugin().await?;
    delegate.set_request_context(RequestContext::new().with_identifier("cats"))?;
    assert_eq!(delegate.source()?, Some("FilesystemSource".to_string()));
    assert_eq!(loader.generation(), 1);
    assert!(loader.is_watching().await);

    // Same content again: no recompilation.
    std::fs::write(&path, script("FilesystemSource"))?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(loader.generation(), 1);

    std::fs::write(&path, script("HttpSource"))?;
    assert!(wait_for_generation(&loader, 2).await, "script was not reloaded");

    // The existing instance keeps its state and runs the new code.
    assert_eq!(delegate.source()?, Some("HttpSource".to_string()));
    assert_eq!(
        delegate.invoke("set_context", &mut [json!({"identifier": "dogs"})])?,
        json!(null)
    );

    delegate.on_application_stop().await?;
    assert!(!loader.is_watching().await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broken_script_keeps_previous_code() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("delegates.rhai");
    std::fs::write(&path, script("FilesystemSource"))?;

    let loader = loader_for(&path)?;
    loader.ensure_initialized().await;
    assert_eq!(loader.generation(), 1);

    std::fs::write(&path, "fn CustomDelegate( {")?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(loader.generation(), 1);

    let mut delegate = RhaiDelegate::new(Arc::clone(&loader));
    delegate.instantiate()?;
    assert_eq!(delegate.source()?, Some("FilesystemSource".to_string()));

    std::fs::write(&path, script("S3Source"))?;
    assert!(wait_for_generation(&loader, 2).await, "script was not reloaded");
    assert_eq!(delegate.source()?, Some("S3Source".to_string()));

    loader.stop().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deleted_script_keeps_code() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("delegates.rhai");
    std::fs::write(&path, script("FilesystemSource"))?;

    let loader = loader_for(&path)?;
    loader.ensure_initialized().await;

    std::fs::remove_file(&path)?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(loader.is_loaded());
    assert_eq!(loader.generation(), 1);

    let mut delegate = RhaiDelegate::new(Arc::clone(&loader));
    delegate.instantiate()?;
    assert_eq!(delegate.source()?, Some("FilesystemSource".to_string()));

    loader.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_configuration_leaves_nothing_loaded() -> anyhow::Result<()> {
    let config = AppConfig::from_content("[delegate.rhai]\nscript_pathname = \"  \"\n", ConfigFormat::Toml)?;
    let loader = Arc::new(RhaiCodeLoader::new(RhaiBackend::default(), Arc::new(config)));
    let mut delegate = RhaiDelegate::new(Arc::clone(&loader));

    delegate.on_application_start().await?;
    assert!(!loader.is_loaded());
    assert!(delegate.initialize_plugin().await.is_err());
    Ok(())
}
