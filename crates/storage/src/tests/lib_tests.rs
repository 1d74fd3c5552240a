use std::time::{SystemTime, UNIX_EPOCH};

use super::*;

fn temp_database_url(tag: &str) -> (PathBuf, String) {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let db_path = std::env::temp_dir().join(format!("perss_storage_{tag}_{unique}.sqlite3"));
    let url = format!("sqlite://{}", db_path.display());
    (db_path, url)
}

#[tokio::test]
async fn saved_values_survive_a_reopen() {
    let (db_path, url) = temp_database_url("reopen");

    let storage = Storage::new(&url).await.expect("open storage");
    storage
        .save_value("user_name", "小明")
        .await
        .expect("save name");
    storage
        .save_value("current_phase", "execution")
        .await
        .expect("save phase");
    drop(storage);

    let reopened = Storage::new(&url).await.expect("reopen storage");
    assert_eq!(
        reopened.load_value("user_name").await.expect("load name"),
        Some("小明".to_string())
    );
    assert_eq!(
        reopened
            .load_value("current_phase")
            .await
            .expect("load phase"),
        Some("execution".to_string())
    );

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn save_value_overwrites_the_existing_entry() {
    let (db_path, url) = temp_database_url("overwrite");
    let storage = Storage::new(&url).await.expect("open storage");

    storage.save_value("user_name", "a").await.expect("first");
    storage.save_value("user_name", "b").await.expect("second");
    assert_eq!(
        storage.load_value("user_name").await.expect("load"),
        Some("b".to_string())
    );

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn delete_value_removes_only_the_named_key() {
    let (db_path, url) = temp_database_url("delete");
    let storage = Storage::new(&url).await.expect("open storage");

    storage.save_value("user_name", "a").await.expect("save");
    storage
        .save_value("current_phase", "feedback")
        .await
        .expect("save");

    storage.delete_value("user_name").await.expect("delete");

    assert_eq!(storage.load_value("user_name").await.expect("load"), None);
    assert_eq!(
        storage.load_value("current_phase").await.expect("load"),
        Some("feedback".to_string())
    );

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn missing_key_loads_as_none() {
    let (db_path, url) = temp_database_url("missing");
    let storage = Storage::new(&url).await.expect("open storage");

    storage.health_check().await.expect("ping");
    assert_eq!(storage.load_value("user_name").await.expect("load"), None);

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn creates_parent_dir_for_nested_sqlite_path() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("perss_storage_nested_{unique}"));
    let url = format!("sqlite://{}/data/session.db", root.display());

    let storage = Storage::new(&url).await.expect("open storage");
    storage.save_value("user_name", "a").await.expect("save");
    assert!(root.join("data").exists());

    drop(storage);
    let _ = std::fs::remove_dir_all(root);
}
