//! Storage areas on the SQLite backend.

use storage_area::{Factory, Key, StorageArea, Value};
use storage_area_testkit::TestFixture;
use tempfile::TempDir;

#[tokio::test]
async fn alpha_scenario_on_sqlite() {
    let fixture = TestFixture::sqlite();
    let area = fixture.area("alpha");

    area.set(1, "one").await.unwrap();
    area.set("a", [1, 2, 3]).await.unwrap();
    assert_eq!(area.get(1).await.unwrap(), Some(Value::from("one")));
    assert_eq!(area.get("a").await.unwrap(), Some(Value::array([1, 2, 3])));
    assert!(!area.has(2).await.unwrap());
    assert_eq!(area.keys().await.unwrap(), vec![Key::from(1), Key::from("a")]);

    area.delete(1).await.unwrap();
    assert_eq!(area.keys().await.unwrap(), vec![Key::from("a")]);

    area.clear().await.unwrap();
    assert!(area.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn records_survive_a_new_factory() {
    let dir = TempDir::new().unwrap();

    {
        let factory = Factory::sqlite(dir.path()).unwrap();
        let area = StorageArea::new("persisted", &factory).unwrap();
        area.set("theme", "dark").await.unwrap();
        area.set(Value::date(0.0), Value::object([("n", 1)])).await.unwrap();
    }

    let factory = Factory::sqlite(dir.path()).unwrap();
    let area = StorageArea::new("persisted", &factory).unwrap();
    assert_eq!(area.get("theme").await.unwrap(), Some(Value::from("dark")));
    assert_eq!(
        area.entries().await.unwrap(),
        vec![
            (Key::Date(0.0), Value::object([("n", 1)])),
            (Key::from("theme"), Value::from("dark")),
        ]
    );
}

#[tokio::test]
async fn sqlite_keys_follow_key_order() {
    let fixture = TestFixture::sqlite();
    fixture
        .with_area(|area| async move {
            // Byte order of UTF-8 and UTF-16 disagree here.
            area.set("\u{ff61}", 1).await.unwrap();
            area.set("\u{1f600}", 2).await.unwrap();
            area.set(-1, 3).await.unwrap();
            area.set(10, 4).await.unwrap();
            area.set(2, 5).await.unwrap();

            assert_eq!(
                area.keys().await.unwrap(),
                vec![
                    Key::from(-1),
                    Key::from(2),
                    Key::from(10),
                    Key::from("\u{1f600}"),
                    Key::from("\u{ff61}"),
                ]
            );
        })
        .await;
}

#[tokio::test]
async fn clear_removes_the_database_file() {
    let fixture = TestFixture::sqlite();
    let area = fixture.area("files");
    area.set("k", "v").await.unwrap();

    let root = fixture.root().unwrap();
    let files = || std::fs::read_dir(root).unwrap().count();
    assert!(files() > 0);

    area.clear().await.unwrap();
    assert_eq!(files(), 0);
}
