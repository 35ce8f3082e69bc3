use assert_cmd::Command;
use chrono::Utc;
use ridgeline_model::{
    Activity, ActivityTranslation, Difficulty, Locale, Settings, SettingsSection, Slug,
};
use ridgeline_store::{ContentRepository, DocumentDb, FileMirror};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

fn ridgeline() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ridgeline"));
    cmd.env_remove("RIDGELINE_CONTENT_ROOT")
        .env_remove("RIDGELINE_DB_PATH")
        .env_remove("RIDGELINE_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

fn stderr_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stderr).expect("stderr json")
}

fn hiking() -> Activity {
    let mut translations = BTreeMap::new();
    translations.insert(
        Locale::parse("es").expect("locale"),
        ActivityTranslation {
            title: "Caminata al volcán".to_string(),
            body: "Subida **tranquila**.".to_string(),
            ..ActivityTranslation::default()
        },
    );
    Activity {
        slug: Slug::parse("volcano-hike").expect("slug"),
        category: "land".to_string(),
        difficulty: Difficulty::Easy,
        duration_minutes: 180,
        price: None,
        min_age: None,
        max_group_size: Some(12),
        cover_image: "/images/volcano.jpg".to_string(),
        gallery: Vec::new(),
        featured: false,
        published: true,
        sort_order: 1,
        translations,
        updated_at: Utc::now(),
    }
}

fn contact_settings() -> Settings {
    let mut settings = Settings::empty(SettingsSection::Contact);
    settings
        .values
        .insert("email".to_string(), "hola@ridgeline.example".to_string());
    settings
}

fn seed_db(path: &Path) {
    let repo = ContentRepository::new(DocumentDb::open(path).expect("open db"));
    repo.save_activity(&hiking()).expect("save activity");
    repo.save_settings(&contact_settings()).expect("save settings");
}

#[test]
fn validate_accepts_a_clean_mirror() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let repo = ContentRepository::new(FileMirror::new(tmp.path()));
    repo.save_activity(&hiking()).expect("save");

    let output = ridgeline()
        .args(["--json", "validate", "--content"])
        .arg(tmp.path())
        .output()
        .expect("run validate");
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["checked"], 1);
}

#[test]
fn validate_reports_every_broken_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let activities = tmp.path().join("activities");
    let settings = tmp.path().join("settings");
    std::fs::create_dir_all(&activities).expect("mkdir");
    std::fs::create_dir_all(&settings).expect("mkdir");
    std::fs::write(activities.join("Bad Name.json"), "{}").expect("write");
    std::fs::write(activities.join("broken.json"), "{ not json").expect("write");
    std::fs::write(
        settings.join("contact.json"),
        r#"{"section":"contact","values":{"favourite_colour":"green"}}"#,
    )
    .expect("write");

    let output = ridgeline()
        .args(["--json", "validate", "--content"])
        .arg(tmp.path())
        .output()
        .expect("run validate");
    assert_eq!(output.status.code(), Some(3));
    let payload = stdout_json(&output);
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["checked"], 3);
    let issues = payload["issues"].as_array().expect("issues");
    assert_eq!(issues.len(), 3);
    assert!(issues
        .iter()
        .any(|i| i["file"] == "contact.json" && i["message"].as_str().is_some_and(|m| m.contains("favourite_colour"))));
    assert_eq!(stderr_json(&output)["code"], "content_invalid");
}

#[test]
fn drift_sync_and_export_reconcile_the_mirror() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = tmp.path().join("data/ridgeline.sqlite");
    let content = tmp.path().join("content");
    seed_db(&db);

    let output = ridgeline()
        .args(["--json", "drift", "--db"])
        .arg(&db)
        .arg("--content")
        .arg(&content)
        .output()
        .expect("run drift");
    assert_eq!(output.status.code(), Some(3));
    let payload = stdout_json(&output);
    assert_eq!(payload["clean"], false);
    assert_eq!(payload["drifted"], 2);
    assert_eq!(
        payload["report"]["collections"]["activities"]["only_in_left"][0],
        "volcano-hike"
    );

    let output = ridgeline()
        .args(["--json", "sync", "--direction", "db-to-files", "--dry-run", "--db"])
        .arg(&db)
        .arg("--content")
        .arg(&content)
        .output()
        .expect("run dry sync");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["report"]["copied"], 2);
    assert!(!content.join("activities/volcano-hike.json").exists());

    let output = ridgeline()
        .args(["--json", "sync", "--direction", "db-to-files", "--db"])
        .arg(&db)
        .arg("--content")
        .arg(&content)
        .output()
        .expect("run sync");
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["from"], "document_db");
    assert_eq!(payload["to"], "file_mirror");
    assert_eq!(payload["report"]["copied"], 2);
    assert!(content.join("activities/volcano-hike.json").exists());
    assert!(content.join("activities/volcano-hike.es.md").exists());

    let output = ridgeline()
        .args(["--json", "drift", "--collections", "activities,settings", "--db"])
        .arg(&db)
        .arg("--content")
        .arg(&content)
        .output()
        .expect("run drift again");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["clean"], true);

    let out = tmp.path().join("export");
    let output = ridgeline()
        .args(["--json", "export", "--db"])
        .arg(&db)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run export");
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["documents"]["activities"], 1);
    assert_eq!(payload["documents"]["settings"], 1);
    let exported = std::fs::read_to_string(out.join("settings/contact.json")).expect("exported");
    assert!(exported.contains("hola@ridgeline.example"));
}

#[test]
fn files_to_db_sync_creates_the_database() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let content = tmp.path().join("content");
    let repo = ContentRepository::new(FileMirror::new(&content));
    repo.save_settings(&contact_settings()).expect("save");
    let db = tmp.path().join("fresh.sqlite");

    let output = ridgeline()
        .args(["--json", "sync", "--direction", "files-to-db", "--db"])
        .arg(&db)
        .arg("--content")
        .arg(&content)
        .output()
        .expect("run sync");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["report"]["copied"], 1);

    let repo = ContentRepository::new(DocumentDb::open(&db).expect("reopen"));
    let stored = repo.settings(SettingsSection::Contact).expect("settings");
    assert_eq!(stored.get("email"), Some("hola@ridgeline.example"));
}

#[test]
fn usage_and_missing_inputs_map_to_exit_codes() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let output = ridgeline().arg("--json").output().expect("run bare");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_json(&output)["code"], "usage_error");

    let output = ridgeline()
        .args(["--json", "drift", "--collections", "activities,bogus"])
        .output()
        .expect("run bad collections");
    assert_eq!(output.status.code(), Some(2));

    let output = ridgeline()
        .args(["--json", "drift", "--db"])
        .arg(tmp.path().join("missing.sqlite"))
        .arg("--content")
        .arg(tmp.path())
        .output()
        .expect("run drift");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stderr_json(&output)["code"], "database_missing");
    assert!(!tmp.path().join("missing.sqlite").exists());

    let output = ridgeline().arg("--help").output().expect("run help");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("RIDGELINE_CONTENT_ROOT"));
}
