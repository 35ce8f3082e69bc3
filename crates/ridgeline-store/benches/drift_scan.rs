use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ridgeline_model::Collection;
use ridgeline_store::{drift_report, ContentStore, Document, DocumentDb, FileMirror};
use serde_json::json;

fn activity_doc(i: usize) -> Document {
    let slug = format!("activity-{i:04}");
    Document {
        collection: Collection::Activities,
        id: slug.clone(),
        body: json!({
            "slug": slug,
            "difficulty": "easy",
            "duration_minutes": 60 + i,
            "translations": {
                "es": {"title": format!("Actividad {i}"), "body": "Texto **largo**. ".repeat(40)},
                "en": {"title": format!("Activity {i}"), "body": "Long **text**. ".repeat(40)}
            }
        }),
        updated_at: Utc::now(),
    }
}

fn bench_drift_report(c: &mut Criterion) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let db = DocumentDb::open_in_memory().expect("db");
    let files = FileMirror::new(tmp.path());
    for i in 0..200 {
        let doc = activity_doc(i);
        db.put(&doc).expect("db put");
        if i % 10 != 0 {
            files.put(&doc).expect("file put");
        }
    }
    c.bench_function("drift_report_200_activities", |b| {
        b.iter(|| {
            black_box(drift_report(&db, &files, &[Collection::Activities]))
                .expect("drift")
        })
    });
}

criterion_group!(benches, bench_drift_report);
criterion_main!(benches);
