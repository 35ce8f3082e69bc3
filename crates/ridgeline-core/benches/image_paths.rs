use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ridgeline_core::{canonical, normalize_image_path, slugify, ImageHosts};
use serde_json::json;

fn bench_normalize_image_path(c: &mut Criterion) {
    let hosts = ImageHosts {
        cloudinary_cloud_name: Some("ridgeline".to_string()),
        r2_public_base_url: Some("https://media.ridgeline.example".to_string()),
    };
    let inputs = [
        "public/images/rafting.jpg",
        "./uploads//tours\\canopy.webp",
        "cloudinary:ridgeline/tours/rafting-day",
        "r2:uploads/volcano.png",
        "https://cdn.example.com/a.jpg",
        "cover.jpg",
        "../../etc/passwd",
    ];
    c.bench_function("normalize_image_path", |b| {
        b.iter(|| {
            for raw in inputs {
                black_box(normalize_image_path(black_box(raw), &hosts));
            }
        })
    });
}

fn bench_slugify(c: &mut Criterion) {
    c.bench_function("slugify_accented_title", |b| {
        b.iter(|| slugify(black_box("Caminata nocturna al Volcán Arenal: niños y mascotas")))
    });
}

fn bench_activity_hash(c: &mut Criterion) {
    let payload = json!({
        "slug": "rafting-pacuare",
        "difficulty": "moderate",
        "duration_minutes": 240,
        "published": true,
        "translations": {
            "es": {"title": "Rafting Pacuare", "summary": "Rápidos clase III", "body": "x".repeat(2048)},
            "en": {"title": "Pacuare Rafting", "summary": "Class III rapids", "body": "y".repeat(2048)}
        }
    });
    c.bench_function("stable_json_hash_hex_activity", |b| {
        b.iter(|| canonical::stable_json_hash_hex(black_box(&payload)).expect("stable hash"))
    });
}

criterion_group!(benches, bench_normalize_image_path, bench_slugify, bench_activity_hash);
criterion_main!(benches);
