use criterion::{black_box, criterion_group, criterion_main, Criterion};
use storage_area_core::{decode_key, encode_key, require_allowed_key, Key, Value};

fn sample_keys() -> Vec<Key> {
    vec![
        Key::Number(42.5),
        Key::Date(1736870400000.0),
        Key::from("a moderately long string key with some \u{1f600} in it"),
        Key::Binary(vec![0xab; 64].into()),
        Key::Array(vec![Key::from("user"), Key::from(7), Key::Array(vec![Key::from("tag")])]),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let keys = sample_keys();
    c.bench_function("encode_key", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(encode_key(black_box(key)));
            }
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let encoded: Vec<Vec<u8>> = sample_keys().iter().map(encode_key).collect();
    c.bench_function("decode_key", |b| {
        b.iter(|| {
            for bytes in &encoded {
                black_box(decode_key(black_box(bytes)).unwrap());
            }
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let values: Vec<Value> = sample_keys().into_iter().map(Value::from).collect();
    c.bench_function("require_allowed_key", |b| {
        b.iter(|| {
            for value in &values {
                black_box(require_allowed_key(black_box(value)).unwrap());
            }
        })
    });
}

fn bench_compare(c: &mut Criterion) {
    let mut keys = sample_keys();
    keys.extend(sample_keys().into_iter().rev());
    c.bench_function("sort_keys", |b| {
        b.iter(|| {
            let mut keys = keys.clone();
            keys.sort();
            black_box(keys)
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_validate, bench_compare);
criterion_main!(benches);
