use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lorawan_codec::keys::AES128Key;
use lorawan_codec::phy::parse;

fn data_frame() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6,
        0xc3, 0xb5, 0x82,
    ]
}

fn bench_parse(c: &mut Criterion) {
    let bytes = data_frame();
    c.bench_function("parse_data_frame", |b| {
        b.iter(|| parse(black_box(&bytes)).unwrap());
    });
}

fn bench_validate_mic(c: &mut Criterion) {
    let phy = parse(&data_frame()).unwrap();
    let key = AES128Key::from([2; 16]);
    c.bench_function("validate_data_mic", |b| {
        b.iter(|| phy.validate_mic(black_box(&key)).unwrap());
    });
}

fn bench_decrypt(c: &mut Criterion) {
    let phy = parse(&data_frame()).unwrap();
    let key = AES128Key::from([1; 16]);
    c.bench_function("decrypt_frm_payload", |b| {
        b.iter(|| {
            let mut phy = phy.clone();
            phy.decrypt_frm_payload(black_box(&key)).unwrap();
            phy
        });
    });
}

criterion_group!(benches, bench_parse, bench_validate_mic, bench_decrypt);
criterion_main!(benches);
