//! Criterion benchmarks for the hot encode/decode paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eip_client::command::{CipRequest, PathOptions, SendRRDataRequest};
use eip_client::path::build_symbolic_path;
use eip_client::{CipDataType, CipValue, EncapHeader, ReadTagResponse};
use std::time::Duration;

fn bench_path_building(c: &mut Criterion) {
    c.bench_function("build_symbolic_path nested", |b| {
        b.iter(|| build_symbolic_path(black_box("Program:MainProgram.Machine.Axis.Position")))
    });
}

fn bench_value_codec(c: &mut Criterion) {
    let value = CipValue::Lreal(3.141592653589793);
    let bytes = value.encode().unwrap();
    c.bench_function("encode LREAL", |b| b.iter(|| black_box(&value).encode()));
    c.bench_function("decode LREAL", |b| {
        b.iter(|| CipValue::decode(CipDataType::Lreal, black_box(&bytes), 0))
    });
}

fn bench_frame_building(c: &mut Criterion) {
    let timeout = Duration::from_secs(5);
    c.bench_function("build read-tag frame", |b| {
        b.iter(|| {
            let cip = CipRequest::read_tag("Conveyor.Speed", 1, &PathOptions::default()).unwrap();
            SendRRDataRequest::new(0x1234, cip, [7u8; 8]).to_bytes(black_box(timeout))
        })
    });
}

fn bench_response_parsing(c: &mut Criterion) {
    let mut data = vec![0xC4, 0x32, 0x00];
    for i in 0..50i32 {
        data.extend_from_slice(&i.to_le_bytes());
    }
    c.bench_function("parse 50-element DINT reply", |b| {
        b.iter(|| {
            ReadTagResponse::from_data(black_box(&data))
                .unwrap()
                .decode_elements()
        })
    });
}

fn bench_header(c: &mut Criterion) {
    let header = EncapHeader::new_request(eip_client::EncapCommand::SendRRData, 32, 1, [0u8; 8]);
    let bytes = header.to_bytes();
    c.bench_function("header roundtrip", |b| {
        b.iter(|| EncapHeader::from_bytes(black_box(&bytes)))
    });
}

criterion_group!(
    benches,
    bench_path_building,
    bench_value_codec,
    bench_frame_building,
    bench_response_parsing,
    bench_header
);
criterion_main!(benches);
