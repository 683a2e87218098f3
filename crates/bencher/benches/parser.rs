use std::hint::black_box;
use std::sync::Arc;

use bencher::{TestCase, TestFile};
use bytes::BytesMut;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use micro_htp::codec::LineDecoder;
use micro_htp::config::Config;
use micro_htp::connection::ConnectionParser;
use micro_htp::protocol::HtpStatus;
use tokio_util::codec::Decoder;

static SMALL_REQUEST: TestFile = TestFile::new("get_small.txt", include_str!("../resources/request/get_small.txt"));
static LARGE_REQUEST: TestFile = TestFile::new("post_large.txt", include_str!("../resources/request/post_large.txt"));

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::generic("small_request", SMALL_REQUEST),
        TestCase::apache("small_request", SMALL_REQUEST),
        TestCase::generic("large_request", LARGE_REQUEST),
        TestCase::apache("large_request", LARGE_REQUEST),
    ]
}

fn benchmark_connection_parser(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("connection_parser");

    for case in create_test_cases() {
        let mut config = Config::new();
        config.set_server_personality(case.personality()).expect("built-in personality should be registered");
        let config = Arc::new(config);

        group.throughput(Throughput::Bytes(case.file().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.id()), &case, |b, case| {
            b.iter_batched_ref(
                || ConnectionParser::new(Arc::clone(&config)),
                |parser| {
                    let status = parser.request_data(case.file().content().as_bytes());
                    assert_eq!(status, HtpStatus::Data, "{} should parse", case.file_name());
                    black_box(parser.transactions().len());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_line_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("line_decoder");

    for case in [TestCase::generic("large_request", LARGE_REQUEST)] {
        group.throughput(Throughput::Bytes(case.file().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let mut decoder = LineDecoder::default();
            b.iter_batched_ref(
                || BytesMut::from(case.file().content()),
                |bytes_mut| {
                    while let Some(line) = decoder.decode(bytes_mut).expect("lines should fit the limit") {
                        black_box(line);
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(parser, benchmark_connection_parser, benchmark_line_decoder);
criterion_main!(parser);
