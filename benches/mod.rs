use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::application::http::client::bench_parse_header,
    network::application::http::client::bench_build_requests,
    network::application::http::client::bench_get_chunked,
    network::application::http::client::bench_get_chunked_bytewise
);
criterion_main!(benches);
