use bunfs_extract::graph::builder::{ContainerBuilder, ModuleEntry};
use bunfs_extract::graph::Loader;
use bunfs_extract::{GraphConfig, ModuleGraph};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn container(modules: usize, body: usize) -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    for i in 0..modules {
        let contents = format!("// module {i}\n{}", "x".repeat(body)).into_bytes();
        builder = builder.module(ModuleEntry::new(
            format!("/$bunfs/root/chunk-{i}.js"),
            contents,
            Loader::Js,
        ));
    }
    builder.build().expect("container fits")
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for modules in [8usize, 256, 4096] {
        let section = bytes::Bytes::from(container(modules, 2048));
        group.throughput(Throughput::Bytes(section.len() as u64));
        for (label, threshold) in [("sequential", 0usize), ("parallel", 64)] {
            let config = GraphConfig {
                parallel_threshold: threshold,
                ..GraphConfig::default()
            };
            group.bench_with_input(BenchmarkId::new(label, modules), &section, |b, s| {
                b.iter(|| ModuleGraph::from_section(s.clone(), &config))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
