use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use densrus_blas::{level1, level3, Transpose, Uplo};

fn bench_ddot(c: &mut Criterion) {
    let mut group = c.benchmark_group("ddot");
    for &n in &[64, 256, 1024, 4096, 16384] {
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.001).collect();
        let y: Vec<f64> = (0..n).map(|i| i as f64 * 0.002).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| level1::ddot(n, &x, 1, &y, 1));
        });
    }
    group.finish();
}

fn bench_daxpy(c: &mut Criterion) {
    let mut group = c.benchmark_group("daxpy");
    for &n in &[64, 256, 1024, 4096, 16384] {
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.001).collect();
        let mut y: Vec<f64> = (0..n).map(|i| i as f64 * 0.002).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| {
                y.fill(0.0);
                level1::daxpy(n, 2.0, &x, 1, &mut y, 1);
            });
        });
    }
    group.finish();
}

fn bench_dgemm(c: &mut Criterion) {
    let mut group = c.benchmark_group("dgemm");
    for &n in &[32, 64, 128, 256] {
        let a: Vec<f64> = (0..n * n).map(|i| (i as f64 * 0.001).sin()).collect();
        let b: Vec<f64> = (0..n * n).map(|i| (i as f64 * 0.002).cos()).collect();
        let mut c_mat = vec![0.0f64; n * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                level3::dgemm(
                    Transpose::NoTrans,
                    Transpose::NoTrans,
                    n,
                    n,
                    n,
                    1.0,
                    &a,
                    n,
                    &b,
                    n,
                    0.0,
                    &mut c_mat,
                    n,
                );
            });
        });
    }
    group.finish();
}

fn bench_dsyr2k(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsyr2k");
    for &n in &[32, 128, 256] {
        let k = 32;
        let a: Vec<f64> = (0..n * k).map(|i| (i as f64 * 0.003).sin()).collect();
        let b: Vec<f64> = (0..n * k).map(|i| (i as f64 * 0.005).cos()).collect();
        let mut c_mat = vec![0.0f64; n * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, &n| {
            bench.iter(|| {
                level3::dsyr2k(Uplo::Lower, Transpose::NoTrans, n, k, -1.0, &a, k, &b, k, 1.0, &mut c_mat, n);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ddot, bench_daxpy, bench_dgemm, bench_dsyr2k);
criterion_main!(benches);
