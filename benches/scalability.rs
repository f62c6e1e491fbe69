use criterion::{Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use rayon::ThreadPoolBuilder;
use salary_dashboard::dataset::{Dataset, LoadOptions, write_csv};
use salary_dashboard::engine::{filter::FilterSelection, recompute};
use salary_dashboard::synthetic::generate_records;

fn bench_scalability(c: &mut Criterion) {
    let sizes = [100_000usize, 1_000_000];

    for &rows in &sizes {
        let mut rng = StdRng::seed_from_u64(rows as u64);
        let mut csv = Vec::new();
        write_csv(&mut csv, &generate_records(rows, &mut rng)).unwrap();

        for threads in [1, 8] {
            let pool = ThreadPoolBuilder::new().num_threads(threads).build().unwrap();

            let id = format!("load_{rows}rows_{threads}threads");
            c.bench_function(&id, |b| {
                pool.install(|| {
                    b.iter(|| Dataset::from_csv_bytes(csv.clone(), LoadOptions::default()).unwrap())
                })
            });

            let dataset = Dataset::from_csv_bytes(csv.clone(), LoadOptions::default()).unwrap();
            let mut selection = FilterSelection::all(&dataset);
            selection.company_sizes.retain(|size| size != "S");

            let id = format!("recompute_{rows}rows_{threads}threads");
            c.bench_function(&id, |b| {
                pool.install(|| b.iter(|| recompute(&dataset, &selection)))
            });
        }
    }
}

criterion_group!(benches, bench_scalability);
criterion_main!(benches);
