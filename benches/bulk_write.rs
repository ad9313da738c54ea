use criterion::{criterion_group, criterion_main, Criterion};

use afits::{FitsWriter, HduSchema};

const ROWS: u64 = 256;
const COLS: u64 = 4096;

fn write_rows_sync(path: &std::path::Path, row: &[u8]) {
    let mut writer = FitsWriter::create(path, &[HduSchema::of::<u8>(&[ROWS, COLS])]).unwrap();
    let hdu = writer.hdu(0).unwrap();
    for i in 0..ROWS {
        hdu.write_data(&[i], row).unwrap();
    }
}

fn write_rows_queued(path: &std::path::Path, row: &[u8]) {
    let mut writer = FitsWriter::create(path, &[HduSchema::of::<u8>(&[ROWS, COLS])]).unwrap();
    let pending: Vec<_> = {
        let hdu = writer.hdu(0).unwrap();
        (0..ROWS).map(|i| hdu.async_write_data(&[i], row)).collect()
    };
    writer.run();
    for p in pending {
        futures::executor::block_on(p).unwrap();
    }
}

fn criterion_benchmark_bulk_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk row writes");
    group.measurement_time(std::time::Duration::from_millis(500));

    let dir = tempfile::TempDir::new().unwrap();
    let row = vec![0xab_u8; COLS as usize];

    let path = dir.path().join("sync.fits");
    group.bench_function("sync", |b| b.iter(|| write_rows_sync(&path, &row)));

    let path = dir.path().join("queued.fits");
    group.bench_function("queued", |b| b.iter(|| write_rows_queued(&path, &row)));

    group.finish();
}

criterion_group!(benches, criterion_benchmark_bulk_write);

criterion_main!(benches);
