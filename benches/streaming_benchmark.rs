use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::NamedTempFile;
use xlsxstream::{CellStyle, CellValue, ExcelWriter, HeaderOptions, RowOptions, Workbook};

fn benchmark_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for size in [100, 1000, 10000, 100000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let temp = NamedTempFile::new().unwrap();
                let mut writer = ExcelWriter::new(temp.path()).unwrap();

                writer.write_header(["ID", "Name", "Value"]).unwrap();

                for i in 0..size {
                    writer
                        .write_row([
                            i.to_string(),
                            format!("Name_{}", i),
                            (i * 100).to_string(),
                        ])
                        .unwrap();
                }

                writer.save().unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_typed_columns(c: &mut Criterion) {
    c.bench_function("typed_columns_10000_rows", |b| {
        b.iter(|| {
            let mut workbook = Workbook::new();
            workbook
                .write_sheet_header(
                    "Data",
                    [("id", "integer"), ("name", "string"), ("price", "money"), ("day", "date")],
                    &HeaderOptions::new().with_auto_filter(true).with_freeze(1, 0),
                )
                .unwrap();

            for i in 0..10000i64 {
                workbook
                    .write_sheet_row(
                        "Data",
                        [
                            CellValue::Int(i),
                            CellValue::String(format!("Name_{}", i)),
                            CellValue::Float(i as f64 * 1.25),
                            CellValue::String(format!("2024-01-{:02}", i % 28 + 1)),
                        ],
                        &RowOptions::default(),
                    )
                    .unwrap();
            }

            black_box(workbook.write_to_vec().unwrap());
        });
    });
}

fn benchmark_styled_rows(c: &mut Criterion) {
    let styles = [
        CellStyle::new().bold(),
        CellStyle::new().italic(),
        CellStyle::new().with_wrap_text(true),
    ];

    c.bench_function("styled_rows_10000", |b| {
        b.iter(|| {
            let mut workbook = Workbook::new();
            for i in 0..10000usize {
                let options = RowOptions::new().with_style(styles[i % styles.len()].clone());
                workbook
                    .write_sheet_row("Styled", [i as i64, (i * 2) as i64], &options)
                    .unwrap();
            }
            black_box(workbook.write_to_vec().unwrap());
        });
    });
}

criterion_group!(
    benches,
    benchmark_write,
    benchmark_typed_columns,
    benchmark_styled_rows
);
criterion_main!(benches);
