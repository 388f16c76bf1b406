//! Benchmarks for tzdb-ingest
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;
use std::sync::Arc;

const CITY_LINE: &str = "2988507\tParis\tParis\tLutece,Paname,Parigi\t48.85341\t2.3488\tP\tPPLC\tFR\t\t11\t75\t751\t75056\t2138551\t\t42\tEurope/Paris\t2023-06-05";

fn benchmark_city_tokenizing(c: &mut Criterion) {
    use tzdb_ingest::gazetteer::CITY_FIELDS;
    use tzdb_ingest::queue::BufferPool;

    c.bench_function("pooled_city_tokenize", |b| {
        let pool = BufferPool::with_capacity(4, CITY_FIELDS);

        b.iter(|| {
            let mut buffer = pool.pop_or_backoff();
            let count = buffer.fill(black_box(CITY_LINE));
            black_box(buffer.get(17));
            pool.push(buffer);
            count
        })
    });
}

fn benchmark_city_parse(c: &mut Criterion) {
    use tzdb_ingest::gazetteer::fields::parse_city;
    use tzdb_ingest::gazetteer::CITY_FIELDS;
    use tzdb_ingest::queue::FieldBuffer;
    use tzdb_ingest::report::{CollectingReporter, Location};

    c.bench_function("city_parse", |b| {
        let reporter = CollectingReporter::new();
        let mut buffer = FieldBuffer::new(CITY_FIELDS);
        buffer.fill(CITY_LINE);

        b.iter(|| {
            let city = parse_city(&buffer, &reporter, || Location::line(Path::new("FR.txt"), 1));
            black_box(city)
        })
    });
}

fn benchmark_tz_fields(c: &mut Criterion) {
    use tzdb_ingest::tzdb::fields::{parse_duration, parse_month, split_time_type};

    c.bench_function("tz_rule_fields", |b| {
        b.iter(|| {
            let (at, kind) = split_time_type(black_box("2:00s"));
            let at = parse_duration(at);
            let month = parse_month(black_box("October"));
            black_box((at, kind, month))
        })
    });
}

fn benchmark_tz_parse(c: &mut Criterion) {
    use tzdb_ingest::events::EventBus;
    use tzdb_ingest::fs::{FileSystem, MemoryFs};
    use tzdb_ingest::queue::{FileValidator, ValidatedFileQueue};
    use tzdb_ingest::report::CollectingReporter;
    use tzdb_ingest::tzdb::TzDatabaseParser;

    let mut zone_tab = String::from("# zone.tab\n");
    let mut europe = String::from("# europe\nRule\tEU\t1981\tmax\t-\tMar\tlastSun\t 1:00u\t1:00\tS\n");
    for i in 0..500 {
        zone_tab.push_str(&format!("FR\t+4852+00220\tEurope/Zone{}\n", i));
        europe.push_str(&format!(
            "Zone\tEurope/Zone{}\t0:09:21 -\tLMT\t1891 Mar 16\n\t\t\t0:09:21\t-\tPMT\t1911 Mar 11\n\t\t\t1:00\tEU\tCE%sT\n",
            i
        ));
        europe.push_str(&format!("Link\tEurope/Zone{}\tEurope/Alias{}\n", i, i));
    }

    let fs: Arc<dyn FileSystem> = Arc::new(
        MemoryFs::new()
            .with_file("/tz/iso3166.tab", "# <pre>\nFR\tFrance\n")
            .with_file("/tz/zone.tab", zone_tab)
            .with_file("/tz/europe", europe),
    );

    c.bench_function("tz_parse_500_zones", |b| {
        b.iter(|| {
            let reporter = Arc::new(CollectingReporter::new());
            let (queue, producer) = ValidatedFileQueue::new();
            FileValidator::tz_default()
                .populate(fs.as_ref(), Path::new("/tz"), producer, reporter.as_ref())
                .unwrap();

            let parser =
                TzDatabaseParser::new(Arc::clone(&fs), reporter, EventBus::new(), 2024);
            let output = parser.parse(Path::new("/tz"), queue).unwrap();
            black_box(output.time_zones.len())
        })
    });
}

criterion_group!(
    benches,
    benchmark_city_tokenizing,
    benchmark_city_parse,
    benchmark_tz_fields,
    benchmark_tz_parse
);
criterion_main!(benches);
